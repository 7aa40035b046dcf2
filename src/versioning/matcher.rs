//! Version matching policies.
//!
//! # Policies
//! - `exact`: the requested version must be registered (build metadata ignored)
//! - `highest-satisfying`: the greatest registered version with the same major
//!   and a `(minor, patch)` at or above the requested one
//!
//! # Design Decisions
//! - Matching is a pure function of (requested, available, policy)
//! - Input order of `available` never changes the result
//! - Prerelease candidates only satisfy a request for the same
//!   `major.minor.patch`, so a client on `1.0.0` is never moved onto `1.2.0-beta`

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::versioning::semver::SemanticVersion;

/// How a requested version is resolved against the registered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    #[default]
    Exact,
    HighestSatisfying,
}

impl MatchPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchPolicy::Exact => "exact",
            MatchPolicy::HighestSatisfying => "highest-satisfying",
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// No registered version satisfies the request under the active policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("version {requested} is not supported")]
pub struct VersionNotSupported {
    pub requested: SemanticVersion,
}

/// Resolve `requested` against `available` using `policy`.
///
/// The returned version is the registered one, so it carries the
/// registered build metadata rather than the requested one.
pub fn match_version<'a, I>(
    requested: &SemanticVersion,
    available: I,
    policy: MatchPolicy,
) -> Result<SemanticVersion, VersionNotSupported>
where
    I: IntoIterator<Item = &'a SemanticVersion>,
{
    let mut available = available.into_iter();
    let found = match policy {
        MatchPolicy::Exact => available.find(|candidate| *candidate == requested),
        MatchPolicy::HighestSatisfying => available
            .filter(|candidate| satisfies(candidate, requested))
            .max(),
    };

    found.cloned().ok_or_else(|| VersionNotSupported {
        requested: requested.clone(),
    })
}

fn satisfies(candidate: &SemanticVersion, requested: &SemanticVersion) -> bool {
    if candidate.major() != requested.major() {
        return false;
    }
    if (candidate.minor(), candidate.patch()) < (requested.minor(), requested.patch()) {
        return false;
    }
    if candidate.is_prerelease() {
        return candidate.same_core(requested) && candidate >= requested;
    }
    true
}
