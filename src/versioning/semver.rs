//! Semantic version value type.
//!
//! # Responsibilities
//! - Parse `major.minor.patch[-prerelease][+build]` strings
//! - Order versions by semantic-version precedence
//! - Render versions back to their canonical string form
//!
//! # Design Decisions
//! - Immutable once constructed (fields are private, no setters)
//! - Build metadata is kept for display only: it takes no part in
//!   equality, hashing or ordering, so `Eq`, `Hash` and `Ord` agree
//! - Numeric components reject leading zeros, as semver requires

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced while parsing a semantic version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    #[error("empty version string")]
    Empty,

    #[error("missing {0} component")]
    Missing(&'static str),

    #[error("invalid {component} component `{value}`")]
    InvalidNumber {
        component: &'static str,
        value: String,
    },

    #[error("invalid prerelease identifier `{0}`")]
    InvalidPrerelease(String),

    #[error("invalid build metadata `{0}`")]
    InvalidBuild(String),

    #[error("unexpected trailing component `{0}`")]
    Trailing(String),
}

/// A single dot-separated prerelease identifier.
///
/// Variant order matters: the derived `Ord` places numeric identifiers
/// before alphanumeric ones, which is the semver precedence rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Numeric(u64),
    AlphaNumeric(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::AlphaNumeric(s) => f.write_str(s),
        }
    }
}

/// A semantic version.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Vec<Identifier>,
    build: Option<String>,
}

impl SemanticVersion {
    /// Create a release version without prerelease or build metadata.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
            build: None,
        }
    }

    /// Parse a full `major.minor.patch` version.
    pub fn parse(input: &str) -> Result<Self, ParseVersionError> {
        Self::parse_with(input, false)
    }

    /// Parse a version where minor and patch may be omitted (`1`, `1.2`).
    /// Missing components default to zero.
    pub fn parse_partial(input: &str) -> Result<Self, ParseVersionError> {
        Self::parse_with(input, true)
    }

    fn parse_with(input: &str, allow_partial: bool) -> Result<Self, ParseVersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseVersionError::Empty);
        }

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => (rest, Some(parse_build(build)?)),
            None => (input, None),
        };
        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => (core, parse_prerelease(pre)?),
            None => (rest, Vec::new()),
        };

        let mut parts = core.split('.');
        let major = parse_component("major", parts.next().unwrap_or_default())?;
        let minor = match parts.next() {
            Some(part) => parse_component("minor", part)?,
            None if allow_partial => 0,
            None => return Err(ParseVersionError::Missing("minor")),
        };
        let patch = match parts.next() {
            Some(part) => parse_component("patch", part)?,
            None if allow_partial => 0,
            None => return Err(ParseVersionError::Missing("patch")),
        };
        if let Some(extra) = parts.next() {
            return Err(ParseVersionError::Trailing(extra.to_string()));
        }

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
            build,
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn prerelease(&self) -> &[Identifier] {
        &self.prerelease
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// The numeric `(major, minor, patch)` triple.
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// True when both versions share major, minor and patch.
    pub fn same_core(&self, other: &SemanticVersion) -> bool {
        self.triple() == other.triple()
    }
}

fn parse_component(component: &'static str, value: &str) -> Result<u64, ParseVersionError> {
    let invalid = || ParseVersionError::InvalidNumber {
        component,
        value: value.to_string(),
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn parse_prerelease(input: &str) -> Result<Vec<Identifier>, ParseVersionError> {
    input
        .split('.')
        .map(|part| {
            if !is_identifier(part) {
                return Err(ParseVersionError::InvalidPrerelease(input.to_string()));
            }
            if part.bytes().all(|b| b.is_ascii_digit()) {
                if part.len() > 1 && part.starts_with('0') {
                    return Err(ParseVersionError::InvalidPrerelease(input.to_string()));
                }
                part.parse()
                    .map(Identifier::Numeric)
                    .map_err(|_| ParseVersionError::InvalidPrerelease(input.to_string()))
            } else {
                Ok(Identifier::AlphaNumeric(part.to_string()))
            }
        })
        .collect()
}

fn parse_build(input: &str) -> Result<String, ParseVersionError> {
    if input.split('.').all(is_identifier) {
        Ok(input.to_string())
    } else {
        Err(ParseVersionError::InvalidBuild(input.to_string()))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple() && self.prerelease == other.prerelease
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
        self.prerelease.hash(state);
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple()
            .cmp(&other.triple())
            .then_with(|| match (self.prerelease.is_empty(), other.prerelease.is_empty()) {
                (true, true) => Ordering::Equal,
                // A prerelease sorts before its release.
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.prerelease.cmp(&other.prerelease),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        for (i, id) in self.prerelease.iter().enumerate() {
            f.write_str(if i == 0 { "-" } else { "." })?;
            write!(f, "{}", id)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_full_version() {
        let version = v("1.2.3-alpha.1+build.123");
        assert_eq!(version.triple(), (1, 2, 3));
        assert_eq!(
            version.prerelease(),
            &[Identifier::AlphaNumeric("alpha".into()), Identifier::Numeric(1)]
        );
        assert_eq!(version.build(), Some("build.123"));
    }

    #[test]
    fn test_parse_partial_defaults_to_zero() {
        assert_eq!(SemanticVersion::parse_partial("1").unwrap(), SemanticVersion::new(1, 0, 0));
        assert_eq!(SemanticVersion::parse_partial("1.2").unwrap(), SemanticVersion::new(1, 2, 0));
        assert_eq!(
            SemanticVersion::parse("1.2"),
            Err(ParseVersionError::Missing("patch"))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(SemanticVersion::parse(""), Err(ParseVersionError::Empty));
        assert!(SemanticVersion::parse("01.0.0").is_err());
        assert!(SemanticVersion::parse("1.0.0.0").is_err());
        assert!(SemanticVersion::parse("a.b.c").is_err());
        assert!(SemanticVersion::parse("1.0.0-").is_err());
        assert!(SemanticVersion::parse("1.0.0-alpha..1").is_err());
        assert!(SemanticVersion::parse("1.0.0-01").is_err());
        assert!(SemanticVersion::parse("1.0.0+").is_err());
        assert!(SemanticVersion::parse("1..0").is_err());
    }

    #[test]
    fn test_ordering_chain() {
        let chain = ["1.0.0-alpha", "1.0.0", "1.0.1", "1.1.0", "2.0.0"];
        for pair in chain.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_prerelease_precedence() {
        let chain = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in chain.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_build_metadata_ignored_for_equality_and_order() {
        assert_eq!(v("1.0.0+a"), v("1.0.0+b"));
        assert_eq!(v("1.0.0+a").cmp(&v("1.0.0")), Ordering::Equal);

        let mut set = std::collections::HashSet::new();
        set.insert(v("1.0.0+a"));
        assert!(set.contains(&v("1.0.0")));
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["0.0.1", "1.2.3-rc.1", "2.0.0+sha.5114f85", "1.0.0-x-y.7+b.2"] {
            let version = v(raw);
            assert_eq!(version.to_string(), raw);
            assert_eq!(v(&version.to_string()), version);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.2.3-beta")).unwrap();
        assert_eq!(json, "\"1.2.3-beta\"");
        let back: SemanticVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.2.3-beta"));
        assert!(serde_json::from_str::<SemanticVersion>("\"nope\"").is_err());
    }
}
