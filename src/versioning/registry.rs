//! Registry of supported API versions per route group.
//!
//! # Lifecycle
//! ```text
//! Startup:  register() / configure_group()  (mutable, single writer)
//!     → freeze()
//! Serving:  resolve() / latest() / default() (read-only, shared via Arc)
//! Admin:    deprecate() / undeprecate() return a new registry (copy-on-write)
//! ```
//!
//! # Design Decisions
//! - Entries are kept in a `BTreeMap` keyed by version, so every lookup is
//!   independent of registration order
//! - A frozen registry rejects registration instead of silently accepting it
//! - Lifecycle changes never mutate a published registry in place

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::versioning::matcher::{match_version, MatchPolicy, VersionNotSupported};
use crate::versioning::semver::SemanticVersion;

/// Errors raised by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("version {version} is already registered for group `{group}`")]
    DuplicateVersion {
        group: String,
        version: SemanticVersion,
    },

    #[error("group `{group}` already has default version {existing}")]
    DuplicateDefault {
        group: String,
        existing: SemanticVersion,
    },

    #[error("group `{group}` already pins {existing} as latest")]
    DuplicatePinnedLatest {
        group: String,
        existing: SemanticVersion,
    },

    #[error("registry is frozen")]
    RegistryFrozen,

    #[error("no such group `{0}`")]
    NoSuchGroup(String),

    #[error("group `{0}` has no registered versions")]
    NoVersionsRegistered(String),

    #[error("version {version} is not registered for group `{group}`")]
    UnknownVersion {
        group: String,
        version: SemanticVersion,
    },

    #[error("sunset of {version} in group `{group}` precedes its deprecation")]
    InvalidLifecycle {
        group: String,
        version: SemanticVersion,
    },

    #[error(transparent)]
    VersionNotSupported(#[from] VersionNotSupported),
}

/// Options supplied when registering a version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionOptions {
    pub is_default: bool,
    /// Pin this version as the group's latest, overriding max-ordering.
    pub is_latest: bool,
    pub deprecated_at: Option<DateTime<Utc>>,
    pub sunset_at: Option<DateTime<Utc>>,
}

impl VersionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_version(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn pinned_latest(mut self) -> Self {
        self.is_latest = true;
        self
    }

    pub fn deprecated_at(mut self, at: DateTime<Utc>) -> Self {
        self.deprecated_at = Some(at);
        self
    }

    pub fn sunset_at(mut self, at: DateTime<Utc>) -> Self {
        self.sunset_at = Some(at);
        self
    }
}

/// Per-group settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupOptions {
    /// Overrides the registry-wide default policy when set.
    pub policy: Option<MatchPolicy>,
}

/// One registered version of a route group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionEntry {
    pub group: String,
    pub version: SemanticVersion,
    pub is_default: bool,
    /// Explicit latest pin. The derived latest is available via
    /// [`VersionRegistry::latest`].
    pub is_latest: bool,
    pub deprecated_at: Option<DateTime<Utc>>,
    pub sunset_at: Option<DateTime<Utc>>,
}

impl VersionEntry {
    /// Deprecated once `deprecated_at` has passed, or once a sunset is
    /// scheduled without an explicit deprecation date.
    pub fn is_deprecated(&self, now: DateTime<Utc>) -> bool {
        self.deprecated_at.is_some_and(|at| at <= now)
            || (self.deprecated_at.is_none() && self.sunset_at.is_some())
    }

    pub fn is_sunset(&self, now: DateTime<Utc>) -> bool {
        self.sunset_at.is_some_and(|at| at <= now)
    }

    fn lifecycle_is_valid(&self) -> bool {
        match (self.deprecated_at, self.sunset_at) {
            (Some(deprecated), Some(sunset)) => sunset >= deprecated,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GroupVersions {
    options: GroupOptions,
    entries: BTreeMap<SemanticVersion, VersionEntry>,
}

impl GroupVersions {
    fn default_entry(&self) -> Option<&VersionEntry> {
        self.entries.values().find(|e| e.is_default)
    }

    fn pinned_latest(&self) -> Option<&VersionEntry> {
        self.entries.values().find(|e| e.is_latest)
    }
}

/// Table of known versions per route group.
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    groups: BTreeMap<String, GroupVersions>,
    default_policy: MatchPolicy,
    frozen: bool,
}

impl VersionRegistry {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Registry whose groups use `policy` unless they configure their own.
    pub fn with_default_policy(policy: MatchPolicy) -> Self {
        Self {
            default_policy: policy,
            ..<Self as Default>::default()
        }
    }

    /// Set group-level options, creating the group if needed.
    pub fn configure_group(
        &mut self,
        group: &str,
        options: GroupOptions,
    ) -> Result<(), RegistryError> {
        self.ensure_mutable()?;
        self.groups.entry(group.to_string()).or_default().options = options;
        Ok(())
    }

    /// Register `version` under `group`.
    ///
    /// Fails without changing any state if the version exists, if a second
    /// default or latest pin is requested, or if the sunset precedes the
    /// deprecation.
    pub fn register(
        &mut self,
        group: &str,
        version: SemanticVersion,
        options: VersionOptions,
    ) -> Result<(), RegistryError> {
        self.ensure_mutable()?;

        let entry = VersionEntry {
            group: group.to_string(),
            version: version.clone(),
            is_default: options.is_default,
            is_latest: options.is_latest,
            deprecated_at: options.deprecated_at,
            sunset_at: options.sunset_at,
        };
        if !entry.lifecycle_is_valid() {
            return Err(RegistryError::InvalidLifecycle {
                group: group.to_string(),
                version,
            });
        }

        if let Some(existing) = self.groups.get(group) {
            if existing.entries.contains_key(&version) {
                return Err(RegistryError::DuplicateVersion {
                    group: group.to_string(),
                    version,
                });
            }
            if let Some(default) = existing.default_entry().filter(|_| entry.is_default) {
                return Err(RegistryError::DuplicateDefault {
                    group: group.to_string(),
                    existing: default.version.clone(),
                });
            }
            if let Some(pinned) = existing.pinned_latest().filter(|_| entry.is_latest) {
                return Err(RegistryError::DuplicatePinnedLatest {
                    group: group.to_string(),
                    existing: pinned.version.clone(),
                });
            }
        }

        tracing::debug!(group = %group, version = %version, "Registered API version");
        self.groups
            .entry(group.to_string())
            .or_default()
            .entries
            .insert(version, entry);
        Ok(())
    }

    /// Switch to the read-only serving state.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn ensure_mutable(&self) -> Result<(), RegistryError> {
        if self.frozen {
            Err(RegistryError::RegistryFrozen)
        } else {
            Ok(())
        }
    }

    fn group(&self, group: &str) -> Result<&GroupVersions, RegistryError> {
        self.groups
            .get(group)
            .ok_or_else(|| RegistryError::NoSuchGroup(group.to_string()))
    }

    /// Resolve the version to serve for `group`.
    ///
    /// Without a requested version this is the group's default, else its
    /// latest. With one, the group's match policy decides.
    pub fn resolve(
        &self,
        group: &str,
        requested: Option<&SemanticVersion>,
    ) -> Result<SemanticVersion, RegistryError> {
        let versions = self.group(group)?;
        if versions.entries.is_empty() {
            return Err(RegistryError::NoVersionsRegistered(group.to_string()));
        }

        match requested {
            None => self
                .default(group)
                .or_else(|| self.latest(group))
                .cloned()
                .ok_or_else(|| RegistryError::NoVersionsRegistered(group.to_string())),
            Some(requested) => {
                let policy = self.policy(group);
                Ok(match_version(requested, versions.entries.keys(), policy)?)
            }
        }
    }

    /// Latest version of the group.
    ///
    /// An explicit pin wins; otherwise the highest release version, falling
    /// back to the highest prerelease when the group only has prereleases.
    pub fn latest(&self, group: &str) -> Option<&SemanticVersion> {
        let versions = self.groups.get(group)?;
        versions
            .pinned_latest()
            .map(|e| &e.version)
            .or_else(|| self.latest_stable(group))
            .or_else(|| versions.entries.keys().next_back())
    }

    /// Highest release (non-prerelease) version, ignoring any pin.
    pub fn latest_stable(&self, group: &str) -> Option<&SemanticVersion> {
        self.groups
            .get(group)?
            .entries
            .keys()
            .rev()
            .find(|v| !v.is_prerelease())
    }

    pub fn default(&self, group: &str) -> Option<&SemanticVersion> {
        self.groups
            .get(group)?
            .default_entry()
            .map(|e| &e.version)
    }

    /// Match policy in force for `group`.
    pub fn policy(&self, group: &str) -> MatchPolicy {
        self.groups
            .get(group)
            .and_then(|g| g.options.policy)
            .unwrap_or(self.default_policy)
    }

    pub fn default_policy(&self) -> MatchPolicy {
        self.default_policy
    }

    pub fn entry(&self, group: &str, version: &SemanticVersion) -> Option<&VersionEntry> {
        self.groups.get(group)?.entries.get(version)
    }

    /// Entries of `group` in ascending version order.
    pub fn entries(&self, group: &str) -> impl Iterator<Item = &VersionEntry> {
        self.groups
            .get(group)
            .into_iter()
            .flat_map(|g| g.entries.values())
    }

    pub fn has_version(&self, group: &str, version: &SemanticVersion) -> bool {
        self.entry(group, version).is_some()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// All versions of `group`, ascending.
    pub fn versions(&self, group: &str) -> Vec<SemanticVersion> {
        self.entries(group).map(|e| e.version.clone()).collect()
    }

    /// Versions of `group` that are not deprecated at `now`, ascending.
    pub fn active_versions(&self, group: &str, now: DateTime<Utc>) -> Vec<SemanticVersion> {
        self.entries(group)
            .filter(|e| !e.is_deprecated(now))
            .map(|e| e.version.clone())
            .collect()
    }

    /// Versions within `[min, max]`, ascending.
    pub fn versions_in_range(
        &self,
        group: &str,
        min: &SemanticVersion,
        max: &SemanticVersion,
    ) -> Vec<SemanticVersion> {
        self.entries(group)
            .map(|e| &e.version)
            .filter(|v| *v >= min && *v <= max)
            .cloned()
            .collect()
    }

    pub fn count(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, |g| g.entries.len())
    }

    pub fn is_deprecated(&self, group: &str, version: &SemanticVersion, now: DateTime<Utc>) -> bool {
        self.entry(group, version)
            .is_some_and(|e| e.is_deprecated(now))
    }

    pub fn is_sunset(&self, group: &str, version: &SemanticVersion, now: DateTime<Utc>) -> bool {
        self.entry(group, version).is_some_and(|e| e.is_sunset(now))
    }

    /// Return a copy of this registry with `version` deprecated at `at`
    /// and optionally scheduled for sunset.
    pub fn deprecate(
        &self,
        group: &str,
        version: &SemanticVersion,
        at: DateTime<Utc>,
        sunset: Option<DateTime<Utc>>,
    ) -> Result<VersionRegistry, RegistryError> {
        self.with_lifecycle(group, version, Some(at), sunset)
    }

    /// Return a copy of this registry with the lifecycle dates of `version` cleared.
    pub fn undeprecate(
        &self,
        group: &str,
        version: &SemanticVersion,
    ) -> Result<VersionRegistry, RegistryError> {
        self.with_lifecycle(group, version, None, None)
    }

    fn with_lifecycle(
        &self,
        group: &str,
        version: &SemanticVersion,
        deprecated_at: Option<DateTime<Utc>>,
        sunset_at: Option<DateTime<Utc>>,
    ) -> Result<VersionRegistry, RegistryError> {
        let mut next = self.clone();
        let entry = next
            .groups
            .get_mut(group)
            .ok_or_else(|| RegistryError::NoSuchGroup(group.to_string()))?
            .entries
            .get_mut(version)
            .ok_or_else(|| RegistryError::UnknownVersion {
                group: group.to_string(),
                version: version.clone(),
            })?;

        entry.deprecated_at = deprecated_at;
        entry.sunset_at = sunset_at;
        if !entry.lifecycle_is_valid() {
            return Err(RegistryError::InvalidLifecycle {
                group: group.to_string(),
                version: version.clone(),
            });
        }
        Ok(next)
    }
}
