//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::versioning::{MatchPolicy, ParseVersionError, SemanticVersion};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Accept header negotiation settings.
    pub negotiation: NegotiationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    /// Version lifecycle per route group.
    pub groups: Vec<GroupConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request deadline (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Accept header negotiation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Only honor `application/vnd.{vendor}...` media types when set.
    pub vendor: Option<String>,

    /// Policy for groups that do not choose their own.
    pub default_policy: MatchPolicy,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Versions of one route group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupConfig {
    pub name: String,

    /// Overrides `negotiation.default_policy`.
    #[serde(default)]
    pub policy: Option<MatchPolicy>,

    /// Version served without an explicit request: a version string, or
    /// "latest" (the same as leaving it unset).
    #[serde(default)]
    pub default_version: Option<String>,

    #[serde(default)]
    pub versions: Vec<VersionConfig>,
}

impl GroupConfig {
    /// The configured default version, `None` for "latest" or unset.
    pub fn parsed_default_version(&self) -> Result<Option<SemanticVersion>, ParseVersionError> {
        match self.default_version.as_deref().map(str::trim) {
            None => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("latest") => Ok(None),
            Some(value) => SemanticVersion::parse(value).map(Some),
        }
    }
}

/// Lifecycle of one version.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionConfig {
    pub version: SemanticVersion,

    /// Pin this version as the group's latest.
    #[serde(default)]
    pub latest: bool,

    #[serde(default)]
    pub deprecated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sunset_at: Option<DateTime<Utc>>,
}

impl VersionConfig {
    pub fn new(version: SemanticVersion) -> Self {
        Self {
            version,
            latest: false,
            deprecated_at: None,
            sunset_at: None,
        }
    }
}
