//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (a group's default names a declared version)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting version declarations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::versioning::SemanticVersion;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("negotiation.vendor must not be empty")]
    EmptyVendor,

    #[error("admin.api_key must be set when the admin API is enabled")]
    EmptyApiKey,

    #[error("group name must not be empty")]
    EmptyGroupName,

    #[error("group `{0}` is declared more than once")]
    DuplicateGroup(String),

    #[error("group `{group}` declares version {version} more than once")]
    DuplicateVersion {
        group: String,
        version: SemanticVersion,
    },

    #[error("group `{group}` has an invalid default_version `{value}`")]
    InvalidDefaultVersion { group: String, value: String },

    #[error("group `{group}` names default version {version} but does not declare it")]
    UndeclaredDefault {
        group: String,
        version: SemanticVersion,
    },

    #[error("group `{0}` pins more than one version as latest")]
    MultipleLatest(String),

    #[error("group `{group}`: sunset_at of {version} precedes its deprecated_at")]
    SunsetBeforeDeprecation {
        group: String,
        version: SemanticVersion,
    },
}

/// Check `config` for semantic errors, collecting every one found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::EmptyApiKey);
        }
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config
        .negotiation
        .vendor
        .as_deref()
        .is_some_and(|v| v.trim().is_empty())
    {
        errors.push(ValidationError::EmptyVendor);
    }

    let mut seen_groups = HashSet::new();
    for group in &config.groups {
        if group.name.trim().is_empty() {
            errors.push(ValidationError::EmptyGroupName);
            continue;
        }
        if !seen_groups.insert(group.name.as_str()) {
            errors.push(ValidationError::DuplicateGroup(group.name.clone()));
        }

        let mut seen_versions = HashSet::new();
        for declared in &group.versions {
            if !seen_versions.insert(&declared.version) {
                errors.push(ValidationError::DuplicateVersion {
                    group: group.name.clone(),
                    version: declared.version.clone(),
                });
            }
            if let (Some(deprecated), Some(sunset)) = (declared.deprecated_at, declared.sunset_at) {
                if sunset < deprecated {
                    errors.push(ValidationError::SunsetBeforeDeprecation {
                        group: group.name.clone(),
                        version: declared.version.clone(),
                    });
                }
            }
        }

        if group.versions.iter().filter(|v| v.latest).count() > 1 {
            errors.push(ValidationError::MultipleLatest(group.name.clone()));
        }

        match group.parsed_default_version() {
            Ok(Some(default)) if !seen_versions.contains(&default) => {
                errors.push(ValidationError::UndeclaredDefault {
                    group: group.name.clone(),
                    version: default,
                });
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::InvalidDefaultVersion {
                group: group.name.clone(),
                value: group.default_version.clone().unwrap_or_default(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
