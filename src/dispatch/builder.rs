//! Startup registration API.
//!
//! # Data Flow
//! ```text
//! ServiceConfig.groups (lifecycle metadata)
//!     → RouteRegistrar::from_config
//!     → register_route(path, method, version, group, handler, options)...
//!     → freeze() → ServiceSnapshot
//! ```
//!
//! # Design Decisions
//! - Registration returns `Result`; every failure here is a startup error
//!   and must stop the process before it serves traffic
//! - A failed registration leaves both the registry and the table unchanged

use axum::http::Method;
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::dispatch::handler::{handler_fn, VersionedHandler};
use crate::dispatch::snapshot::ServiceSnapshot;
use crate::routing::{RouteBinding, RouteTable, RouteTableError};
use crate::versioning::{
    AcceptHeaderParser, GroupOptions, MatchPolicy, ParseVersionError, RegistryError,
    SemanticVersion, VersionOptions, VersionRegistry,
};

/// Startup-time registration failures.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Route(#[from] RouteTableError),

    #[error("group `{group}` has an invalid default version: {source}")]
    InvalidDefault {
        group: String,
        #[source]
        source: ParseVersionError,
    },

    #[error("group `{group}` names default version {version} but does not declare it")]
    UndeclaredDefault {
        group: String,
        version: SemanticVersion,
    },
}

/// Group options and version lifecycles declared in code.
///
/// A reload rebuilds the registry from config, then replays these on top so
/// options passed to `register_route` survive it.
#[derive(Debug, Clone, Default)]
pub(crate) struct CodeDeclarations {
    groups: Vec<(String, GroupOptions)>,
    versions: Vec<(String, SemanticVersion, VersionOptions)>,
}

impl CodeDeclarations {
    /// Replay onto a registry built from config.
    ///
    /// Versions the config declares keep their config lifecycle. A default
    /// or latest pin from code yields to one the config already sets.
    pub(crate) fn apply(&self, registry: &mut VersionRegistry) -> Result<(), RegistryError> {
        for (group, options) in &self.groups {
            registry.configure_group(group, *options)?;
        }

        for (group, version, options) in &self.versions {
            if registry.has_version(group, version) {
                continue;
            }
            let mut options = options.clone();
            if options.is_default && registry.default(group).is_some() {
                tracing::warn!(
                    group = %group,
                    version = %version,
                    "Config sets another default version; dropping the one declared in code"
                );
                options.is_default = false;
            }
            if options.is_latest && registry.entries(group).any(|e| e.is_latest) {
                tracing::warn!(
                    group = %group,
                    version = %version,
                    "Config pins another latest version; dropping the pin declared in code"
                );
                options.is_latest = false;
            }
            registry.register(group, version.clone(), options)?;
        }
        Ok(())
    }
}

/// Collects version declarations and route bindings, then freezes them.
#[derive(Debug, Default)]
pub struct RouteRegistrar {
    registry: VersionRegistry,
    routes: RouteTable,
    parser: AcceptHeaderParser,
    declarations: CodeDeclarations,
}

impl RouteRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrar whose groups default to `policy`.
    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self {
            registry: VersionRegistry::with_default_policy(policy),
            ..Self::default()
        }
    }

    /// Registrar seeded with the groups and versions declared in `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, RegistrationError> {
        Ok(Self {
            registry: registry_from_config(config)?,
            routes: RouteTable::new(),
            parser: parser_from_config(config),
            declarations: CodeDeclarations::default(),
        })
    }

    /// Only honor `Accept` media types of this vendor.
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.parser = AcceptHeaderParser::for_vendor(vendor);
        self
    }

    pub fn configure_group(
        &mut self,
        group: &str,
        options: GroupOptions,
    ) -> Result<&mut Self, RegistrationError> {
        self.registry.configure_group(group, options)?;
        self.declarations.groups.push((group.to_string(), options));
        Ok(self)
    }

    /// Declare a version of `group` without binding a handler.
    pub fn declare_version(
        &mut self,
        group: &str,
        version: SemanticVersion,
        options: VersionOptions,
    ) -> Result<&mut Self, RegistrationError> {
        self.registry.register(group, version.clone(), options.clone())?;
        self.declarations
            .versions
            .push((group.to_string(), version, options));
        Ok(self)
    }

    /// Bind `handler` to `(path, method, version)` in `group`.
    ///
    /// The version is registered on first use. Passing non-default
    /// `options` for an already declared version fails with
    /// `DuplicateVersion`.
    pub fn register_route<H: VersionedHandler>(
        &mut self,
        path: &str,
        method: Method,
        version: SemanticVersion,
        group: &str,
        handler: H,
        options: VersionOptions,
    ) -> Result<&mut Self, RegistrationError> {
        let binding = RouteBinding::new(path, method, version, group, handler_fn(handler))?;
        self.register_binding(binding, options)
    }

    pub fn register_binding(
        &mut self,
        binding: RouteBinding,
        options: VersionOptions,
    ) -> Result<&mut Self, RegistrationError> {
        self.routes.check(&binding)?;

        let declared = self.registry.has_version(binding.group(), binding.version());
        if !declared {
            self.registry
                .register(binding.group(), binding.version().clone(), options.clone())?;
            self.declarations.versions.push((
                binding.group().to_string(),
                binding.version().clone(),
                options,
            ));
        } else if options != VersionOptions::default() {
            return Err(RegistryError::DuplicateVersion {
                group: binding.group().to_string(),
                version: binding.version().clone(),
            }
            .into());
        }

        self.routes.register(binding)?;
        Ok(self)
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Freeze registry and table into a servable snapshot.
    pub fn freeze(self) -> ServiceSnapshot {
        tracing::info!(
            groups = self.registry.groups().count(),
            bindings = self.routes.len(),
            "Route table frozen"
        );
        ServiceSnapshot::new(self.registry, self.routes, self.parser, self.declarations)
    }
}

/// Build a mutable registry from the `[[groups]]` section of `config`.
pub fn registry_from_config(config: &ServiceConfig) -> Result<VersionRegistry, RegistrationError> {
    let mut registry = VersionRegistry::with_default_policy(config.negotiation.default_policy);

    for group in &config.groups {
        registry.configure_group(&group.name, GroupOptions { policy: group.policy })?;

        let default = group
            .parsed_default_version()
            .map_err(|source| RegistrationError::InvalidDefault {
                group: group.name.clone(),
                source,
            })?;
        if let Some(default) = &default {
            if !group.versions.iter().any(|v| &v.version == default) {
                return Err(RegistrationError::UndeclaredDefault {
                    group: group.name.clone(),
                    version: default.clone(),
                });
            }
        }

        for declared in &group.versions {
            let options = VersionOptions {
                is_default: default.as_ref() == Some(&declared.version),
                is_latest: declared.latest,
                deprecated_at: declared.deprecated_at,
                sunset_at: declared.sunset_at,
            };
            registry.register(&group.name, declared.version.clone(), options)?;
        }
    }

    Ok(registry)
}

pub(crate) fn parser_from_config(config: &ServiceConfig) -> AcceptHeaderParser {
    match &config.negotiation.vendor {
        Some(vendor) => AcceptHeaderParser::for_vendor(vendor.clone()),
        None => AcceptHeaderParser::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupConfig, VersionConfig};
    use crate::dispatch::RequestVersionContext;
    use axum::body::Body;
    use axum::http::Request;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    async fn ok(_req: Request<Body>, _ctx: RequestVersionContext) -> &'static str {
        "ok"
    }

    #[test]
    fn test_register_route_registers_version_once() {
        let mut registrar = RouteRegistrar::new();
        registrar
            .register_route("/health", Method::GET, v("1.0.0"), "health", ok, VersionOptions::new())
            .unwrap()
            .register_route("/health", Method::HEAD, v("1.0.0"), "health", ok, VersionOptions::new())
            .unwrap();
        assert_eq!(registrar.registry().count("health"), 1);
        assert_eq!(registrar.routes().len(), 2);
    }

    #[test]
    fn test_conflicting_route_leaves_registry_unchanged() {
        let mut registrar = RouteRegistrar::new();
        registrar
            .register_route("/health", Method::GET, v("1.0.0"), "health", ok, VersionOptions::new())
            .unwrap();
        let err = registrar
            .register_route("/health", Method::GET, v("1.0.0"), "health", ok, VersionOptions::new())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Route(RouteTableError::ConflictingBinding { .. })));

        let err = registrar
            .register_route("/health", Method::GET, v("2.0.0"), "other", ok, VersionOptions::new())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Route(RouteTableError::GroupMismatch { .. })));
        assert!(!registrar.registry().has_version("other", &v("2.0.0")));
    }

    #[test]
    fn test_options_for_declared_version_rejected() {
        let mut registrar = RouteRegistrar::new();
        registrar
            .declare_version("health", v("1.0.0"), VersionOptions::new().default_version())
            .unwrap();
        let err = registrar
            .register_route(
                "/health",
                Method::GET,
                v("1.0.0"),
                "health",
                ok,
                VersionOptions::new().default_version(),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Registry(RegistryError::DuplicateVersion { .. })));
    }

    #[test]
    fn test_second_default_via_routes_rejected() {
        let mut registrar = RouteRegistrar::new();
        registrar
            .register_route("/a", Method::GET, v("1.0.0"), "g", ok, VersionOptions::new().default_version())
            .unwrap();
        let err = registrar
            .register_route("/a", Method::GET, v("2.0.0"), "g", ok, VersionOptions::new().default_version())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Registry(RegistryError::DuplicateDefault { .. })));
        assert_eq!(registrar.routes().len(), 1);
    }

    #[test]
    fn test_registry_from_config() {
        let mut config = ServiceConfig::default();
        config.negotiation.default_policy = MatchPolicy::HighestSatisfying;
        config.groups.push(GroupConfig {
            name: "health".into(),
            policy: Some(MatchPolicy::Exact),
            default_version: Some("1.0.0".into()),
            versions: vec![VersionConfig::new(v("1.0.0")), VersionConfig::new(v("2.0.0"))],
        });

        let registry = registry_from_config(&config).unwrap();
        assert_eq!(registry.default("health"), Some(&v("1.0.0")));
        assert_eq!(registry.policy("health"), MatchPolicy::Exact);
        assert_eq!(registry.policy("unknown"), MatchPolicy::HighestSatisfying);
    }

    #[test]
    fn test_undeclared_default_rejected() {
        let mut config = ServiceConfig::default();
        config.groups.push(GroupConfig {
            name: "health".into(),
            policy: None,
            default_version: Some("3.0.0".into()),
            versions: vec![VersionConfig::new(v("1.0.0"))],
        });
        assert!(matches!(
            registry_from_config(&config),
            Err(RegistrationError::UndeclaredDefault { .. })
        ));
    }

    #[test]
    fn test_freeze_produces_frozen_snapshot() {
        let mut registrar = RouteRegistrar::new().vendor("svc");
        registrar
            .register_route("/health", Method::GET, v("1.0.0"), "health", ok, VersionOptions::new())
            .unwrap();
        let snapshot = registrar.freeze();
        assert!(snapshot.registry().is_frozen());
        assert!(snapshot.routes().is_frozen());
        assert_eq!(snapshot.parser().vendor(), Some("svc"));
        assert_eq!(snapshot.generation(), 0);
    }
}
