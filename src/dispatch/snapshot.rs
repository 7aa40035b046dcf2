//! Frozen registry + route table published to the serving path.
//!
//! # Design Decisions
//! - A snapshot is never mutated; reloads and admin changes build a new
//!   one and publish it with an atomic pointer swap
//! - Route bindings live in code, so reloads reuse the same `RouteTable`
//!   and only rebuild the version registry from configuration, replaying
//!   the version options declared in code on top
//! - Each published snapshot carries a generation number for observability

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::dispatch::builder::{
    parser_from_config, registry_from_config, CodeDeclarations, RegistrationError,
};
use crate::routing::RouteTable;
use crate::versioning::{AcceptHeaderParser, VersionOptions, VersionRegistry};

/// Immutable view used by the dispatcher for one request.
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    registry: Arc<VersionRegistry>,
    routes: Arc<RouteTable>,
    parser: AcceptHeaderParser,
    declarations: Arc<CodeDeclarations>,
    generation: u64,
}

impl ServiceSnapshot {
    pub(crate) fn new(
        mut registry: VersionRegistry,
        mut routes: RouteTable,
        parser: AcceptHeaderParser,
        declarations: CodeDeclarations,
    ) -> Self {
        registry.freeze();
        routes.freeze();
        Self {
            registry: Arc::new(registry),
            routes: Arc::new(routes),
            parser,
            declarations: Arc::new(declarations),
            generation: 0,
        }
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn parser(&self) -> &AcceptHeaderParser {
        &self.parser
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Next-generation snapshot sharing this route table.
    pub fn with_registry(&self, mut registry: VersionRegistry) -> ServiceSnapshot {
        registry.freeze();
        ServiceSnapshot {
            registry: Arc::new(registry),
            routes: Arc::clone(&self.routes),
            parser: self.parser.clone(),
            declarations: Arc::clone(&self.declarations),
            generation: self.generation + 1,
        }
    }

    /// Rebuild version metadata and negotiation settings from `config`,
    /// keeping the route bindings.
    pub fn reload(&self, config: &ServiceConfig) -> Result<ServiceSnapshot, RegistrationError> {
        let mut registry = registry_from_config(config)?;
        self.declarations.apply(&mut registry)?;
        for binding in self.routes.bindings() {
            if !registry.has_version(binding.group(), binding.version()) {
                registry.register(
                    binding.group(),
                    binding.version().clone(),
                    VersionOptions::default(),
                )?;
            }
        }

        let mut next = self.with_registry(registry);
        next.parser = parser_from_config(config);
        Ok(next)
    }
}
