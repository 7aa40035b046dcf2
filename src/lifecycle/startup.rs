//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a frozen, servable snapshot
//! - Register the built-in routes
//!
//! # Design Decisions
//! - Fail fast: any registration error is fatal
//! - The snapshot is frozen before a listener is bound, so traffic only
//!   ever sees the serving state

use crate::config::ServiceConfig;
use crate::dispatch::{RegistrationError, RouteRegistrar, ServiceSnapshot};
use crate::health::register_health_routes;

/// Build the frozen snapshot served at startup.
pub fn build_snapshot(config: &ServiceConfig) -> Result<ServiceSnapshot, RegistrationError> {
    let mut registrar = RouteRegistrar::from_config(config)?;
    register_health_routes(&mut registrar)?;

    let snapshot = registrar.freeze();
    for group in snapshot.registry().groups() {
        tracing::info!(
            group = %group,
            policy = %snapshot.registry().policy(group),
            versions = snapshot.registry().count(group),
            default = ?snapshot.registry().default(group).map(ToString::to_string),
            latest = ?snapshot.registry().latest(group).map(ToString::to_string),
            "Route group ready"
        );
    }
    Ok(snapshot)
}
