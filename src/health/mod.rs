//! Versioned `/health` routes.
//!
//! # Versions
//! - `1.0.0`: `GET /health` answers `{"status": "ok"}`
//! - `2.0.0`: `GET /health` adds the served version and per-component
//!   status; `GET /health/{component}` reports a single component
//!
//! Lifecycle metadata (default version, deprecation, sunset) comes from
//! the `[[groups]]` entry named `health` in the configuration.

use axum::{body::Body, http::Method, http::Request, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::dispatch::{RegistrationError, RequestVersionContext, RouteRegistrar};
use crate::versioning::{SemanticVersion, VersionOptions};

/// Route group of the health endpoints.
pub const GROUP: &str = "health";

const COMPONENTS: [&str; 2] = ["dispatcher", "registry"];

/// Bind every health route to `registrar`.
pub fn register_health_routes(registrar: &mut RouteRegistrar) -> Result<(), RegistrationError> {
    let v1 = SemanticVersion::new(1, 0, 0);
    let v2 = SemanticVersion::new(2, 0, 0);

    registrar
        .register_route("/health", Method::GET, v1, GROUP, health_v1, VersionOptions::new())?
        .register_route("/health", Method::GET, v2.clone(), GROUP, health_v2, VersionOptions::new())?
        .register_route(
            "/health/{component}",
            Method::GET,
            v2,
            GROUP,
            component_v2,
            VersionOptions::new(),
        )?;
    Ok(())
}

async fn health_v1(_request: Request<Body>, _context: RequestVersionContext) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn health_v2(_request: Request<Body>, context: RequestVersionContext) -> impl IntoResponse {
    let components: serde_json::Map<_, _> = COMPONENTS
        .iter()
        .map(|name| (name.to_string(), json!("ok")))
        .collect();
    Json(json!({
        "status": "ok",
        "version": context.resolved_version,
        "deprecated": context.is_deprecated(),
        "components": components,
    }))
}

async fn component_v2(_request: Request<Body>, context: RequestVersionContext) -> impl IntoResponse {
    let name = context.param("component").unwrap_or_default();
    if COMPONENTS.contains(&name) {
        (StatusCode::OK, Json(json!({ "component": name, "status": "ok" })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "component": name, "status": "unknown" })),
        )
    }
}
