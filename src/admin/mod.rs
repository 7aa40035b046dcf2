//! Admin API for inspecting and changing version lifecycle at runtime.
//!
//! Lifecycle changes publish a new snapshot; a later config reload
//! rebuilds the registry from the file and replaces them.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/versions", get(get_versions))
        .route("/admin/routes", get(get_routes))
        .route(
            "/admin/groups/{group}/versions/{version}/deprecate",
            post(deprecate_version).delete(undeprecate_version),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
