//! HTTP routing with `Accept`-header version negotiation.
//!
//! Handlers are registered per `(path, method, version)` at startup,
//! frozen into a snapshot, and selected per request from a vendor media
//! type such as `application/vnd.svc.v2.0.0+json`.

pub mod admin;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod versioning;

pub use config::ServiceConfig;
pub use dispatch::{Dispatcher, RequestVersionContext, RouteRegistrar, ServiceSnapshot};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use versioning::{MatchPolicy, SemanticVersion, VersionRegistry};
