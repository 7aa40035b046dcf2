//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use tokio::sync::mpsc;
use tower::ServiceExt;

use version_router::config::{GroupConfig, ServiceConfig, VersionConfig};
use version_router::http::HttpServer;
use version_router::lifecycle::{build_snapshot, Shutdown};
use version_router::SemanticVersion;

pub const ADMIN_KEY: &str = "test-admin-key";

pub fn v(s: &str) -> SemanticVersion {
    SemanticVersion::parse(s).unwrap()
}

/// Config declaring the `health` group with `versions` and an optional default.
pub fn health_config(default: Option<&str>, versions: Vec<VersionConfig>) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.observability.metrics_enabled = false;
    config.admin.api_key = ADMIN_KEY.to_string();
    config.groups.push(GroupConfig {
        name: "health".into(),
        policy: None,
        default_version: default.map(str::to_string),
        versions,
    });
    config
}

pub fn versions(list: &[&str]) -> Vec<VersionConfig> {
    list.iter().map(|s| VersionConfig::new(v(s))).collect()
}

/// Server with the built-in health routes.
pub fn server(config: ServiceConfig) -> HttpServer {
    let snapshot = build_snapshot(&config).unwrap();
    HttpServer::new(config, snapshot)
}

pub fn request(method: Method, path: &str, accept: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    builder.body(Body::empty()).unwrap()
}

/// Send one request through `router` without a socket.
pub async fn send(router: &Router, method: Method, path: &str, accept: Option<&str>) -> Response {
    router
        .clone()
        .oneshot(request(method, path, accept))
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Bind `server` to an ephemeral port and run it until `shutdown` fires.
pub async fn start_server(
    server: HttpServer,
    shutdown: &Shutdown,
) -> (SocketAddr, mpsc::UnboundedSender<ServiceConfig>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (updates_tx, config_updates) = mpsc::unbounded_channel();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, updates_tx)
}

/// Poll `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..40 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
