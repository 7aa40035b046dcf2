//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router whose fallback is the version dispatcher
//! - Wire up middleware (request ID, tracing, access log, timeout)
//! - Bind server to listener
//! - Apply validated configuration reloads to the published snapshot

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::dispatch::{Dispatcher, RegistrationError, ServiceSnapshot};
use crate::http::access_log::access_log;
use crate::http::request::{MakeRequestUuid, RequestIdExt};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub config: Arc<ArcSwap<ServiceConfig>>,
}

impl AppState {
    pub fn new(config: ServiceConfig, snapshot: ServiceSnapshot) -> Self {
        Self {
            dispatcher: Dispatcher::new(snapshot),
            config: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Rebuild the snapshot from `config` and publish both.
    ///
    /// On error nothing changes and the current snapshot keeps serving.
    pub fn apply_config(&self, config: ServiceConfig) -> Result<u64, RegistrationError> {
        let next = self.dispatcher.update(|current| current.reload(&config))?;
        self.config.store(Arc::new(config));
        Ok(next.generation())
    }
}

/// HTTP server for versioned routes.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server serving the frozen `snapshot`.
    pub fn new(config: ServiceConfig, snapshot: ServiceSnapshot) -> Self {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState::new(config, snapshot);
        let router = Self::build_router(request_timeout, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(middleware::from_fn(access_log))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = request.request_id().unwrap_or("-"),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered application router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.state.dispatcher
    }

    /// Admin API router sharing this server's state.
    pub fn admin_router(&self) -> Router {
        crate::admin::setup_admin_router(self.state.clone())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration updates are applied until the channel closes; the
    /// server stops accepting on the shutdown signal and drains in-flight
    /// requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            generation = self.state.dispatcher.current().generation(),
            "HTTP server starting"
        );

        let reload_state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match reload_state.apply_config(config) {
                    Ok(generation) => {
                        tracing::info!(generation, "Configuration reloaded");
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Rejected configuration reload. Keeping current snapshot."
                        );
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request goes through the version dispatcher.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.dispatch(request).await
}
