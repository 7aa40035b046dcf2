//! Version router
//!
//! Serves versioned routes negotiated from the `Accept` header.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ Dispatcher ──▶ AcceptHeaderParser
//!                     (request id,        │
//!                      trace, timeout)    ├──▶ RouteTable (path, method)
//!                                         ├──▶ VersionRegistry + matcher
//!                                         └──▶ handler(request, context)
//!     Client Response
//!     ◀────────────── X-Api-Version, Deprecation, Sunset, Warning
//!
//!     config file ──▶ watcher ──▶ reload ──▶ atomic snapshot swap
//!     admin API   ──▶ deprecate / undeprecate ──▶ atomic snapshot swap
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use version_router::config::{load_or_default, ConfigWatcher};
use version_router::http::HttpServer;
use version_router::lifecycle::{build_snapshot, shutdown_on_signal, Shutdown};
use version_router::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "version-router")]
#[command(about = "HTTP router with Accept-header version negotiation", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "version-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        vendor = ?config.negotiation.vendor,
        default_policy = %config.negotiation.default_policy,
        groups = config.groups.len(),
        "Configuration loaded"
    );

    let snapshot = build_snapshot(&config)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must stay alive for reloads to keep flowing.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone(), snapshot);

    let admin = if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let admin_router = server.admin_router();
        let mut admin_shutdown = shutdown.subscribe();
        Some(tokio::spawn(async move {
            axum::serve(admin_listener, admin_router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await
        }))
    } else {
        None
    };

    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    shutdown_on_signal(&shutdown).await;

    server_task.await??;
    if let Some(admin) = admin {
        admin.await??;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
