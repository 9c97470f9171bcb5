//! HTTP server facade for bookshelf with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde_json::json;

use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::ModuleRegistry;

pub mod error;
pub mod router;

use router::{RouterBuilder, OPENAPI_PATH};

/// Start the HTTP server with the given module registry, serving until `shutdown` resolves
pub async fn start_server(
    registry: &ModuleRegistry,
    settings: &Settings,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to address {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let prefix = settings.server.api_prefix.as_str();

    RouterBuilder::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .mount_modules(prefix, registry)
        .with_openapi(prefix, registry)
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .build()
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

/// Service metadata
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to the bookshelf service",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": OPENAPI_PATH
    }))
}

/// Liveness check
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}
