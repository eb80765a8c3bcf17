//! # Storefront API
//!
//! REST server for the storefront: catalog browsing, carts, checkout and
//! order administration.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront API Server                            │
//! │                                                                         │
//! │  SPA ──► HTTP (8080) ──► TimeoutLayer ──► Router ──► Handlers           │
//! │                                                         │               │
//! │                                   AuthUser / AdminUser ─┤               │
//! │                                                         ▼               │
//! │                                          storefront-db (SQLite)         │
//! │                                                         │               │
//! │                                                         ▼               │
//! │                                          storefront-core (pricing)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The binary in `main.rs` only wires configuration, the database and the
//! listener together; everything testable lives in this library.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::{middleware, BoxError, Router};
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    let router = routes::router()
        .layer(middleware::map_response_with_state(
            state.clone(),
            error::expose_internal_detail,
        ))
        .with_state(state);

    with_request_timeout(router, timeout)
}

/// Answers requests that run longer than `timeout` with a 408 envelope.
///
/// The handler future is dropped on timeout; nothing retries it.
pub fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        warn!("Request timed out");
        ApiError::Timeout
    } else {
        ApiError::internal(format!("Unhandled middleware error: {}", err))
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
