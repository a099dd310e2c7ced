//! HTTP surface: the lifecycle API and the in-instance command sidecar.

pub mod error;
pub mod handlers;
pub mod sidecar;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::application::services::{LifecycleController, RelayGateway};

pub use error::ApiError;

/// Shared by every request; the components themselves are stateless.
pub struct AppState {
    pub lifecycle: LifecycleController,
    pub relay: RelayGateway,
}

/// Build the lifecycle API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/start", get(handlers::start))
        .route("/stop", get(handlers::stop))
        .route("/status", get(handlers::status))
        .route("/ip", get(handlers::ip))
        .route("/rcon", get(handlers::rcon))
        .route("/players/count", get(handlers::player_count))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("received shutdown signal");
}
