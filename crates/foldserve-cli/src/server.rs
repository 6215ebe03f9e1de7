//! HTTP front end: the job API under `/api`, the data directory under the
//! configured URL prefix and an optional static web app at `/`.

pub mod error;
pub mod routes;
pub mod state;

use crate::error::{CliError, Result};
use axum::Router;
use axum::routing::{get, post};
use state::AppState;
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub fn router(state: AppState, webapp_dir: Option<&Path>) -> Router {
    let output = &state.service.config().output;
    let data_service = ServeDir::new(&output.data_dir);
    let data_prefix = output.url_prefix.clone();

    let api = Router::new()
        .route("/fold", post(routes::submit_fold))
        .route("/status/{job_id}", get(routes::job_status))
        .route("/results/{job_id}", get(routes::job_results))
        .route("/health", get(routes::health));

    let mut app = Router::new()
        .nest("/api", api)
        .nest_service(&data_prefix, data_service);

    if let Some(dir) = webapp_dir {
        let webapp = ServeDir::new(dir)
            .append_index_html_on_directories(true)
            .not_found_service(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(webapp);
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl-C or SIGTERM, then lets in-flight requests finish.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Server(e.to_string()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received; draining connections.");
}
