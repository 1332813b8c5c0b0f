//! HTTP service (feature `server`).
//!
//! | Method | Path                        | Purpose                           |
//! |--------|-----------------------------|-----------------------------------|
//! | GET    | `/`                         | liveness text                     |
//! | POST   | `/api/check/pdf`            | upload + extract + analyse        |
//! | POST   | `/api/check/pdf/sample`     | extract the configured sample     |
//! | POST   | `/api/check/rules`          | judge rules against text          |
//! | GET    | `/pdfium/standard_fonts/*`  | static font files                 |
//!
//! Handler panics are caught and answered with the generic 500 body; CORS
//! is wide open and every request is traced.

pub mod error;
pub mod routes;
pub mod state;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;
pub use uploads::{StoredUpload, UploadStore};

async fn root() -> &'static str {
    "pdf-rulecheck backend is running"
}

/// Client-facing `details` for a caught panic; the payload is only logged.
const PANIC_DETAILS: &str = "internal error";

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "non-string payload".to_string()
    };
    tracing::error!("SERVER ERROR: handler panicked: {details}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::with_details("Server error", PANIC_DETAILS)),
    )
        .into_response()
}

/// Build the application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/check", routes::router())
        .nest_service("/pdfium/standard_fonts", ServeDir::new(&config.fonts_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `config.bind_addr()` and serve until Ctrl+C / SIGTERM.
pub async fn serve(state: AppState, config: &ServerConfig) -> std::io::Result<()> {
    let app = router(state, config);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Backend running on http://{}", listener.local_addr()?);
    tracing::info!(
        "Standard fonts served from {} at /pdfium/standard_fonts",
        config.fonts_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn panic_payload_stays_out_of_the_response() {
        let payload: Box<dyn std::any::Any + Send> =
            Box::new(String::from("index out of bounds at /home/deploy/src/x.rs:12"));

        let response = handle_panic(payload);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": "Server error", "details": "internal error" })
        );
    }
}
