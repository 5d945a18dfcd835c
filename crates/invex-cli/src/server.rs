//! HTTP service: `POST /parse-invoice/` and `GET /health`.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, Span};

use invex_core::{InvoicePipeline, ParseError};

use crate::report::Report;

/// Errors returned to HTTP clients as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Only PDF files are supported.")]
    NotPdf,

    #[error("Missing 'file' upload.")]
    MissingFile,

    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    #[error("Could not extract any text from PDF.")]
    NoTextExtracted,

    #[error("No matching template found and no default template available.")]
    NoTemplateMatched,

    #[error("Internal server error.")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotPdf | ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::Upload { status, .. } => *status,
            ApiError::NoTextExtracted | ApiError::NoTemplateMatched => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Internal(reason) => {
                error!("Request failed: {}", reason);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NoTextExtracted => ApiError::NoTextExtracted,
            ParseError::NoTemplateMatched => ApiError::NoTemplateMatched,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<InvoicePipeline>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Build the application router.
pub fn router(pipeline: Arc<InvoicePipeline>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/parse-invoice/", post(parse_invoice))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn parse_invoice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(ApiError::NotPdf);
        }

        let data = field.bytes().await?;
        debug!("Received '{}' ({} bytes)", filename, data.len());

        let parent = Span::current();
        let pipeline = Arc::clone(&state.pipeline);
        let label = filename.clone();
        let parsed = tokio::task::spawn_blocking(move || pipeline.parse_in(&data, &label, &parent))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

        return Ok(Json(Report::new(&filename, &parsed)).into_response());
    }

    Err(ApiError::MissingFile)
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(app: Router, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
