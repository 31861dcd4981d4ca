use axum::response::IntoResponse;
use axum::Json;
use axum::http::StatusCode;
use std::error::Error;

#[derive(Debug, serde::Serialize)]
struct ErrorBody {
    error: String,
    detail: Option<String>,
}

/// Errors the admin HTTP surface can turn into a response (spec.md §4.F).
/// Not-found store lookups map to 404, malformed request bodies to 400,
/// everything else to 500.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("store error")]
    Store(#[from] flapjack_store::StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(flapjack_store::StoreError::NotFound) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, source = ?self.source(), "admin request failed");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
            detail: self.source().map(ToString::to_string),
        });

        (status, body).into_response()
    }
}
