use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Query is required")]
    MissingQuery,

    #[error("Language is required")]
    MissingLanguage,

    #[error("OpenRouter API key not configured")]
    MissingCredential,

    #[error("config error: {0}")]
    Config(String),

    #[error("search pipeline failed: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::MissingQuery | AppError::MissingLanguage => StatusCode::BAD_REQUEST,
            AppError::MissingCredential | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short message shown to callers. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) | AppError::Config(_) => "Search failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "statusCode": status.as_u16(),
            "statusMessage": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

/// Failure of one content tier. Always recovered by the next tier.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("no entries extracted")]
    Empty,
}
