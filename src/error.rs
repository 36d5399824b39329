use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Email transport error: {0}")]
    Email(#[from] lettre::transport::smtp::Error),

    #[error("Email message error: {0}")]
    EmailMessage(#[from] lettre::error::Error),

    #[error("Email address error: {0}")]
    EmailAddress(#[from] lettre::address::AddressError),

    #[error("Failed to fetch schedule for {date}: {source}")]
    ScheduleFetch {
        date: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Unexpected provider payload: {0}")]
    Payload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
