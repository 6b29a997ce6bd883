use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists with this email.")]
    UserExists,

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("No photo credits remaining.")]
    NoCredits,

    #[error("Payment could not be verified: {0}")]
    PaymentUnverified(String),

    #[error("Order already applied.")]
    DuplicateOrder,

    #[error("Only images are allowed (jpeg, jpg, png, gif).")]
    InvalidFileFormat,

    #[error("File too large")]
    FileTooLarge,

    #[error("No file uploaded.")]
    MissingFile,

    #[error("PayPal {0} client ID not configured")]
    PayPalNotConfigured(String),

    #[error("Restoration failed: {0}")]
    Restoration(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("User not found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
            }
            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
            }
            AppError::Auth(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::UserExists | AppError::InvalidCredentials | AppError::InvalidFileFormat | AppError::MissingFile => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::NoCredits => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::PaymentUnverified(ref reason) => {
                tracing::warn!("Payment verification failed: {}", reason);
                (StatusCode::PAYMENT_REQUIRED, "Payment could not be verified.".to_string())
            }
            AppError::DuplicateOrder => (StatusCode::CONFLICT, self.to_string()),
            AppError::FileTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::PayPalNotConfigured(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Restoration(ref reason) => {
                tracing::error!("Restoration error: {}", reason);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error restoring image".to_string())
            }
            AppError::Upstream(ref e) => {
                tracing::error!("Upstream error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error restoring image".to_string())
            }
            AppError::Storage(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Internal(ref e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
            }
        };

        let body = Json(json!({
            "msg": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
