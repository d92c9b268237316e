use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::{Value, json};
use thiserror::Error;

use crate::store::StoreError;

/// Failures surfaced at the HTTP boundary.
///
/// Client errors carry a message meant for the caller. Everything else is
/// logged in full and answered with a generic 500 so no detail of the store
/// or the decoders leaks out.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request itself was unusable (bad body, missing upload, bad query).
    #[error("{0}")]
    InvalidInput(String),

    /// No decoder could find a QR code in the uploaded image.
    #[error("No QR code detected")]
    DecodeFailure,

    /// A QR code was read but did not carry a register number and name.
    #[error("QR decoded but missing required fields")]
    MalformedPayload { decoded: Value },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::DecodeFailure | Self::MalformedPayload { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(_) | Self::Csv(_) | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            Self::MalformedPayload { decoded } => json!({
                "message": self.to_string(),
                "decoded": decoded,
            }),
            _ if status.is_server_error() => {
                tracing::error!(error = %self, "Request failed");
                json!({ "message": "Server error occurred" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}
