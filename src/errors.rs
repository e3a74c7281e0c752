use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (missing or invalid input).
    BadRequest(String),
    /// The identity provider refused or garbled the client-credential exchange.
    AuthError(String),
    /// A create, update or delete against the CRM failed.
    CrmWriteError(String),
    /// A read query against the CRM failed.
    CrmQueryError(String),
    /// The creation response carried no usable `Location` header.
    InvalidLocation(String),
    /// Internal server error.
    InternalError(String),
    /// Upstream failure reported to the caller with a fixed message only.
    Unavailable(String),
    /// Error with context chain, reported to the caller as `error` + `details`.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// The bare message carried by the error, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::CrmWriteError(msg)
            | AppError::CrmQueryError(msg)
            | AppError::InvalidLocation(msg)
            | AppError::InternalError(msg)
            | AppError::Unavailable(msg) => msg.clone(),
            AppError::WithContext { source, .. } => source.message(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            AppError::CrmWriteError(msg) => write!(f, "CRM write error: {}", msg),
            AppError::CrmQueryError(msg) => write!(f, "CRM query error: {}", msg),
            AppError::InvalidLocation(msg) => write!(f, "Invalid Location header: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Validation errors become 400, everything else 500. Only `WithContext`
    /// exposes the underlying message to the caller.
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::BadRequest(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response();
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                json!({
                    "error": context,
                    "details": source.message(),
                })
            }
            AppError::Unavailable(msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                json!({ "error": msg })
            }
            other => {
                tracing::error!("{}", other);
                json!({ "error": "Internal server error" })
            }
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}
