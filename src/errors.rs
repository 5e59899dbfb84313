use crate::classifier::ModelError;
use crate::models::ErrorResponse;
use crate::preprocessing::ValidationError;
use axum::{
    extract::rejection::JsonRejection,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Input rejected by preprocessing (client's fault).
    Validation(ValidationError),
    /// Request could not be read (bad JSON, bad multipart, no file).
    BadRequest(String),
    /// Upload exceeded the configured size limit.
    PayloadTooLarge(String),
    /// Caller exceeded the per-IP request quota.
    TooManyRequests(String),
    /// Request did not complete within the configured timeout.
    Timeout(String),
    /// Inference failed on input that passed validation.
    Prediction(ModelError),
    /// Internal server error.
    InternalError(String),
    /// Error with context prefix for the reported detail.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// HTTP status for this error, following the context chain.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::Prediction(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::WithContext { source, .. } => source.status(),
        }
    }

    /// Machine-readable category reported in the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::TooManyRequests(_) => "rate_limited",
            AppError::Timeout(_) => "timeout",
            AppError::Prediction(_) => "prediction_error",
            AppError::InternalError(_) => "internal_error",
            AppError::WithContext { source, .. } => source.kind(),
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Internal errors are reported generically; their detail only goes to the log.
    pub fn public_detail(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::BadRequest(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::TooManyRequests(msg)
            | AppError::Timeout(msg) => msg.clone(),
            AppError::Prediction(e) => format!("Prediction failed: {}", e),
            AppError::InternalError(_) => "Internal server error".to_string(),
            AppError::WithContext { source, context } => {
                format!("{}: {}", context, source.public_detail())
            }
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "Validation error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::TooManyRequests(msg) => write!(f, "Too many requests: {}", msg),
            AppError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            AppError::Prediction(e) => write!(f, "Prediction error: {}", e),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
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
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            error: self.kind().to_string(),
            detail: self.public_detail(),
        });

        (status, body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        AppError::Prediction(err)
    }
}

impl From<JsonRejection> for AppError {
    /// Malformed JSON bodies are the client's fault.
    fn from(err: JsonRejection) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!("Request body too large: {}", err.body_text()))
        } else {
            AppError::BadRequest(format!("Invalid JSON body: {}", err.body_text()))
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!("Upload too large: {}", err.body_text()))
        } else {
            AppError::BadRequest(format!("Invalid multipart upload: {}", err.body_text()))
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("prediction task failed: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T, E: Into<AppError>> ResultExt<T> for Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }
}
