//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Only the diagnosis path and input validation surface errors to the user;
/// translation and chat failures are absorbed by their flows.
#[derive(Error, Debug)]
pub enum AppError {
    /// Uploaded image is over the size limit
    #[error("Image size exceeds {limit_mb}MB. Please upload a smaller file.")]
    ImageTooLarge {
        /// Size of the rejected upload in bytes
        size: usize,
        /// Limit in whole megabytes, for the message
        limit_mb: usize,
    },

    /// Uploaded file is not a PNG or JPEG image
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    /// Diagnose requested with no image selected
    #[error("No image selected. Please upload an image first.")]
    NoImage,

    /// A diagnosis is already running
    #[error("A diagnosis is already in progress")]
    DiagnosisInFlight,

    /// Request was malformed (bad language code, missing field, ...)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The model's diagnosis output was missing or malformed
    #[error(transparent)]
    Analysis(#[from] crate::orchestrator::AnalysisError),

    /// The inference endpoint failed
    #[error(transparent)]
    Request(#[from] crate::inference::RequestError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::NoImage => StatusCode::BAD_REQUEST,
            AppError::DiagnosisInFlight => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Analysis(_) => StatusCode::BAD_GATEWAY,
            AppError::Request(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
