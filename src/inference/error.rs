//! Inference error types
//!
//! `RequestError` covers everything the backoff client can fail with.
//! `InferenceError` adds the ways a well-formed response can still carry
//! no usable text.

use thiserror::Error;

/// Errors raised by the backoff request client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No API key configured
    #[error("API key is empty")]
    MissingApiKey,

    /// Non-retryable HTTP status
    #[error("API request failed with status {status}")]
    Status {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Transport-level failure on the final attempt
    #[error("API transport error: {0}")]
    Transport(String),

    /// Retry budget spent on retryable statuses
    #[error("API request failed after multiple retries (exhausted retries after {attempts} attempts)")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
    },
}

/// Errors raised by the `generate` capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// The request itself failed
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The endpoint refused the prompt
    #[error("Gemini API blocked the prompt: {0}")]
    Blocked(String),

    /// No candidate (or no text part) in the response
    #[error("Gemini API response contains no candidates")]
    NoCandidates,

    /// A candidate was present but its text was empty
    #[error("Gemini API response text is empty")]
    EmptyText,
}
