//! Inference module
//!
//! Everything needed to talk to the remote model: wire types, the transport
//! seam, the backoff request client and the `generate` capability the flows
//! are written against.

pub mod backend;
pub mod client;
pub mod error;
pub mod gemini_types;
pub mod transport;

pub use backend::{GenerateRequest, InferenceBackend, ResponseFormat};
pub use client::{BackoffClient, GeminiEndpoint, RetryPolicy, GEMINI_API_BASE_URL};
pub use error::{InferenceError, RequestError};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportResponse};
