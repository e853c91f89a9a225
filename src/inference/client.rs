//! Gemini API client with exponential backoff
//!
//! Direct HTTP client for the `generateContent` endpoint. Every flow goes
//! through [`BackoffClient::send`], which retries rate limits and server
//! errors with a doubling delay and fails fast on everything else.

use crate::config::GeminiConfig;
use crate::inference::backend::{GenerateRequest, InferenceBackend};
use crate::inference::error::{InferenceError, RequestError};
use crate::inference::gemini_types::{GeminiApiRequest, GeminiApiResponse};
use crate::inference::transport::{ReqwestTransport, Transport, TransportError};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default Gemini REST base URL
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Retry budget and backoff base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt with index `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Rate limits and server errors are worth retrying
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Where requests go: base URL, model and API key
#[derive(Clone)]
pub struct GeminiEndpoint {
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiEndpoint {
    /// Create an endpoint description
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Model name requests are sent to
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

impl fmt::Debug for GeminiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiEndpoint")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Request client that retries transient failures with exponential backoff
#[derive(Debug, Clone)]
pub struct BackoffClient<T = ReqwestTransport> {
    transport: T,
    endpoint: GeminiEndpoint,
    policy: RetryPolicy,
}

impl BackoffClient<ReqwestTransport> {
    /// Build a reqwest-backed client from configuration
    pub fn from_config(config: &GeminiConfig, policy: RetryPolicy) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        let endpoint = GeminiEndpoint::new(&config.base_url, &config.model, &config.api_key);
        Ok(Self::new(transport, endpoint, policy))
    }
}

impl<T: Transport> BackoffClient<T> {
    /// Create a client over an arbitrary transport
    pub fn new(transport: T, endpoint: GeminiEndpoint, policy: RetryPolicy) -> Self {
        Self {
            transport,
            endpoint,
            policy,
        }
    }

    /// The retry policy in effect
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send a request, retrying 429/5xx with backoff
    ///
    /// # Errors
    /// * `RequestError::MissingApiKey` before any network call if no key is set
    /// * `RequestError::Status` on the first non-retryable status
    /// * `RequestError::Transport` if the final attempt fails at transport level
    /// * `RequestError::Exhausted` when every attempt got a retryable status
    pub async fn send(&self, request: &GeminiApiRequest) -> Result<GeminiApiResponse, RequestError> {
        if self.endpoint.api_key.is_empty() {
            return Err(RequestError::MissingApiKey);
        }

        let body = serde_json::to_value(request)
            .map_err(|e| RequestError::Transport(format!("Failed to encode request: {}", e)))?;
        let url = self.endpoint.url();
        let attempts = self.policy.max_attempts;

        for attempt in 0..attempts {
            let last_attempt = attempt + 1 == attempts;

            debug!(
                model = %self.endpoint.model,
                attempt = attempt,
                "Calling Gemini API"
            );

            match self.transport.post_json(&url, &body).await {
                Ok(response) if response.is_success() => {
                    match serde_json::from_str::<GeminiApiResponse>(&response.body) {
                        Ok(parsed) => {
                            debug!(
                                attempt = attempt,
                                candidates = parsed.candidates.len(),
                                "Received response from Gemini API"
                            );
                            return Ok(parsed);
                        }
                        Err(e) => {
                            let message =
                                format!("Failed to parse JSON response from Gemini API: {}", e);
                            if last_attempt {
                                error!(attempt = attempt, "{}", message);
                                return Err(RequestError::Transport(message));
                            }
                            warn!(attempt = attempt, "{}, retrying", message);
                        }
                    }
                }
                Ok(response) if is_retryable_status(response.status) => {
                    if last_attempt {
                        warn!(
                            status_code = response.status,
                            attempt = attempt,
                            "Gemini API returned retryable status on final attempt"
                        );
                    } else {
                        let delay = self.policy.delay_for(attempt);
                        warn!(
                            status_code = response.status,
                            attempt = attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Gemini API returned retryable status, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Ok(response) => {
                    error!(
                        status_code = response.status,
                        error_body = %response.body,
                        "Gemini API returned error status"
                    );
                    return Err(RequestError::Status {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(e) => {
                    if last_attempt {
                        error!(attempt = attempt, error = %e, "Gemini API transport failure");
                        return Err(RequestError::Transport(e.0));
                    }
                    warn!(attempt = attempt, error = %e, "Gemini API transport failure, retrying");
                }
            }
        }

        Err(RequestError::Exhausted { attempts })
    }
}

#[async_trait]
impl<T: Transport> InferenceBackend for BackoffClient<T> {
    async fn generate(&self, request: GenerateRequest) -> Result<String, InferenceError> {
        let parsed = self.send(&request.to_api_request()).await?;

        if let Some(reason) = parsed.block_reason() {
            return Err(InferenceError::Blocked(reason.to_string()));
        }

        let text = parsed.first_text().ok_or(InferenceError::NoCandidates)?;
        if text.is_empty() {
            return Err(InferenceError::EmptyText);
        }

        Ok(text.to_string())
    }
}
