//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use crate::error::AppError;
use crate::inference::{RetryPolicy, GEMINI_API_BASE_URL};
use std::env;
use std::fmt;
use std::time::Duration;

/// Default model, matching the one the browser client was built against
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// 4 MiB, the inline-data limit of the inference endpoint
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Gemini endpoint configuration
    pub gemini: GeminiConfig,
    /// Retry configuration for the backoff client
    pub retry: RetryConfig,
    /// Upload limits
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Gemini endpoint configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key, sent as the `key` query parameter
    pub api_key: String,
    /// Model name
    pub model: String,
    /// REST base URL
    pub base_url: String,
    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("GeminiConfig")
            .field("api_key", &key)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per request
    pub max_attempts: u32,
    /// First backoff delay in milliseconds
    pub backoff_base_ms: u64,
}

impl RetryConfig {
    /// Retry policy for the backoff client
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_base_ms),
        }
    }
}

/// Upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Largest accepted image in bytes
    pub max_image_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 8080,
                host: "0.0.0.0".to_string(),
            },
            gemini: GeminiConfig {
                api_key: String::new(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: GEMINI_API_BASE_URL.to_string(),
                timeout_secs: 30,
            },
            retry: RetryConfig {
                max_attempts: 3,
                backoff_base_ms: 1000,
            },
            upload: UploadConfig {
                max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            },
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                port: parsed_var("PORT").unwrap_or(defaults.server.port),
                host: env::var("HOST").unwrap_or(defaults.server.host),
            },
            gemini: GeminiConfig {
                api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
                model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
                base_url: env::var("GEMINI_API_BASE_URL").unwrap_or(defaults.gemini.base_url),
                timeout_secs: parsed_var("GEMINI_TIMEOUT_SECS")
                    .unwrap_or(defaults.gemini.timeout_secs),
            },
            retry: RetryConfig {
                max_attempts: parsed_var("GEMINI_MAX_ATTEMPTS")
                    .unwrap_or(defaults.retry.max_attempts),
                backoff_base_ms: parsed_var("GEMINI_BACKOFF_BASE_MS")
                    .unwrap_or(defaults.retry.backoff_base_ms),
            },
            upload: UploadConfig {
                max_image_bytes: parsed_var("MAX_IMAGE_BYTES")
                    .unwrap_or(defaults.upload.max_image_bytes),
            },
        }
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.retry.max_attempts == 0 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "GEMINI_MAX_ATTEMPTS must be > 0"
            )));
        }
        if self.upload.max_image_bytes == 0 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "MAX_IMAGE_BYTES must be > 0"
            )));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "GEMINI_MODEL cannot be empty"
            )));
        }
        Ok(())
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.upload.max_image_bytes, 4_194_304);
        assert_eq!(config.retry.policy(), RetryPolicy::default());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = Config::default();
        config.gemini.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let mut config = Config::default();
        config.gemini.api_key = "AIza-secret".to_string();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("AIza-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
