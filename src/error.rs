//! Error types for resilient-http
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// Boxed error used as the source of wrapped failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for resilient-http
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// A configuration value is out of range
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    /// Configuration YAML could not be parsed
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON could not be parsed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Request Body Errors
    // ============================================================================
    /// The request body could not be buffered. Never retried.
    #[error("Failed to read request body, giving up: {source}")]
    BodyRead {
        #[source]
        source: BoxError,
    },

    // ============================================================================
    // Single-Attempt Errors
    // ============================================================================
    /// reqwest failed to complete an attempt
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A custom transport failed to complete an attempt
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// An attempt exceeded the per-attempt timeout
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A helper was given an unparsable URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Retry Outcome Errors
    // ============================================================================
    /// Retries ran out after at least one response was rejected; `status` is
    /// the most recent one, even if later attempts failed at the transport.
    #[error("Retries exhausted after {attempts} attempts, last response status {status}")]
    RetriesExhausted { attempts: u32, status: u16 },

    /// Retries ran out without any attempt obtaining a response; `source` is
    /// the last transport failure.
    #[error("Retries exhausted after {attempts} attempts without a response: {source}")]
    TransportExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// The cancellation future resolved first
    #[error("Request cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// Reading a configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Failure reported by a transport built on `anyhow`
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a transport error from a message
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a body read error
    pub fn body_read(source: impl Into<BoxError>) -> Self {
        Self::BodyRead {
            source: source.into(),
        }
    }

    /// Check if retrying can never resolve this error
    pub fn is_permanent(&self) -> bool {
        matches!(self, Error::BodyRead { .. })
    }

    /// Check if this error means the retry budget ran out
    pub fn is_exhausted(&self) -> bool {
        matches!(
            self,
            Error::RetriesExhausted { .. } | Error::TransportExhausted { .. }
        )
    }

    /// Status code of the most recent rejected response, if any arrived
    pub fn last_status(&self) -> Option<u16> {
        match self {
            Error::RetriesExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for resilient-http
pub type Result<T> = std::result::Result<T, Error>;
