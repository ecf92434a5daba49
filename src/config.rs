//! Client configuration
//!
//! Configuration can be built in code, or loaded from YAML/JSON:
//!
//! ```yaml
//! transport:
//!   timeout_seconds: 30
//!   attempt_timeout_ms: 5000
//!   default_headers:
//!     X-Client: billing
//! retry:
//!   type: exponential
//!   initial_ms: 1000
//!   max_ms: 60000
//!   multiplier: 2.0
//!   max_retries: 10
//! ```

use crate::backoff::{
    BackoffPolicy, ConstantBackoff, ExponentialBackoff, LinearBackoff, WithMaxRetries,
    DEFAULT_MAX_RETRY,
};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Client Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Settings for the underlying HTTP client
    #[serde(default)]
    pub transport: TransportConfig,

    /// Default retry policy for calls that do not bring their own
    #[serde(default)]
    pub retry: BackoffConfig,
}

impl ClientConfig {
    /// Parse and validate a YAML (or JSON) document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        self.retry.validate()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Settings for the pooled `reqwest` client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Overall timeout of one attempt inside reqwest, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection establishment timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// How long an idle pooled connection is kept, in seconds
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_seconds: u64,

    /// Idle connections kept per host
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    /// Hard limit on a single attempt enforced by the executor, in milliseconds
    #[serde(default)]
    pub attempt_timeout_ms: Option<u64>,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers sent with every request
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_idle_timeout_seconds: default_pool_idle_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            attempt_timeout_ms: None,
            user_agent: default_user_agent(),
            default_headers: HashMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_idle_timeout() -> u64 {
    10
}

fn default_pool_max_idle_per_host() -> usize {
    500
}

fn default_user_agent() -> String {
    format!("resilient-http/{}", env!("CARGO_PKG_VERSION"))
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(Error::invalid_value("timeout_seconds", "must be positive"));
        }
        if self.attempt_timeout_ms == Some(0) {
            return Err(Error::invalid_value(
                "attempt_timeout_ms",
                "must be positive when set",
            ));
        }
        self.header_map().map(|_| ())
    }

    /// Default headers as a typed map
    pub fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.default_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::invalid_value("default_headers", format!("{key}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::invalid_value("default_headers", format!("{key}: {e}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Build the pooled reqwest client these settings describe
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout())
            .connect_timeout(Duration::from_secs(self.connect_timeout_seconds))
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_seconds))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .user_agent(&self.user_agent)
            .default_headers(self.header_map()?)
            .build()?;
        Ok(client)
    }
}

// ============================================================================
// Retry / Backoff
// ============================================================================

/// Backoff configuration. The defaults describe [`crate::backoff::default_backoff`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Multiplier for exponential backoff
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Jitter factor for exponential backoff, in `[0, 1]`
    #[serde(default)]
    pub randomization_factor: f64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Total time budget for exponential backoff, in milliseconds
    #[serde(default)]
    pub max_elapsed_ms: Option<u64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            multiplier: default_multiplier(),
            randomization_factor: 0.0,
            max_retries: default_max_retries(),
            max_elapsed_ms: None,
        }
    }
}

fn default_initial_ms() -> u64 {
    1000
}

fn default_max_ms() -> u64 {
    60000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRY
}

impl BackoffConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_ms == 0 && self.backoff_type != BackoffType::Constant {
            return Err(Error::invalid_value("initial_ms", "must be positive"));
        }
        if self.max_ms < self.initial_ms {
            return Err(Error::invalid_value(
                "max_ms",
                format!("must be at least initial_ms ({})", self.initial_ms),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(Error::invalid_value(
                "multiplier",
                format!("must be a finite number >= 1, got {}", self.multiplier),
            ));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(Error::invalid_value(
                "randomization_factor",
                format!("must be within [0, 1], got {}", self.randomization_factor),
            ));
        }
        Ok(())
    }

    /// A fresh policy in its initial state
    pub fn build(&self) -> Box<dyn BackoffPolicy> {
        let initial = Duration::from_millis(self.initial_ms);
        let max = Duration::from_millis(self.max_ms);

        match self.backoff_type {
            BackoffType::Constant => Box::new(WithMaxRetries::new(
                ConstantBackoff::new(initial),
                self.max_retries,
            )),
            BackoffType::Linear => Box::new(WithMaxRetries::new(
                LinearBackoff::new(initial, max),
                self.max_retries,
            )),
            BackoffType::Exponential => {
                let exponential = ExponentialBackoff::new()
                    .initial_interval(initial)
                    .randomization_factor(self.randomization_factor)
                    .multiplier(self.multiplier)
                    .max_interval(max)
                    .max_elapsed_time(self.max_elapsed_ms.map(Duration::from_millis));
                let mut policy = WithMaxRetries::new(exponential, self.max_retries);
                policy.reset();
                Box::new(policy)
            }
        }
    }
}
