// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

//! # resilient-http
//!
//! An HTTP client that retries transient server failures transparently.
//!
//! ## Features
//!
//! - **Transparent Retries**: 5xx responses (except 501) and transport errors are retried
//! - **Body Replay**: request bodies are buffered once and resent on every attempt
//! - **Pluggable Backoff**: exponential, constant, linear, or your own policy
//! - **Pluggable Predicates**: decide per response whether to try again
//! - **Injected Logging**: each client owns its logger; `tracing` by default
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resilient_http::{default_backoff, Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new();
//!
//!     // Default policy: up to 10 retries, 1s doubling to a 60s cap
//!     let response = client.get("https://api.example.com/health").await?;
//!
//!     // Bring your own request and policy
//!     let request = client
//!         .request(reqwest::Method::POST, "https://api.example.com/orders")
//!         .body(r#"{"sku":"A-1"}"#)
//!         .build()?;
//!     let response = client.execute_with_backoff(request, default_backoff()).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! caller ──► Client ──► Executor ─┬─► BufferedBody (once)
//!                                 │
//!                                 └─► loop: Transport ─► RetryPredicate ─► BackoffPolicy
//!                                                                            │
//!                     Ok(response) | Err(exhausted / permanent / cancelled) ◄┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: document the remaining error variant fields and config structs

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types
pub mod types;

/// Injectable log sink
pub mod logging;

/// Backoff policies
pub mod backoff;

/// Client configuration
pub mod config;

/// Retrying HTTP client
pub mod http;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

pub use backoff::{default_backoff, BackoffPolicy, DEFAULT_MAX_RETRY};
pub use config::ClientConfig;
pub use http::{default_retry_predicate, Client, ClientBuilder, RetryPredicate, Transport};
pub use logging::Logger;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
