//! HTTP retry module
//!
//! Wraps a request/response exchange with retries so transient server
//! failures never reach the caller.
//!
//! # Features
//!
//! - **Body Replay**: request bodies are buffered once and resent on every attempt
//! - **Retry Predicates**: pluggable classification of responses
//! - **Backoff Integration**: any [`crate::backoff::BackoffPolicy`] drives the schedule
//! - **Cancellation**: per-attempt timeouts and caller-supplied cancel futures
//! - **Pluggable Transport**: `reqwest` by default, anything implementing [`Transport`]

mod body;
mod client;
mod executor;
mod predicate;
mod transport;

pub use body::BufferedBody;
pub use client::{Client, ClientBuilder};
pub use executor::Executor;
pub use predicate::{
    default_retry_predicate, is_retryable_status, never_retry, retry_on_statuses, RetryPredicate,
};
pub use transport::Transport;

#[cfg(test)]
mod tests;
