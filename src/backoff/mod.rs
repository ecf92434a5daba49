//! Backoff policies
//!
//! A [`BackoffPolicy`] decides how long to wait before the next attempt and
//! when to give up. The executor only ever calls `reset` once per call and
//! `next_backoff` after every failed attempt.
//!
//! # Policies
//!
//! - **Exponential**: geometric growth with optional jitter and time budget
//! - **Constant / Linear**: fixed or linearly growing delays
//! - **Zero / Stop**: retry immediately, or never
//! - **WithMaxRetries**: caps any policy to a number of retries

mod policy;

pub use policy::{
    default_backoff, BackoffPolicy, ConstantBackoff, ExponentialBackoff, LinearBackoff,
    StopBackoff, WithMaxRetries, ZeroBackoff, DEFAULT_MAX_RETRY,
};
