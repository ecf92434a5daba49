//! Backoff policy trait and the shipped implementations

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRY: u32 = 10;

/// A stateful generator of wait durations between attempts.
///
/// `next_backoff` returns `None` once no further attempt should be made.
/// `reset` returns the policy to its initial state; the executor calls it
/// before the first attempt of every call.
pub trait BackoffPolicy: Send {
    /// Delay before the next attempt, or `None` to stop retrying
    fn next_backoff(&mut self) -> Option<Duration>;

    /// Restart the sequence from the beginning
    fn reset(&mut self);
}

impl<B: BackoffPolicy + ?Sized> BackoffPolicy for Box<B> {
    fn next_backoff(&mut self) -> Option<Duration> {
        (**self).next_backoff()
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

impl<B: BackoffPolicy + ?Sized> BackoffPolicy for &mut B {
    fn next_backoff(&mut self) -> Option<Duration> {
        (**self).next_backoff()
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

/// Exponential backoff policy used by [`crate::http::Client::execute`]:
/// 1s initial, no jitter, doubling, capped at 60s, at most
/// [`DEFAULT_MAX_RETRY`] retries.
pub fn default_backoff() -> WithMaxRetries<ExponentialBackoff> {
    let exponential = ExponentialBackoff::new()
        .initial_interval(Duration::from_secs(1))
        .randomization_factor(0.0)
        .multiplier(2.0)
        .max_interval(Duration::from_secs(60))
        .max_elapsed_time(None);

    let mut policy = WithMaxRetries::new(exponential, DEFAULT_MAX_RETRY);
    policy.reset();
    policy
}

// ============================================================================
// Exponential
// ============================================================================

/// Grows the delay geometrically until `max_interval`.
///
/// Each returned delay is the current interval randomized into
/// `[interval * (1 - f), interval * (1 + f)]` where `f` is the
/// randomization factor. When `max_elapsed_time` is set, the policy stops
/// once the time since the last reset plus the next delay would exceed it.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay after a reset
    pub initial_interval: Duration,
    /// Jitter factor in `[0, 1]`; zero disables randomization
    pub randomization_factor: f64,
    /// Growth applied to the interval after every delay
    pub multiplier: f64,
    /// Cap on a single delay
    pub max_interval: Duration,
    /// Overall budget since the last reset; `None` never stops
    pub max_elapsed_time: Option<Duration>,
    current_interval: Duration,
    start_time: Instant,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            randomization_factor: 0.5,
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Some(Duration::from_secs(15 * 60)),
            current_interval: Duration::from_millis(500),
            start_time: Instant::now(),
        }
    }
}

impl ExponentialBackoff {
    /// Create a policy with the library defaults (500ms, 0.5 jitter, x1.5, 60s cap, 15min budget)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first delay
    #[must_use]
    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self.current_interval = interval;
        self
    }

    /// Set the jitter factor, expected in `[0, 1]`
    #[must_use]
    pub fn randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor;
        self
    }

    /// Set the growth factor applied after every delay
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the cap on a single delay
    #[must_use]
    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the overall time budget; `None` retries until another limit hits
    #[must_use]
    pub fn max_elapsed_time(mut self, budget: Option<Duration>) -> Self {
        self.max_elapsed_time = budget;
        self
    }

    /// Time since the policy was created or last reset
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn increment_current_interval(&mut self) {
        let next = self.current_interval.as_secs_f64() * self.multiplier;
        let max = self.max_interval.as_secs_f64();
        self.current_interval = if !next.is_finite() || next >= max {
            self.max_interval
        } else {
            Duration::try_from_secs_f64(next.max(0.0)).unwrap_or(self.max_interval)
        };
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        let elapsed = self.elapsed();
        let next = randomize(self.current_interval, self.randomization_factor);
        self.increment_current_interval();

        match self.max_elapsed_time {
            Some(budget) if elapsed.saturating_add(next) > budget => None,
            _ => Some(next),
        }
    }

    fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.start_time = Instant::now();
    }
}

fn randomize(interval: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || !factor.is_finite() || interval.is_zero() {
        return interval;
    }
    let secs = interval.as_secs_f64();
    let delta = factor.min(1.0) * secs;
    let value = rand::thread_rng().gen_range((secs - delta)..=(secs + delta));
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(interval)
}

// ============================================================================
// Constant / Linear
// ============================================================================

/// Waits the same amount before every retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    /// Wait `interval` before every retry
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl BackoffPolicy for ConstantBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.interval)
    }

    fn reset(&mut self) {}
}

/// Waits `initial * n` before the n-th retry, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    initial: Duration,
    max: Duration,
    step: u32,
}

impl LinearBackoff {
    /// Grow by `initial` per retry up to `max`
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            step: 0,
        }
    }
}

impl BackoffPolicy for LinearBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.step = self.step.saturating_add(1);
        let delay = self.initial.checked_mul(self.step).unwrap_or(self.max);
        Some(delay.min(self.max))
    }

    fn reset(&mut self) {
        self.step = 0;
    }
}

// ============================================================================
// Zero / Stop
// ============================================================================

/// Retries immediately, forever. Combine with [`WithMaxRetries`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroBackoff;

impl BackoffPolicy for ZeroBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(Duration::ZERO)
    }

    fn reset(&mut self) {}
}

/// Never retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopBackoff;

impl BackoffPolicy for StopBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}
}

// ============================================================================
// Max retries wrapper
// ============================================================================

/// Stops the inner policy after `max_retries` delays
#[derive(Debug, Clone)]
pub struct WithMaxRetries<B> {
    inner: B,
    max_retries: u32,
    retries: u32,
}

impl<B: BackoffPolicy> WithMaxRetries<B> {
    /// Allow at most `max_retries` delays from `inner`
    pub fn new(inner: B, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            retries: 0,
        }
    }

    /// Retries handed out since the last reset
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Retries allowed between resets
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl<B: BackoffPolicy> BackoffPolicy for WithMaxRetries<B> {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;
        self.inner.next_backoff()
    }

    fn reset(&mut self) {
        self.retries = 0;
        self.inner.reset();
    }
}
