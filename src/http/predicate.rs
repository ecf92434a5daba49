//! Retry predicates
//!
//! A predicate looks at a response and says whether it is worth another
//! attempt. Transport failures never reach a predicate; they are always
//! retried.

use reqwest::{Response, StatusCode};

/// Classifies a response as retry-worthy.
///
/// Implementations must be pure: same response, same answer. Any
/// `Fn(&Response) -> bool` is a predicate.
pub trait RetryPredicate: Send + Sync {
    fn should_retry(&self, response: &Response) -> bool;
}

impl<F> RetryPredicate for F
where
    F: Fn(&Response) -> bool + Send + Sync,
{
    fn should_retry(&self, response: &Response) -> bool {
        self(response)
    }
}

/// Retry on 5xx and above, except 501 Not Implemented
pub fn default_retry_predicate(response: &Response) -> bool {
    is_retryable_status(response.status())
}

/// Status rule behind [`default_retry_predicate`]
pub fn is_retryable_status(status: StatusCode) -> bool {
    status.as_u16() >= 500 && status != StatusCode::NOT_IMPLEMENTED
}

/// Retry only when the status is one of `statuses`
pub fn retry_on_statuses(statuses: impl IntoIterator<Item = u16>) -> impl RetryPredicate {
    let statuses: Vec<u16> = statuses.into_iter().collect();
    move |response: &Response| statuses.contains(&response.status().as_u16())
}

/// Accept every response
pub fn never_retry(_response: &Response) -> bool {
    false
}
