//! Retry executor
//!
//! Drives one logical request through as many attempts as the backoff
//! policy allows:
//!
//! 1. reset the policy and buffer the body (a read failure ends the call)
//! 2. send a fresh copy of the request
//! 3. classify: transport failure or predicate rejection means retry
//! 4. ask the policy for a delay, sleep, repeat; `None` means exhausted
//!
//! The caller gets either the accepted response or an error, never both.

use super::body::BufferedBody;
use super::predicate::RetryPredicate;
use super::transport::Transport;
use crate::backoff::BackoffPolicy;
use crate::error::{Error, Result};
use crate::logging::Logger;
use reqwest::{Request, Response, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Why the last attempt did not end the call
enum Rejection {
    /// A response arrived but the predicate asked for another attempt
    Response(StatusCode),
    /// No response was obtained
    Transport(Error),
}

/// Runs requests against a transport with retries.
///
/// Holds no per-call state, so one executor serves any number of
/// concurrent calls.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    logger: Arc<dyn Logger>,
    attempt_timeout: Option<Duration>,
}

impl Executor {
    /// Create an executor over the given transport and logger
    pub fn new(transport: Arc<dyn Transport>, logger: Arc<dyn Logger>) -> Self {
        Self {
            transport,
            logger,
            attempt_timeout: None,
        }
    }

    /// Bound every single attempt; an expired attempt counts as a transport failure
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Replace the logger
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Limit applied to each attempt, if any
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Execute `request`, retrying as directed by `backoff` and `predicate`
    pub async fn execute<B, P>(
        &self,
        request: Request,
        backoff: &mut B,
        predicate: &P,
    ) -> Result<Response>
    where
        B: BackoffPolicy + ?Sized,
        P: RetryPredicate + ?Sized,
    {
        self.execute_until(request, backoff, predicate, std::future::pending())
            .await
    }

    /// Like [`Executor::execute`], but gives up with [`Error::Cancelled`] as
    /// soon as `cancel` resolves, whether an attempt or a backoff wait is in
    /// flight.
    pub async fn execute_until<B, P, C>(
        &self,
        mut request: Request,
        backoff: &mut B,
        predicate: &P,
        cancel: C,
    ) -> Result<Response>
    where
        B: BackoffPolicy + ?Sized,
        P: RetryPredicate + ?Sized,
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        backoff.reset();

        let captured = tokio::select! {
            captured = BufferedBody::capture(&mut request) => captured,
            () = &mut cancel => return Err(Error::Cancelled { attempts: 0 }),
        };
        let body = match captured {
            Ok(body) => body,
            Err(err) => {
                self.logger.error(format_args!(
                    "error while reading the request body, giving up retrying. Err: {err}"
                ));
                return Err(err);
            }
        };

        let method = request.method().clone();
        let url = request.url().clone();
        let mut attempts: u32 = 0;
        let mut last_status: Option<StatusCode> = None;

        loop {
            attempts = attempts.saturating_add(1);
            let attempt = body.attach(&request);

            let outcome = tokio::select! {
                outcome = self.send(attempt) => outcome,
                () = &mut cancel => return Err(Error::Cancelled { attempts }),
            };

            let rejection = match outcome {
                Ok(response) => {
                    last_status = Some(response.status());
                    if !predicate.should_retry(&response) {
                        self.logger.info(format_args!(
                            "{method} {url} executed successfully on attempt {attempts}, status {}",
                            response.status()
                        ));
                        return Ok(response);
                    }
                    self.logger.error(format_args!(
                        "{method} {url} got status {} on attempt {attempts}, a retry is needed",
                        response.status()
                    ));
                    Rejection::Response(response.status())
                }
                Err(err) => {
                    self.logger.error(format_args!(
                        "{method} {url} request error on attempt {attempts}, err: {err}, need a retry"
                    ));
                    Rejection::Transport(err)
                }
            };

            let Some(delay) = backoff.next_backoff() else {
                self.logger.error(format_args!(
                    "{method} {url} failed after {attempts} attempts, giving up"
                ));
                return Err(exhausted(attempts, last_status, rejection));
            };

            debug!(%method, %url, attempts, ?delay, "Backing off before next attempt");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = &mut cancel => return Err(Error::Cancelled { attempts }),
            }
        }
    }

    async fn send(&self, request: Request) -> Result<Response> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.send(request))
                .await
                .map_err(|_| Error::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => self.transport.send(request).await,
        }
    }
}

/// Any response seen during the call makes exhaustion a `RetriesExhausted`
/// carrying the most recent status; `TransportExhausted` means no attempt
/// ever got a response.
fn exhausted(attempts: u32, last_status: Option<StatusCode>, rejection: Rejection) -> Error {
    let status = match rejection {
        Rejection::Response(status) => status,
        Rejection::Transport(source) => match last_status {
            Some(status) => status,
            None => {
                return Error::TransportExhausted {
                    attempts,
                    source: Box::new(source),
                }
            }
        },
    };
    Error::RetriesExhausted {
        attempts,
        status: status.as_u16(),
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}
