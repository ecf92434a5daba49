//! HTTP client facade
//!
//! [`Client`] is the public entry point. Its `execute*` methods default more
//! or less of the retry policy:
//!
//! - `execute` - client's default backoff, default predicate
//! - `execute_with_backoff` - caller's backoff, default predicate
//! - `execute_with_predicate` - caller's backoff and predicate
//! - `execute_until` - as above, plus a cancellation future

use super::executor::Executor;
use super::predicate::{default_retry_predicate, RetryPredicate};
use super::transport::Transport;
use crate::backoff::BackoffPolicy;
use crate::config::{BackoffConfig, ClientConfig, TransportConfig};
use crate::error::{Error, Result};
use crate::logging::{default_logger, Logger};
use bytes::Bytes;
use reqwest::{Body, Method, Request, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client that retries transient failures
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    executor: Executor,
    backoff: BackoffConfig,
}

impl Client {
    /// Create a client with the default transport settings, the default
    /// backoff policy and a `tracing` logger.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized, like
    /// `reqwest::Client::new`. Use [`Client::builder`] to handle that case.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("Failed to build HTTP client")
    }

    /// Start configuring a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client from a loaded configuration
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    /// Create a client that sends through an existing reqwest client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self::assemble(
            client.clone(),
            Arc::new(client),
            default_logger(),
            None,
            BackoffConfig::default(),
        )
    }

    /// Create a client that sends through a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::assemble(
            reqwest::Client::new(),
            Arc::new(transport),
            default_logger(),
            None,
            BackoffConfig::default(),
        )
    }

    fn assemble(
        http: reqwest::Client,
        transport: Arc<dyn Transport>,
        logger: Arc<dyn Logger>,
        attempt_timeout: Option<Duration>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            http,
            executor: Executor::new(transport, logger).with_attempt_timeout(attempt_timeout),
            backoff,
        }
    }

    /// Use the given logger instead of the default `tracing` one
    #[must_use]
    pub fn with_logger(mut self, logger: impl Logger + 'static) -> Self {
        self.executor = self.executor.with_logger(Arc::new(logger));
        self
    }

    /// The executor behind this client
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Settings of the policy used by [`Client::execute`]
    pub fn default_backoff_config(&self) -> &BackoffConfig {
        &self.backoff
    }

    /// The policy used by [`Client::execute`], in its initial state
    pub fn default_backoff(&self) -> Box<dyn BackoffPolicy> {
        self.backoff.build()
    }

    // ========================================================================
    // Retry entry points
    // ========================================================================

    /// Execute with the client's default backoff and the default predicate
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.execute_with_backoff(request, self.default_backoff())
            .await
    }

    /// Execute with the given backoff policy and the default predicate,
    /// which retries 5xx responses other than 501
    pub async fn execute_with_backoff<B>(&self, request: Request, backoff: B) -> Result<Response>
    where
        B: BackoffPolicy,
    {
        self.execute_with_predicate(request, backoff, default_retry_predicate)
            .await
    }

    /// Execute with the given backoff policy; `predicate` decides which
    /// responses are retried
    pub async fn execute_with_predicate<B, P>(
        &self,
        request: Request,
        mut backoff: B,
        predicate: P,
    ) -> Result<Response>
    where
        B: BackoffPolicy,
        P: RetryPredicate,
    {
        self.executor
            .execute(request, &mut backoff, &predicate)
            .await
    }

    /// Execute like [`Client::execute_with_predicate`], aborting with
    /// [`Error::Cancelled`] once `cancel` resolves
    pub async fn execute_until<B, P, C>(
        &self,
        request: Request,
        mut backoff: B,
        predicate: P,
        cancel: C,
    ) -> Result<Response>
    where
        B: BackoffPolicy,
        P: RetryPredicate,
        C: Future<Output = ()>,
    {
        self.executor
            .execute_until(request, &mut backoff, &predicate, cancel)
            .await
    }

    // ========================================================================
    // Convenience helpers
    // ========================================================================

    /// Start building a request against the pooled client
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Build `builder` and execute it with the default policy
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        self.execute(request).await
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Response> {
        let request = Request::new(Method::GET, Url::parse(url)?);
        self.execute(request).await
    }

    /// Make a POST request with a raw body
    pub async fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<Response> {
        let mut request = Request::new(Method::POST, Url::parse(url)?);
        *request.body_mut() = Some(Body::from(body.into()));
        self.execute(request).await
    }

    /// Make a GET request and parse the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        let json: T = response.json().await.map_err(Error::Http)?;
        Ok(json)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("executor", &self.executor)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Client`]
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    http: Option<reqwest::Client>,
    transport: Option<Arc<dyn Transport>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the reqwest timeout of one attempt, in whole seconds
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.transport.timeout_seconds = timeout.as_secs();
        self
    }

    /// Set a hard limit on each attempt, enforced by the executor
    #[must_use]
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.transport.attempt_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.transport.user_agent = agent.into();
        self
    }

    /// Add a default header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .transport
            .default_headers
            .insert(key.into(), value.into());
        self
    }

    /// Replace the transport settings
    #[must_use]
    pub fn transport_config(mut self, transport: TransportConfig) -> Self {
        self.config.transport = transport;
        self
    }

    /// Set the default backoff used by [`Client::execute`]
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.retry = backoff;
        self
    }

    /// Set the retry count of the default backoff
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Send through an existing reqwest client; transport settings other
    /// than `attempt_timeout` are ignored
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Send through a custom transport
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the logger
    #[must_use]
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Client> {
        self.config.validate()?;

        let http = match self.http {
            Some(client) => client,
            None => self.config.transport.build_client()?,
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(http.clone()),
        };

        Ok(Client::assemble(
            http,
            transport,
            self.logger.unwrap_or_else(default_logger),
            self.config.transport.attempt_timeout(),
            self.config.retry,
        ))
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("has_http_client", &self.http.is_some())
            .field("has_transport", &self.transport.is_some())
            .field("has_logger", &self.logger.is_some())
            .finish()
    }
}
