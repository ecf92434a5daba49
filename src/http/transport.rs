//! Transport boundary
//!
//! The executor never talks to the network directly. It hands each attempt
//! to a [`Transport`], which performs one request/response exchange.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// Performs one physical request/response exchange.
///
/// Implementations are shared by every call made through a client and must
/// be safe for concurrent use. An `Err` means no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one attempt and return whatever response came back
    async fn send(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response> {
        self.execute(request).await.map_err(Error::Http)
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request) -> Result<Response> {
        (**self).send(request).await
    }
}
