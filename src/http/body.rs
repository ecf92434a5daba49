//! Request body buffering
//!
//! A `reqwest::Body` is consumed by the transport on send. The body is read
//! into memory once, before the first attempt, and every attempt gets its
//! own copy built from those bytes.

use crate::error::{Error, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Body, Request};

/// The original bytes of a request body, kept for replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedBody {
    bytes: Option<Bytes>,
}

impl BufferedBody {
    /// Take the body out of `request` and read it fully.
    ///
    /// Bodyless requests are left untouched. A read failure is returned as
    /// [`Error::BodyRead`], which callers must not retry.
    pub async fn capture(request: &mut Request) -> Result<Self> {
        let Some(body) = request.body_mut().take() else {
            return Ok(Self::default());
        };

        if let Some(bytes) = body.as_bytes() {
            return Ok(Self {
                bytes: Some(Bytes::copy_from_slice(bytes)),
            });
        }

        let collected = body.collect().await.map_err(Error::body_read)?;
        Ok(Self {
            bytes: Some(collected.to_bytes()),
        })
    }

    /// Whether the original request carried a body at all
    pub fn is_present(&self) -> bool {
        self.bytes.is_some()
    }

    /// Buffered length in bytes; zero when there is no body
    pub fn len(&self) -> usize {
        self.bytes.as_ref().map_or(0, Bytes::len)
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The buffered bytes, if the request had a body
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// A fresh body for one attempt. Shares the buffer, no copy.
    pub fn replay(&self) -> Option<Body> {
        self.bytes.clone().map(Body::from)
    }

    /// Rebuild `template` for one attempt, attaching a fresh body
    pub fn attach(&self, template: &Request) -> Request {
        let mut request = Request::new(template.method().clone(), template.url().clone());
        *request.headers_mut() = template.headers().clone();
        *request.timeout_mut() = template.timeout().copied();
        *request.version_mut() = template.version();
        *request.body_mut() = self.replay();
        request
    }
}
