//! The buffering decorator.
//!
//! Wraps any transport and drains each response body into memory exactly
//! once, before anything downstream runs, handing the chain a replayable
//! source. Interceptors behind it can read freely without consuming what
//! the caller will read.
//!
//! What it cannot do is resurrect a source the inner transport already
//! discarded. In that case the exchange still succeeds, status and headers
//! intact, and the drain failure becomes the body: every later read replays
//! it, and the first reader in the chain turns it into the exchange's
//! failure.

use async_trait::async_trait;

use crate::body::ResponseBody;
use crate::error::TransportError;
use crate::transport::Transport;
use crate::types::{ExchangeRequest, ExchangeResponse};

/// Buffering decorator over another transport.
#[derive(Debug, Clone)]
pub struct BufferingTransport<T> {
    inner: T,
}

impl<T: Transport> BufferingTransport<T> {
    /// Wrap `inner`, buffering every response body it produces.
    pub fn new(inner: T) -> Self {
        BufferingTransport { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for BufferingTransport<T> {
    /// The decorator is transparent: responses are attributed to the
    /// transport that performed the exchange.
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn execute(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        let response = self.inner.execute(request).await?;
        let (status, headers, body) = response.into_parts();
        let body = match body.bytes().await {
            Ok(bytes) => ResponseBody::buffer(bytes),
            Err(error) => {
                tracing::debug!(
                    "buffering drain failed for {} {}: {error}",
                    request.method,
                    request.url
                );
                ResponseBody::failed(error)
            }
        };
        Ok(ExchangeResponse::new(status, headers, body))
    }
}
