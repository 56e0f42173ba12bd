//! Client-side interceptors.
//!
//! Interceptors wrap the transport as a call stack: the outermost
//! interceptor runs first, its [`Next::run`] call descends towards the
//! transport, and the response unwinds back out through each frame. The
//! chain is fixed at client construction and each interceptor runs exactly
//! once per exchange.
//!
//! An interceptor that reads the response body is an ordinary consumer of
//! it. Over a replayable source the read is invisible to the frames above;
//! over a single-consumption source it either exhausts the body for
//! everyone upstream or, if the source is already dead, fails, and that
//! failure replaces the exchange's outcome.

mod logging;

pub use logging::LoggingInterceptor;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::transport::Transport;
use crate::types::{ExchangeRequest, ExchangeResponse};

/// One link in the interceptor chain.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Handle `request`, delegating to `next` to continue the exchange.
    async fn intercept(
        &self,
        request: &ExchangeRequest,
        next: Next<'_>,
    ) -> Result<ExchangeResponse, TransportError>;
}

/// The remainder of the chain: the interceptors below the current frame,
/// then the transport.
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        interceptors: &'a [Arc<dyn Interceptor>],
        transport: &'a dyn Transport,
    ) -> Self {
        Next {
            interceptors,
            transport,
        }
    }

    /// Invoke the rest of the chain.
    pub async fn run(self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        match self.interceptors.split_first() {
            Some((head, rest)) => {
                head.intercept(request, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.execute(request).await,
        }
    }
}
