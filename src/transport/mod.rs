//! Transport strategies: who performs the exchange, and what the body
//! source they hand back can still do.
//!
//! | Transport | Connection handling | Error-status body |
//! |-----------|--------------------|-------------------|
//! | [`StreamingTransport`] | socket per exchange, streams requests | lost when a streamed request meets an auth challenge |
//! | [`PooledTransport`] | pooled `reqwest` client | readable, once |
//! | [`BufferingTransport`] | delegates, then drains | replayable, or the drain failure replayed |
//!
//! Exactly one transport handles a given exchange. All of them treat any
//! parsed status as a successful exchange; what differs is the fate of the
//! body.

mod buffering;
mod http1;
mod pooled;
mod streaming;

pub use buffering::BufferingTransport;
pub use pooled::PooledTransport;
pub use streaming::{StreamingTransport, STREAMING_AUTH_ABORT};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::{ExchangeRequest, ExchangeResponse};

/// A strategy that performs one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Label identifying this transport in caller-facing output.
    fn name(&self) -> &'static str;

    /// Perform the exchange. Error statuses are responses, not errors;
    /// `Err` means the exchange itself failed.
    async fn execute(&self, request: &ExchangeRequest)
        -> Result<ExchangeResponse, TransportError>;
}

/// Shared handles delegate, so an `Arc<StreamingTransport>` can be wrapped
/// or configured anywhere a transport is expected.
#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn execute(&self, request: &ExchangeRequest)
        -> Result<ExchangeResponse, TransportError> {
        (**self).execute(request).await
    }
}
