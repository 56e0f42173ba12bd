//! Response-logging interceptor.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::interceptor::{Interceptor, Next};
use crate::types::{ExchangeRequest, ExchangeResponse};

/// Logs each response's status and full body text.
///
/// Reads the body exactly once, as any consumer would. Over a replayable
/// source the read is invisible to the caller. Over a single-consumption
/// source it either exhausts the body or, if the source is already closed,
/// fails the whole exchange with the closure reason. Pair it with a
/// buffering transport when the caller also needs the body.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    /// New logging interceptor.
    pub fn new() -> Self {
        LoggingInterceptor
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(
        &self,
        request: &ExchangeRequest,
        next: Next<'_>,
    ) -> Result<ExchangeResponse, TransportError> {
        let response = next.run(request).await?;
        let body = response.body.text().await?;
        tracing::info!(
            "{} {} answered {} with body {:?}",
            request.method,
            request.url,
            response.status,
            body
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::ResponseBody;
    use crate::error::BodyError;
    use crate::transport::Transport;
    use http::Method;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use url::Url;

    struct Canned {
        body: fn() -> ResponseBody,
    }

    #[async_trait]
    impl Transport for Canned {
        fn name(&self) -> &'static str {
            "Canned"
        }

        async fn execute(
            &self,
            _request: &ExchangeRequest,
        ) -> Result<ExchangeResponse, TransportError> {
            Ok(ExchangeResponse::new(401, BTreeMap::new(), (self.body)()))
        }
    }

    fn request() -> ExchangeRequest {
        ExchangeRequest::new(Method::POST, Url::parse("http://localhost/x").unwrap())
    }

    async fn run_chain(transport: &Canned) -> Result<ExchangeResponse, TransportError> {
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(LoggingInterceptor::new())];
        Next::new(&chain, transport).run(&request()).await
    }

    #[tokio::test]
    async fn test_replayable_body_survives() {
        let transport = Canned {
            body: || ResponseBody::buffer("Unauthorized"),
        };
        let response = run_chain(&transport).await.unwrap();
        assert_eq!(response.body.text().await.unwrap(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_stream_body_spent() {
        struct OneShot;
        #[async_trait]
        impl crate::body::ChunkRead for OneShot {
            async fn next_chunk(&mut self) -> Result<Option<bytes::Bytes>, BodyError> {
                Ok(None)
            }
        }

        let transport = Canned {
            body: || ResponseBody::stream(OneShot),
        };
        let response = run_chain(&transport).await.unwrap();
        assert_eq!(
            response.body.text().await.unwrap_err(),
            BodyError::AlreadyClosed {
                reason: "stream already closed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_closed_source_fails_exchange() {
        let transport = Canned {
            body: || ResponseBody::torn_down("connection was discarded"),
        };
        let err = run_chain(&transport).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::BodyRead(BodyError::AlreadyClosed { .. })
        ));
        assert_eq!(err.to_string(), "connection was discarded");
    }
}
