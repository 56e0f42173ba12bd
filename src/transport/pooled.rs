//! The pooled transport.
//!
//! Backed by a shared [`reqwest::Client`]: connection pooling, keep-alive,
//! proper response draining. Outcome semantics match the streaming
//! transport, any parsed status is a successful exchange, but without its
//! abort edge: the body of an error response stays available for one full
//! read, whatever the status.
//!
//! Redirects are disabled so a 3xx surfaces as the response it is instead
//! of being followed behind the caller's back.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::body::{ChunkRead, ResponseBody};
use crate::error::{BodyError, TransportError};
use crate::transport::Transport;
use crate::types::{ExchangeRequest, ExchangeResponse};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Feature-rich transport over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct PooledTransport {
    client: reqwest::Client,
}

impl PooledTransport {
    /// Transport with the default 30 second overall request timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Transport with a custom overall request timeout.
    pub fn with_timeout(request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();
        PooledTransport { client }
    }
}

impl Default for PooledTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for PooledTransport {
    fn name(&self) -> &'static str {
        "PooledTransport"
    }

    async fn execute(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Exchange(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        tracing::debug!(
            "pooled exchange {} {} answered {}",
            request.method,
            request.url,
            status
        );

        let body = ResponseBody::stream(PooledBody::new(response.bytes_stream()));
        Ok(ExchangeResponse::new(status, headers, body))
    }
}

/// Single-consumption reader over reqwest's byte stream.
struct PooledBody {
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl PooledBody {
    fn new(stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        PooledBody {
            stream: stream.boxed(),
        }
    }
}

#[async_trait]
impl ChunkRead for PooledBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        match self.stream.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(BodyError::Read(e.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BodyError;
    use http::Method;
    use url::Url;

    fn target(server: &mockito::Server, path: &str) -> Url {
        Url::parse(&format!("{}{path}", server.url())).unwrap()
    }

    #[tokio::test]
    async fn test_error_status_body_readable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hello-world-401")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let request = ExchangeRequest::new(Method::POST, target(&server, "/hello-world-401"));
        let response = PooledTransport::new().execute(&request).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(response.body.text().await.unwrap(), "Unauthorized");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_single_consumption() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/once")
            .with_status(200)
            .with_body("only once")
            .create_async()
            .await;

        let request = ExchangeRequest::new(Method::GET, target(&server, "/once"));
        let response = PooledTransport::new().execute(&request).await.unwrap();

        assert!(!response.body.is_replayable());
        assert_eq!(response.body.text().await.unwrap(), "only once");
        assert_eq!(
            response.body.text().await.unwrap_err(),
            BodyError::AlreadyClosed {
                reason: "stream already closed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_error_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/empty")
            .with_status(401)
            .create_async()
            .await;

        let request = ExchangeRequest::new(Method::POST, target(&server, "/empty"));
        let response = PooledTransport::new().execute(&request).await.unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(response.body.text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_headers_lowercased() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/headers")
            .with_status(200)
            .with_header("X-Marker", "yes")
            .with_body("ok")
            .create_async()
            .await;

        let request = ExchangeRequest::new(Method::GET, target(&server, "/headers"));
        let response = PooledTransport::new().execute(&request).await.unwrap();
        assert_eq!(response.headers.get("x-marker").unwrap(), "yes");
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = ExchangeRequest::new(
            Method::GET,
            Url::parse(&format!("http://{addr}/gone")).unwrap(),
        );
        let err = PooledTransport::new().execute(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Exchange(_)));
    }
}
