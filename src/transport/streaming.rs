//! The minimal streaming transport.
//!
//! One raw `connection: close` HTTP/1.1 exchange per call over a plain
//! [`TcpStream`]. Request bodies are streamed: the transport commits to the
//! payload on the wire before the response status is known, and keeps no
//! copy it could resend. Any parsed status is a successful exchange.
//!
//! The one sharp edge follows from streaming. When the server answers a
//! streamed request with an authentication challenge (401 or 407), the
//! request cannot be replayed with credentials, so the transport discards
//! the connection. Status line and headers survive; the body bytes the
//! server sent go down with the socket, and every read of the body source
//! fails with [`STREAMING_AUTH_ABORT`] as the reason.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::body::ResponseBody;
use crate::error::TransportError;
use crate::transport::http1::{body_framing, read_head, render_request_head, WireBody};
use crate::transport::Transport;
use crate::types::{ExchangeRequest, ExchangeResponse};

/// Reason recorded on the body source when a streamed request is answered
/// with an authentication challenge. Callers see it verbatim.
pub const STREAMING_AUTH_ABORT: &str =
    "cannot retry due to server authentication, in streaming mode";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal streaming transport: socket per exchange, no pooling, no
/// redirect handling, response body read straight off the wire.
#[derive(Debug, Clone)]
pub struct StreamingTransport {
    connect_timeout: Duration,
}

impl StreamingTransport {
    /// Transport with the default 10 second connect timeout.
    pub fn new() -> Self {
        StreamingTransport {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the connect timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    async fn connect(&self, request: &ExchangeRequest) -> Result<TcpStream, TransportError> {
        let host = request
            .url
            .host_str()
            .ok_or_else(|| TransportError::Exchange(format!("no host in target {}", request.url)))?;
        let port = request
            .url
            .port_or_known_default()
            .ok_or_else(|| TransportError::Exchange(format!("no port in target {}", request.url)))?;

        match timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(TransportError::Exchange(format!(
                "connect to {host}:{port} failed: {e}"
            ))),
            Err(_) => Err(TransportError::Exchange(format!(
                "connect to {host}:{port} timed out after {:?}",
                self.connect_timeout
            ))),
        }
    }
}

impl Default for StreamingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StreamingTransport {
    fn name(&self) -> &'static str {
        "StreamingTransport"
    }

    async fn execute(&self, request: &ExchangeRequest) -> Result<ExchangeResponse, TransportError> {
        let streamed = request.has_body_slot();
        let mut stream = self.connect(request).await?;

        let mut wire = render_request_head(request, streamed);
        if let Some(body) = &request.body {
            wire.extend_from_slice(body);
        }
        stream
            .write_all(&wire)
            .await
            .map_err(|e| TransportError::Exchange(format!("request write failed: {e}")))?;

        let mut leftover = BytesMut::with_capacity(8 * 1024);
        let (status, headers) = read_head(&mut stream, &mut leftover).await?;
        tracing::debug!(
            "streaming exchange {} {} answered {}",
            request.method,
            request.url,
            status
        );

        // A streamed request cannot be replayed to answer an authentication
        // challenge. The connection, and the body bytes on it, are discarded.
        if streamed && (status == 401 || status == 407) {
            drop(stream);
            tracing::debug!(
                "discarded connection for {} {}: auth challenge to a streamed request",
                request.method,
                request.url
            );
            return Ok(ExchangeResponse::new(
                status,
                headers,
                ResponseBody::torn_down(STREAMING_AUTH_ABORT),
            ));
        }

        let framing = body_framing(&request.method, status, &headers)?;
        let body = ResponseBody::stream(WireBody::new(stream, leftover, framing));
        Ok(ExchangeResponse::new(status, headers, body))
    }
}
