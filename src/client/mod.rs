//! The client facade.
//!
//! One configured transport strategy, an interceptor chain, and the mapping
//! from exchange outcomes to the results callers see:
//!
//! | Outcome | Result |
//! |---------|--------|
//! | non-error status, readable body | [`ClientResponse`] |
//! | error status (4xx/5xx) | [`ClientError::Status`] with the body summarised |
//! | exchange failed, or body lost mid-chain | [`ClientError::Io`] with the cause verbatim |
//!
//! # Examples
//!
//! ```ignore
//! use body_replay_http::{BufferingTransport, Client, LoggingInterceptor, StreamingTransport};
//! use http::Method;
//!
//! let client = Client::builder(BufferingTransport::new(StreamingTransport::new()))
//!     .interceptor(LoggingInterceptor::new())
//!     .build();
//!
//! match client.exchange(Method::POST, "http://localhost:8800/hello-world-401").await {
//!     Ok(response) => println!("{} {}", response.status, response.body),
//!     Err(err) => println!("{err}"),
//! }
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use http::Method;
use url::Url;
use uuid::Uuid;

use crate::error::{ClientError, TransportError};
use crate::interceptor::{Interceptor, Next};
use crate::transport::Transport;
use crate::types::{ExchangeRequest, ExchangeResponse};

/// Stands in for the body text when an error response's body was empty or
/// could not be read.
const NO_BODY: &str = "[no body]";

/// Longest body excerpt quoted in a status summary.
const PREVIEW_LIMIT: usize = 200;

/// How [`Client::exchange`] treats the target string it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UriEncoding {
    /// The target is already percent-encoded. It is parsed as-is and
    /// existing `%xx` sequences are never encoded a second time.
    #[default]
    Preencoded,
    /// Encode the whole target, treating `%` as a literal character, so a
    /// pre-encoded `%20` becomes `%2520`.
    FullyEncode,
}

/// Successful result of [`Client::exchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientResponse {
    /// Response status code, never in the error range.
    pub status: u16,
    /// Full body text.
    pub body: String,
}

/// HTTP client over one transport strategy and an interceptor chain.
///
/// Cheap to clone; clones share the transport and chain.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    uri_encoding: UriEncoding,
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    uri_encoding: UriEncoding,
}

impl Client {
    /// Start building a client over `transport`.
    pub fn builder(transport: impl Transport + 'static) -> ClientBuilder {
        ClientBuilder {
            transport: Arc::new(transport),
            interceptors: Vec::new(),
            uri_encoding: UriEncoding::default(),
        }
    }

    /// Label of the configured transport, as reported by
    /// [`Transport::name`].
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Run the interceptor chain over the transport without interpreting
    /// the status code. Callers that want the outcome mapping use
    /// [`exchange`](Self::exchange) instead.
    pub async fn execute(
        &self,
        request: &ExchangeRequest,
    ) -> Result<ExchangeResponse, TransportError> {
        Next::new(&self.interceptors, &*self.transport)
            .run(request)
            .await
    }

    /// Issue a bodyless request for `target` and map the outcome.
    ///
    /// Error statuses become [`ClientError::Status`] carrying a body
    /// summary: the body text quoted, truncated past 200 characters, or
    /// `[no body]` when it was empty or unreadable. Exchange failures,
    /// including a body lost to an interceptor's read, become
    /// [`ClientError::Io`] with the cause text verbatim.
    pub async fn exchange(
        &self,
        method: Method,
        target: &str,
    ) -> Result<ClientResponse, ClientError> {
        let url = self.parse_target(target)?;
        let request = ExchangeRequest::new(method.clone(), url.clone());

        let exchange_id = Uuid::new_v4();
        tracing::debug!(
            "exchange {exchange_id}: {method} {url} via {}",
            self.transport.name()
        );

        let response = match self.execute(&request).await {
            Ok(response) => response,
            Err(source) => {
                tracing::debug!("exchange {exchange_id} failed: {source}");
                return Err(ClientError::Io {
                    method,
                    url,
                    source,
                });
            }
        };

        if (400..600).contains(&response.status) {
            let err = summarize_error(response).await;
            tracing::debug!("exchange {exchange_id} answered an error status: {err}");
            return Err(err);
        }

        let status = response.status;
        match response.body.text().await {
            Ok(body) => Ok(ClientResponse { status, body }),
            Err(error) => Err(ClientError::Io {
                method,
                url,
                source: TransportError::BodyRead(error),
            }),
        }
    }

    fn parse_target(&self, target: &str) -> Result<Url, ClientError> {
        let prepared: Cow<'_, str> = match self.uri_encoding {
            UriEncoding::Preencoded => Cow::Borrowed(target),
            UriEncoding::FullyEncode => Cow::Owned(target.replace('%', "%25")),
        };
        Url::parse(&prepared).map_err(|e| ClientError::InvalidTarget {
            target: target.to_string(),
            message: e.to_string(),
        })
    }
}

impl ClientBuilder {
    /// Append an interceptor; earlier ones wrap later ones.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Choose how targets are encoded. Defaults to
    /// [`UriEncoding::Preencoded`].
    pub fn uri_encoding(mut self, uri_encoding: UriEncoding) -> Self {
        self.uri_encoding = uri_encoding;
        self
    }

    /// Finish the client.
    pub fn build(self) -> Client {
        Client {
            transport: self.transport,
            interceptors: self.interceptors,
            uri_encoding: self.uri_encoding,
        }
    }
}

/// Summarise an error-status response. The body read happens here, on
/// whatever source the chain left behind; an unreadable body is reported as
/// absent rather than failing the call, since the status already tells the
/// caller what happened.
async fn summarize_error(response: ExchangeResponse) -> ClientError {
    let status = response.status;
    let preview = match response.body.text().await {
        Ok(text) if text.is_empty() => NO_BODY.to_string(),
        Ok(text) => quoted_preview(&text),
        Err(_) => NO_BODY.to_string(),
    };
    ClientError::Status { status, preview }
}

/// Quote `body` for a status summary, truncating long bodies.
fn quoted_preview(body: &str) -> String {
    if body.len() <= PREVIEW_LIMIT {
        return format!("\"{body}\"");
    }
    let mut cut = PREVIEW_LIMIT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("\"{}... ({} bytes)\"", &body[..cut], body.len())
}
