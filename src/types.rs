//! Request and response types for a single HTTP exchange.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::Method;
use url::Url;

use crate::body::ResponseBody;

/// One outgoing request.
///
/// Built once, then handed to transports by reference. Transports never
/// mutate it, which is what lets a caller issue the same request repeatedly
/// and expect the same outcome.
///
/// # Example
///
/// ```ignore
/// let request = ExchangeRequest::new(Method::POST, url)
///     .with_header("accept", "text/plain")
///     .with_body("payload");
/// ```
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL.
    pub url: Url,
    /// Extra headers, sent in insertion order.
    pub headers: Vec<(String, String)>,
    /// Optional request payload.
    pub body: Option<Bytes>,
}

impl ExchangeRequest {
    /// Request with no extra headers and no payload.
    pub fn new(method: Method, url: Url) -> Self {
        ExchangeRequest {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a payload.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether a transport writing this request commits to a request body on
    /// the wire. Methods that conventionally carry one commit even when the
    /// payload is empty, announcing a zero-length body rather than none.
    pub fn has_body_slot(&self) -> bool {
        self.body.is_some()
            || self.method == Method::POST
            || self.method == Method::PUT
            || self.method == Method::PATCH
    }
}

/// One response, as produced by a transport strategy.
///
/// Status and headers are plain data and survive anything that later happens
/// to the body. What a reader can still do with [`body`](Self::body) depends
/// on which transport produced it; see [`ResponseBody`].
#[derive(Debug)]
pub struct ExchangeResponse {
    /// Status code.
    pub status: u16,
    /// Response headers, keys lowercased.
    pub headers: BTreeMap<String, String>,
    /// The body source.
    pub body: ResponseBody,
}

impl ExchangeResponse {
    /// Assemble a response.
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: ResponseBody) -> Self {
        ExchangeResponse {
            status,
            headers,
            body,
        }
    }

    /// Split into status, headers and body, giving up ownership of the
    /// body source.
    pub fn into_parts(self) -> (u16, BTreeMap<String, String>, ResponseBody) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://localhost:8800/hello-world-401").unwrap()
    }

    #[test]
    fn test_bodyless_post_has_body_slot() {
        assert!(ExchangeRequest::new(Method::POST, url()).has_body_slot());
        assert!(ExchangeRequest::new(Method::PUT, url()).has_body_slot());
        assert!(ExchangeRequest::new(Method::PATCH, url()).has_body_slot());
    }

    #[test]
    fn test_bodyless_get_has_no_body_slot() {
        assert!(!ExchangeRequest::new(Method::GET, url()).has_body_slot());
        assert!(!ExchangeRequest::new(Method::DELETE, url()).has_body_slot());
    }

    #[test]
    fn test_payload_creates_body_slot() {
        let request = ExchangeRequest::new(Method::GET, url()).with_body("x");
        assert!(request.has_body_slot());
    }

    #[test]
    fn test_header_order() {
        let request = ExchangeRequest::new(Method::GET, url())
            .with_header("a", "1")
            .with_header("b", "2");
        assert_eq!(
            request.headers,
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
        );
    }
}
