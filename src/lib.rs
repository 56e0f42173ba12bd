#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Response bodies under streaming, buffering and interception
//!
//! This crate is a small HTTP client harness built around one question: when
//! a server answers with an error status, does the caller still get to read
//! the body? The answer depends on three things that are usually chosen
//! independently, and this crate makes each of them explicit:
//!
//! 1. **The transport strategy** - [`StreamingTransport`] writes the request
//!    as a stream it cannot replay and discards the connection when a
//!    streamed request meets an authentication challenge, taking the
//!    response body with it. [`PooledTransport`] has no such edge.
//! 2. **Buffering** - [`BufferingTransport`] wraps either of the above and
//!    drains each body into a replayable buffer before anything downstream
//!    runs. It cannot drain a body whose connection is already gone.
//! 3. **Interception** - a [`LoggingInterceptor`] in the chain reads the
//!    body once. Over a buffered source that is harmless; over a dead
//!    source its read turns a response the caller could have summarised
//!    into a failed exchange.
//!
//! The [`Client`] facade maps the outcome either to a [`ClientResponse`] or
//! to a [`ClientError`] whose `Display` text is part of the contract.
//!
//! ## Client Usage
//!
//! ```ignore
//! use body_replay_http::{BufferingTransport, Client, LoggingInterceptor, StreamingTransport};
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::builder(BufferingTransport::new(StreamingTransport::new()))
//!         .interceptor(LoggingInterceptor::new())
//!         .build();
//!
//!     // Against a peer that answers every POST with 401, this loses the
//!     // whole exchange, not just the body:
//!     //   I/O error on POST request for "http://localhost:8800/hello-world-401":
//!     //   cannot retry due to server authentication, in streaming mode
//!     match client.exchange(Method::POST, "http://localhost:8800/hello-world-401").await {
//!         Ok(response) => println!("{} {}", response.status, response.body),
//!         Err(err) => eprintln!("{err}"),
//!     }
//! }
//! ```
//!
//! ## Demo Server
//!
//! The [`server`] module serves the always-401 peer and one route per
//! transport composition on a single listener; `src/main.rs` binds it to
//! `127.0.0.1:8800`.
//!
//! ## Module Structure
//!
//! - **[types]** - Exchange request and response types
//! - **[error]** - Error taxonomy, body read to facade boundary
//! - **[body]** - Single-consumption and replayable body sources
//! - **[transport]** - Streaming and pooled transports, buffering decorator
//! - **[interceptor]** - Interceptor chain and the logging interceptor
//! - **[client]** - Client facade and outcome mapping
//! - **[server]** - Demo Axum server

pub mod body;
pub mod client;
pub mod error;
pub mod interceptor;
pub mod server;
pub mod transport;
pub mod types;

pub use body::{BodyReader, ResponseBody};
pub use client::{Client, ClientBuilder, ClientResponse, UriEncoding};
pub use error::{BodyError, ClientError, TransportError};
pub use interceptor::{Interceptor, LoggingInterceptor, Next};
pub use transport::{
    BufferingTransport, PooledTransport, StreamingTransport, Transport, STREAMING_AUTH_ABORT,
};
pub use types::{ExchangeRequest, ExchangeResponse};
