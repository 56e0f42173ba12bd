//! Error types, layered the way failures surface at runtime.
//!
//! [`BodyError`] covers reads of a response body source. [`TransportError`]
//! covers anything that prevents the interceptor chain from handing back a
//! usable response, including a body read that fails mid-chain.
//! [`ClientError`] sits at the facade boundary, where every failure is
//! rendered into the exact text callers observe.

use thiserror::Error;

/// Failure while reading a [`ResponseBody`](crate::body::ResponseBody).
///
/// Cloneable so a failed buffering drain can replay the same error to every
/// subsequent reader.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BodyError {
    /// The source was single-consumption and is no longer available: either
    /// it has already been drained, or the transport discarded the
    /// connection before the body could be read.
    #[error("{reason}")]
    AlreadyClosed {
        /// Cause of the closure, propagated verbatim to the caller.
        reason: String,
    },

    /// The connection broke mid-read.
    #[error("body read failed: {0}")]
    Read(String),
}

impl BodyError {
    /// Closed-stream error for a source that has already been drained.
    pub(crate) fn closed() -> Self {
        BodyError::AlreadyClosed {
            reason: "stream already closed".to_string(),
        }
    }
}

/// Failure of a transport strategy, or of the chain around it, to hand back
/// a usable response.
///
/// An error response (4xx/5xx status) is not a `TransportError`: every
/// transport here treats any parsed status as a successful exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The exchange died before a response was usable: connect failure or
    /// timeout, request write failure, or an unparseable response head.
    #[error("{0}")]
    Exchange(String),

    /// A response existed but its body was lost mid-chain, typically because
    /// an interceptor's read hit a dead source. The rendered message carries
    /// only the cause text, so callers cannot tell this apart from
    /// [`TransportError::Exchange`] by looking at the string.
    #[error(transparent)]
    BodyRead(#[from] BodyError),
}

/// Failure surfaced by [`Client::exchange`](crate::client::Client::exchange).
///
/// The `Display` output of each variant is the contract: callers and the
/// demo routes show these strings verbatim.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The target string could not be parsed as an absolute URL.
    #[error("invalid target \"{target}\": {message}")]
    InvalidTarget {
        /// The rejected target string.
        target: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The exchange produced no usable response, or lost it mid-chain.
    #[error("I/O error on {method} request for \"{url}\": {source}")]
    Io {
        /// Method of the failed exchange.
        method: http::Method,
        /// Target of the failed exchange.
        url: url::Url,
        /// Underlying failure, rendered verbatim after the colon.
        #[source]
        source: TransportError,
    },

    /// The transport delivered an error-status response. The summary quotes
    /// the body when it was readable and says `[no body]` otherwise.
    #[error("{status} : {preview}")]
    Status {
        /// Response status code.
        status: u16,
        /// `[no body]`, or the quoted (possibly truncated) body text.
        preview: String,
    },
}
