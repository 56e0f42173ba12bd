//! Response body sources: single-consumption streams and replayable buffers.
//!
//! Every [`ExchangeResponse`](crate::types::ExchangeResponse) carries a
//! [`ResponseBody`]. What a reader can do with it depends on the transport
//! that produced it:
//!
//! - a **stream** source is bound to the live connection and supports at
//!   most one full read. Reading again, or reading after the transport has
//!   discarded the connection, fails with
//!   [`BodyError::AlreadyClosed`](crate::error::BodyError::AlreadyClosed).
//! - a **buffer** source is fully in memory. Every [`ResponseBody::reader`]
//!   call hands out an independent cursor starting at offset zero.
//! - a **failed** source replays the error a buffering drain hit, so later
//!   readers observe exactly what the drain observed.
//!
//! All reads run through [`BodyReader`]; [`ResponseBody::bytes`] and
//! [`ResponseBody::text`] are shorthands for one full read on a fresh
//! cursor.

use std::fmt;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;

use crate::error::BodyError;

/// Incremental byte producer bound to a live connection.
///
/// Implemented by the wire reader of the streaming transport and by the
/// reqwest-backed stream of the pooled transport. Dropping the implementor
/// releases the connection.
#[async_trait]
pub(crate) trait ChunkRead: Send {
    /// Next chunk of body bytes; `Ok(None)` is end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError>;
}

/// Where a stream source currently stands. Guarded by a mutex so concurrent
/// readers serialize instead of interleaving chunks.
enum StreamState {
    /// The connection still owns unread body bytes.
    Live(Box<dyn ChunkRead>),
    /// One full read completed and the connection has been released.
    Drained,
    /// The transport discarded the connection before the body could be read.
    TornDown {
        /// Replayed as the `AlreadyClosed` reason on every read attempt.
        reason: String,
    },
}

enum Inner {
    Stream(Mutex<StreamState>),
    Buffer(Bytes),
    Failed(BodyError),
}

/// The body of an [`ExchangeResponse`](crate::types::ExchangeResponse).
pub struct ResponseBody {
    inner: Inner,
}

impl ResponseBody {
    /// Single-consumption source over a live connection.
    pub(crate) fn stream(reader: impl ChunkRead + 'static) -> Self {
        ResponseBody {
            inner: Inner::Stream(Mutex::new(StreamState::Live(Box::new(reader)))),
        }
    }

    /// Replayable in-memory source.
    pub fn buffer(bytes: impl Into<Bytes>) -> Self {
        ResponseBody {
            inner: Inner::Buffer(bytes.into()),
        }
    }

    /// Source whose connection was discarded before the body could be read.
    /// Every read fails with `AlreadyClosed` carrying `reason`.
    pub(crate) fn torn_down(reason: impl Into<String>) -> Self {
        ResponseBody {
            inner: Inner::Stream(Mutex::new(StreamState::TornDown {
                reason: reason.into(),
            })),
        }
    }

    /// Source standing in for body bytes a buffering drain failed to
    /// collect. Every read replays `error`.
    pub(crate) fn failed(error: BodyError) -> Self {
        ResponseBody {
            inner: Inner::Failed(error),
        }
    }

    /// Whether repeated full reads of this source yield the same bytes.
    /// True only for buffered sources.
    pub fn is_replayable(&self) -> bool {
        matches!(self.inner, Inner::Buffer(_))
    }

    /// A fresh read cursor.
    ///
    /// Buffered sources give every reader its own offset; stream sources
    /// share the single wire cursor, so a second reader only ever observes
    /// the closed stream.
    pub fn reader(&self) -> BodyReader<'_> {
        BodyReader {
            body: self,
            offset: 0,
        }
    }

    /// Read the whole body on a fresh cursor.
    pub async fn bytes(&self) -> Result<Bytes, BodyError> {
        if let Inner::Buffer(bytes) = &self.inner {
            return Ok(bytes.clone());
        }
        let mut reader = self.reader();
        let mut collected = BytesMut::new();
        while let Some(chunk) = reader.chunk().await? {
            collected.extend_from_slice(&chunk);
        }
        Ok(collected.freeze())
    }

    /// Read the whole body as text, replacing invalid UTF-8.
    pub async fn text(&self) -> Result<String, BodyError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Stream(_) => f.write_str("ResponseBody::Stream"),
            Inner::Buffer(bytes) => write!(f, "ResponseBody::Buffer({} bytes)", bytes.len()),
            Inner::Failed(error) => write!(f, "ResponseBody::Failed({error})"),
        }
    }
}

/// Cursor over a [`ResponseBody`].
pub struct BodyReader<'a> {
    body: &'a ResponseBody,
    offset: usize,
}

impl BodyReader<'_> {
    /// Next chunk of body bytes; `Ok(None)` is end of stream.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        match &self.body.inner {
            Inner::Buffer(bytes) => {
                if self.offset >= bytes.len() {
                    return Ok(None);
                }
                let chunk = bytes.slice(self.offset..);
                self.offset = bytes.len();
                Ok(Some(chunk))
            }
            Inner::Failed(error) => Err(error.clone()),
            Inner::Stream(state) => {
                let mut state = state.lock().await;
                match &mut *state {
                    StreamState::Live(reader) => match reader.next_chunk().await {
                        Ok(Some(chunk)) => Ok(Some(chunk)),
                        Ok(None) => {
                            // End of body. Dropping the reader releases the
                            // connection; later reads see a closed stream.
                            *state = StreamState::Drained;
                            Ok(None)
                        }
                        Err(error) => {
                            *state = StreamState::Drained;
                            Err(error)
                        }
                    },
                    StreamState::Drained => Err(BodyError::closed()),
                    StreamState::TornDown { reason } => Err(BodyError::AlreadyClosed {
                        reason: reason.clone(),
                    }),
                }
            }
        }
    }
}
