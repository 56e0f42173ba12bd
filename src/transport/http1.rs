//! Minimal HTTP/1.1 wire support for the streaming transport.
//!
//! Just enough protocol for one `connection: close` exchange: render a
//! request head, parse a response head, pick the body framing, and expose
//! the rest of the connection as a [`ChunkRead`] that releases the socket
//! once the body ends.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use http::Method;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::body::ChunkRead;
use crate::error::{BodyError, TransportError};
use crate::types::ExchangeRequest;

/// Upper bound on buffered head bytes before giving up on a peer.
const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Read granularity for body bytes.
const READ_CHUNK: usize = 8 * 1024;

/// Render the request head, including the trailing blank line.
///
/// Streamed requests always carry a `content-length`, zero included. That
/// commitment is what later makes an authentication challenge unanswerable
/// mid-stream.
pub(crate) fn render_request_head(request: &ExchangeRequest, streamed: bool) -> Vec<u8> {
    let url = &request.url;
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut head = format!("{} {} HTTP/1.1\r\n", request.method, target);
    let host = url.host_str().unwrap_or("localhost");
    match url.port() {
        Some(port) => head.push_str(&format!("host: {host}:{port}\r\n")),
        None => head.push_str(&format!("host: {host}\r\n")),
    }
    head.push_str("connection: close\r\n");
    for (name, value) in &request.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if streamed {
        let length = request.body.as_ref().map_or(0, Bytes::len);
        head.push_str(&format!("content-length: {length}\r\n"));
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// Read from `io` until the blank line ending the response head. Body bytes
/// that arrive in the same reads are left in `buf`.
pub(crate) async fn read_head<R>(
    io: &mut R,
    buf: &mut BytesMut,
) -> Result<(u16, BTreeMap<String, String>), TransportError>
where
    R: AsyncRead + Unpin + Send,
{
    loop {
        if let Some(end) = find_head_end(buf) {
            let head = buf.split_to(end);
            return parse_head(&head[..head.len() - 4]);
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(TransportError::Exchange(
                "response head exceeds 64 KiB".to_string(),
            ));
        }
        buf.reserve(READ_CHUNK);
        let n = io
            .read_buf(buf)
            .await
            .map_err(|e| TransportError::Exchange(format!("response read failed: {e}")))?;
        if n == 0 {
            return Err(TransportError::Exchange(
                "connection closed before response head".to_string(),
            ));
        }
    }
}

fn find_head_end(buf: &BytesMut) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn parse_head(head: &[u8]) -> Result<(u16, BTreeMap<String, String>), TransportError> {
    let text = std::str::from_utf8(head)
        .map_err(|_| TransportError::Exchange("response head is not valid UTF-8".to_string()))?;

    let mut lines = text.split("\r\n");
    let status = parse_status_line(lines.next().unwrap_or(""))?;

    let mut headers = BTreeMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some(colon) = line.find(':') {
            let key = line[..colon].trim().to_lowercase();
            let value = line[colon + 1..].trim().to_string();
            headers.insert(key, value);
        }
    }
    Ok((status, headers))
}

fn parse_status_line(line: &str) -> Result<u16, TransportError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/1.") {
        return Err(TransportError::Exchange(format!(
            "unsupported protocol in status line {line:?}"
        )));
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..=599).contains(code))
        .ok_or_else(|| TransportError::Exchange(format!("malformed status line {line:?}")))
}

/// How the rest of the connection maps to body bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyFraming {
    /// No body at all: HEAD responses, 1xx, 204, 304.
    None,
    /// Exactly this many bytes.
    Length(u64),
    /// Chunked transfer coding.
    Chunked,
    /// Body runs until the peer closes the connection.
    Close,
}

/// Pick the body framing for a parsed response head.
pub(crate) fn body_framing(
    method: &Method,
    status: u16,
    headers: &BTreeMap<String, String>,
) -> Result<BodyFraming, TransportError> {
    if *method == Method::HEAD || (100..200).contains(&status) || status == 204 || status == 304 {
        return Ok(BodyFraming::None);
    }
    if let Some(te) = headers.get("transfer-encoding") {
        if te.to_lowercase().contains("chunked") {
            return Ok(BodyFraming::Chunked);
        }
    }
    if let Some(length) = headers.get("content-length") {
        let length = length
            .trim()
            .parse::<u64>()
            .map_err(|_| TransportError::Exchange(format!("invalid content-length {length:?}")))?;
        return Ok(BodyFraming::Length(length));
    }
    Ok(BodyFraming::Close)
}

#[derive(Clone, Copy)]
enum FramingState {
    Length { remaining: u64 },
    Chunked(ChunkedState),
    Close,
    Done,
}

#[derive(Clone, Copy)]
enum ChunkedState {
    /// Expecting a `{hex-size}\r\n` line.
    Size,
    /// Inside chunk data.
    Data { remaining: u64 },
    /// Expecting the `\r\n` after chunk data.
    DataEnd,
    /// After the zero-size chunk, until the blank line.
    Trailers,
}

enum Step {
    Emit(Bytes),
    Finished,
    Continue,
}

/// Connection-bound body reader.
///
/// Owns the socket for the rest of the exchange and drops it, closing the
/// connection, once the body ends, a read fails, or the value itself is
/// dropped.
pub(crate) struct WireBody<R> {
    io: Option<R>,
    buf: BytesMut,
    framing: FramingState,
}

impl<R> WireBody<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Wrap the rest of `io` as a body. `leftover` holds body bytes already
    /// pulled off the socket while reading the head.
    pub(crate) fn new(io: R, leftover: BytesMut, framing: BodyFraming) -> Self {
        let framing = match framing {
            BodyFraming::None | BodyFraming::Length(0) => FramingState::Done,
            BodyFraming::Length(n) => FramingState::Length { remaining: n },
            BodyFraming::Chunked => FramingState::Chunked(ChunkedState::Size),
            BodyFraming::Close => FramingState::Close,
        };
        let io = match framing {
            FramingState::Done => None,
            _ => Some(io),
        };
        WireBody {
            io,
            buf: leftover,
            framing,
        }
    }

    fn finish(&mut self) {
        self.framing = FramingState::Done;
        self.io = None;
    }

    /// Pull more bytes off the socket; 0 means EOF.
    async fn fill(&mut self) -> Result<usize, BodyError> {
        let Some(io) = self.io.as_mut() else {
            return Ok(0);
        };
        self.buf.reserve(READ_CHUNK);
        io.read_buf(&mut self.buf)
            .await
            .map_err(|e| BodyError::Read(e.to_string()))
    }

    /// Fill, treating EOF as a broken connection.
    async fn fill_or_fail(&mut self, reading: &str) -> Result<(), BodyError> {
        if self.fill().await? == 0 {
            self.finish();
            return Err(BodyError::Read(format!(
                "connection closed while reading {reading}"
            )));
        }
        Ok(())
    }

    /// Take one CRLF-terminated line out of the buffer, without the CRLF.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let line = self.buf.split_to(pos);
        self.buf.advance(2);
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    async fn step_chunked(&mut self, state: ChunkedState) -> Result<Step, BodyError> {
        match state {
            ChunkedState::Size => {
                let Some(line) = self.take_line() else {
                    self.fill_or_fail("chunk size").await?;
                    return Ok(Step::Continue);
                };
                // Chunk extensions after `;` are ignored.
                let size_text = line.split(';').next().unwrap_or("").trim();
                let size = u64::from_str_radix(size_text, 16)
                    .map_err(|_| BodyError::Read(format!("invalid chunk size {size_text:?}")))?;
                self.framing = FramingState::Chunked(if size == 0 {
                    ChunkedState::Trailers
                } else {
                    ChunkedState::Data { remaining: size }
                });
                Ok(Step::Continue)
            }
            ChunkedState::Data { remaining } => {
                if self.buf.is_empty() {
                    self.fill_or_fail("chunk data").await?;
                    return Ok(Step::Continue);
                }
                let take = remaining.min(self.buf.len() as u64) as usize;
                let chunk = self.buf.split_to(take).freeze();
                let remaining = remaining - take as u64;
                self.framing = FramingState::Chunked(if remaining == 0 {
                    ChunkedState::DataEnd
                } else {
                    ChunkedState::Data { remaining }
                });
                Ok(Step::Emit(chunk))
            }
            ChunkedState::DataEnd => {
                let Some(line) = self.take_line() else {
                    self.fill_or_fail("chunk terminator").await?;
                    return Ok(Step::Continue);
                };
                if !line.is_empty() {
                    return Err(BodyError::Read(format!("malformed chunk terminator {line:?}")));
                }
                self.framing = FramingState::Chunked(ChunkedState::Size);
                Ok(Step::Continue)
            }
            ChunkedState::Trailers => {
                let Some(line) = self.take_line() else {
                    self.fill_or_fail("trailers").await?;
                    return Ok(Step::Continue);
                };
                if line.is_empty() {
                    Ok(Step::Finished)
                } else {
                    // Trailer header, ignored.
                    Ok(Step::Continue)
                }
            }
        }
    }
}

#[async_trait]
impl<R> ChunkRead for WireBody<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        loop {
            match self.framing {
                FramingState::Done => return Ok(None),

                FramingState::Length { remaining } => {
                    if self.buf.is_empty() && self.fill().await? == 0 {
                        self.finish();
                        return Err(BodyError::Read(format!(
                            "connection closed with {remaining} body bytes missing"
                        )));
                    }
                    let take = remaining.min(self.buf.len() as u64) as usize;
                    let chunk = self.buf.split_to(take).freeze();
                    let remaining = remaining - take as u64;
                    if remaining == 0 {
                        self.finish();
                    } else {
                        self.framing = FramingState::Length { remaining };
                    }
                    return Ok(Some(chunk));
                }

                FramingState::Close => {
                    if !self.buf.is_empty() {
                        return Ok(Some(self.buf.split().freeze()));
                    }
                    if self.fill().await? == 0 {
                        self.finish();
                        return Ok(None);
                    }
                }

                FramingState::Chunked(state) => match self.step_chunked(state).await? {
                    Step::Emit(chunk) => return Ok(Some(chunk)),
                    Step::Finished => {
                        self.finish();
                        return Ok(None);
                    }
                    Step::Continue => {}
                },
            }
        }
    }
}
