//! Blocking reads over asynchronous chunk sources
//!
//! A [`ChunkSource`] hands out byte chunks asynchronously. Sequential
//! decoders such as `tar` need a blocking [`std::io::Read`]. [`bridge`] joins
//! the two with a single-slot handoff:
//!
//! - the [`ByteStreamAdapter`] runs on a blocking thread and, when its held
//!   chunk is used up, posts one request and blocks until it is answered
//! - the [`ChunkPump`] runs as an async task and answers each request with
//!   exactly one chunk, an end marker, or a failure
//!
//! Only one request is ever in flight, so the source is never read ahead.
//!
//! ```
//! use std::io::Read;
//! use mimetar::stream::{bridge, VecSource};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let source = VecSource::new(vec![b"hello ".to_vec(), b"world".to_vec()]);
//! let (mut adapter, pump) = bridge(source);
//! tokio::spawn(pump.run());
//!
//! let text = tokio::task::spawn_blocking(move || {
//!     let mut text = String::new();
//!     adapter.read_to_string(&mut text).map(|_| text)
//! })
//! .await
//! .unwrap()
//! .unwrap();
//! assert_eq!(text, "hello world");
//! # });
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, Read};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::error::{DecodeError, Result};

/// Default chunk size for [`AsyncReadSource`]
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// An asynchronous provider of successive byte chunks
pub trait ChunkSource: Send + 'static {
    /// The next chunk, or `None` once the source is exhausted
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
}

/// Answer to one chunk request
#[derive(Debug)]
pub enum Delivery {
    /// Next bytes of the source
    Chunk(Vec<u8>),
    /// End of source
    End,
    /// The source failed
    Failed(String),
}

type Request = oneshot::Sender<Delivery>;

/// Connect a chunk source to a blocking reader
///
/// The returned [`ChunkPump`] must be driven (usually with `tokio::spawn`)
/// for the adapter to make progress. The adapter must only be used from a
/// blocking context such as `spawn_blocking` or a plain thread.
pub fn bridge<S: ChunkSource>(source: S) -> (ByteStreamAdapter, ChunkPump<S>) {
    let (requests, inbox) = mpsc::channel(1);
    let adapter = ByteStreamAdapter {
        requests,
        chunk: Vec::new(),
        offset: 0,
        exhausted: false,
        failure: None,
        requests_issued: 0,
    };
    let pump = ChunkPump { source, inbox };
    (adapter, pump)
}

/// Blocking, pull-based reader over a chunk source
///
/// Holds at most one chunk. Bytes come out in source order; a chunk larger
/// than the caller's buffer is served across several calls.
#[derive(Debug)]
pub struct ByteStreamAdapter {
    requests: mpsc::Sender<Request>,
    chunk: Vec<u8>,
    offset: usize,
    exhausted: bool,
    failure: Option<String>,
    requests_issued: u64,
}

impl ByteStreamAdapter {
    /// Fill `buf` from the source, blocking as needed
    ///
    /// Returns the number of bytes written, which is less than `buf.len()`
    /// only once the source is exhausted. After end of source every call
    /// returns 0 without touching the source again.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Stream`] when the source fails or disappears. Bytes
    /// already copied by the failing call are returned first; the failure is
    /// reported by the next call and by every call after it.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(message) = &self.failure {
            return Err(DecodeError::Stream(message.clone()));
        }

        let mut filled = 0;
        while filled < buf.len() {
            if self.offset >= self.chunk.len() {
                if self.exhausted {
                    break;
                }
                if let Err(err) = self.request_chunk() {
                    if filled > 0 {
                        break;
                    }
                    return Err(err);
                }
                continue;
            }

            let available = &self.chunk[self.offset..];
            let n = available.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&available[..n]);
            self.offset += n;
            filled += n;
        }

        Ok(filled)
    }

    /// Number of chunk requests sent to the source so far
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    /// Whether end of source has been observed
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn request_chunk(&mut self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        if self.requests.blocking_send(reply).is_err() {
            return Err(self.fail("chunk source is gone".to_string()));
        }
        self.requests_issued += 1;

        match response.blocking_recv() {
            Ok(Delivery::Chunk(chunk)) => {
                trace!(len = chunk.len(), request = self.requests_issued, "chunk delivered");
                self.chunk = chunk;
                self.offset = 0;
                Ok(())
            }
            Ok(Delivery::End) => {
                trace!(request = self.requests_issued, "end of source");
                self.chunk = Vec::new();
                self.offset = 0;
                self.exhausted = true;
                Ok(())
            }
            Ok(Delivery::Failed(message)) => Err(self.fail(message)),
            Err(_) => Err(self.fail("chunk request dropped unanswered".to_string())),
        }
    }

    fn fail(&mut self, message: String) -> DecodeError {
        self.failure = Some(message.clone());
        DecodeError::Stream(message)
    }
}

impl Read for ByteStreamAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill(buf).map_err(io::Error::other)
    }
}

/// Async half of [`bridge`]: answers chunk requests from the source
#[derive(Debug)]
pub struct ChunkPump<S> {
    source: S,
    inbox: mpsc::Receiver<Request>,
}

impl<S: ChunkSource> ChunkPump<S> {
    /// Serve requests until end of source, a failure, or the adapter is dropped
    pub async fn run(mut self) {
        while let Some(reply) = self.inbox.recv().await {
            let delivery = match self.source.next_chunk().await {
                Ok(Some(chunk)) => Delivery::Chunk(chunk),
                Ok(None) => Delivery::End,
                Err(DecodeError::Stream(message)) => Delivery::Failed(message),
                Err(err) => Delivery::Failed(err.to_string()),
            };
            let last = !matches!(delivery, Delivery::Chunk(_));
            if reply.send(delivery).is_err() || last {
                break;
            }
        }
    }
}

/// Chunk source over chunks already in memory
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    chunks: VecDeque<Vec<u8>>,
}

impl VecSource {
    /// Serve `chunks` in order, then end
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
        }
    }
}

impl ChunkSource for VecSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.chunks.pop_front())
    }
}

/// Chunk source for hosts that push chunks through a channel
///
/// The source ends when every sender is dropped.
impl ChunkSource for mpsc::Receiver<Vec<u8>> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.recv().await)
    }
}

/// Chunk source reading from any tokio [`AsyncRead`]
#[derive(Debug)]
pub struct AsyncReadSource<R> {
    reader: R,
    chunk_size: usize,
}

impl<R> AsyncReadSource<R> {
    /// Read chunks of up to [`DEFAULT_CHUNK_SIZE`] bytes
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Read chunks of up to `chunk_size` bytes (at least 1)
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<R: AsyncRead + Unpin + Send + 'static> ChunkSource for AsyncReadSource<R> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = vec![0; self.chunk_size];
        let n = self
            .reader
            .read(&mut chunk)
            .await
            .map_err(|e| DecodeError::Stream(e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        chunk.truncate(n);
        Ok(Some(chunk))
    }
}
