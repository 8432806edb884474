//! Sequential tar reading over a chunk source
//!
//! [`open_archive`] starts one session per archive: a [`ChunkPump`] task
//! feeding a [`ByteStreamAdapter`], and a blocking worker running the `tar`
//! decoder over that adapter. The returned [`ArchiveReader`] forwards each
//! call to the worker and awaits its answer, so the async caller never blocks.
//!
//! ```
//! use mimetar::{open_archive, stream::VecSource};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut builder = tar::Builder::new(Vec::new());
//! let mut header = tar::Header::new_gnu();
//! header.set_size(5);
//! header.set_cksum();
//! builder.append_data(&mut header, "hello.txt", &b"hello"[..]).unwrap();
//! let tarball = builder.into_inner().unwrap();
//!
//! let mut reader = open_archive(VecSource::new(vec![tarball]));
//! let entry = reader.next_entry().await.unwrap().unwrap();
//! assert_eq!(entry.name, "hello.txt");
//! assert_eq!(entry.size, 5);
//! assert_eq!(reader.read_entry_to_end().await.unwrap(), b"hello");
//! assert!(reader.next_entry().await.unwrap().is_none());
//! # });
//! ```
//!
//! [`ChunkPump`]: crate::stream::ChunkPump

use std::error::Error as StdError;
use std::io::{self, Read};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{DecodeError, Result};
use crate::stream::{ByteStreamAdapter, ChunkSource, bridge};

const READ_TO_END_CHUNK: usize = 8 * 1024;

/// Header metadata of one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchiveEntry {
    /// Entry path, with GNU long names and PAX paths resolved
    pub name: String,
    /// Raw type flag byte (`'0'` regular file, `'5'` directory, ...)
    pub type_flag: char,
    /// Content size in bytes
    pub size: u64,
}

impl ArchiveEntry {
    /// Whether this entry is a regular file
    pub fn is_file(&self) -> bool {
        matches!(self.type_flag, '0' | '\0' | '7')
    }

    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.type_flag == '5'
    }
}

enum Command {
    Next(oneshot::Sender<Result<Option<ArchiveEntry>>>),
    Read(usize, oneshot::Sender<Result<Vec<u8>>>),
}

/// Async handle to one archive session
///
/// Dropping the reader ends the session; the worker and pump stop once
/// their current step completes.
#[derive(Debug)]
pub struct ArchiveReader {
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Next(_) => f.write_str("Next"),
            Command::Read(len, _) => write!(f, "Read({len})"),
        }
    }
}

/// Start reading a tar archive from `source`
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn open_archive<S: ChunkSource>(source: S) -> ArchiveReader {
    let (adapter, pump) = bridge(source);
    let (commands, inbox) = mpsc::channel(1);

    tokio::spawn(pump.run());
    tokio::task::spawn_blocking(move || run_session(adapter, inbox));

    ArchiveReader { commands }
}

impl ArchiveReader {
    /// Advance to the next entry
    ///
    /// Unread content of the current entry is skipped. Returns `None` at the
    /// end of the archive.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::ArchiveFormat`] for a malformed header, checksum
    ///   mismatch or truncated archive
    /// - [`DecodeError::Stream`] when the chunk source fails
    /// - [`DecodeError::SessionClosed`] if the worker has stopped
    ///
    /// Errors are terminal: every later call reports the same failure.
    pub async fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Next(reply)).await?;
        response.await.map_err(|_| DecodeError::SessionClosed)?
    }

    /// Read content of the current entry into `buf`
    ///
    /// Returns 0 at the end of the entry, or when no entry is positioned.
    ///
    /// # Errors
    ///
    /// [`DecodeError::ArchiveFormat`] when the stream ends inside the entry,
    /// otherwise as for [`next_entry`](Self::next_entry).
    pub async fn read_content(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let (reply, response) = oneshot::channel();
        self.send(Command::Read(buf.len(), reply)).await?;
        let data = response.await.map_err(|_| DecodeError::SessionClosed)??;

        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    /// Read the rest of the current entry
    pub async fn read_entry_to_end(&mut self) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        let mut buf = vec![0; READ_TO_END_CHUNK];
        loop {
            let n = self.read_content(&mut buf).await?;
            if n == 0 {
                return Ok(content);
            }
            content.extend_from_slice(&buf[..n]);
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DecodeError::SessionClosed)
    }
}

struct OpenEntry<'a> {
    entry: tar::Entry<'a, ByteStreamAdapter>,
    remaining: u64,
}

/// Blocking side of a session: answer commands until the reader is dropped
fn run_session(adapter: ByteStreamAdapter, mut commands: mpsc::Receiver<Command>) {
    let mut archive = tar::Archive::new(adapter);
    let mut failure: Option<DecodeError> = None;

    let mut entries = match archive.entries() {
        Ok(entries) => Some(entries),
        Err(err) => {
            failure = Some(archive_error(err));
            None
        }
    };
    let mut current: Option<OpenEntry<'_>> = None;

    while let Some(command) = commands.blocking_recv() {
        match command {
            Command::Next(reply) => {
                // Dropping the open entry lets tar skip its unread bytes
                current = None;
                let result = if let Some(err) = &failure {
                    Err(replay(err))
                } else if let Some(entries) = entries.as_mut() {
                    match advance(entries) {
                        Ok(Some(open)) => {
                            let entry = describe(&open.entry);
                            debug!(
                                name = %entry.name,
                                type_flag = %entry.type_flag,
                                size = entry.size,
                                "archive entry"
                            );
                            current = Some(open);
                            Ok(Some(entry))
                        }
                        Ok(None) => {
                            debug!("end of archive");
                            Ok(None)
                        }
                        Err(err) => {
                            failure = Some(replay(&err));
                            Err(err)
                        }
                    }
                } else {
                    Ok(None)
                };
                let _ = reply.send(result);
            }
            Command::Read(len, reply) => {
                let result = if let Some(err) = &failure {
                    Err(replay(err))
                } else if let Some(open) = current.as_mut() {
                    read_open_entry(open, len)
                } else {
                    Ok(Vec::new())
                };
                if let Err(err) = &result
                    && failure.is_none()
                {
                    failure = Some(replay(err));
                    current = None;
                }
                let _ = reply.send(result);
            }
        }
    }

    debug!("archive session closed");
}

fn advance<'a>(
    entries: &mut tar::Entries<'a, ByteStreamAdapter>,
) -> Result<Option<OpenEntry<'a>>> {
    match entries.next() {
        None => Ok(None),
        Some(Err(err)) => Err(archive_error(err)),
        Some(Ok(entry)) => {
            let remaining = entry.size();
            Ok(Some(OpenEntry { entry, remaining }))
        }
    }
}

fn describe(entry: &tar::Entry<'_, ByteStreamAdapter>) -> ArchiveEntry {
    ArchiveEntry {
        name: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
        type_flag: entry.header().entry_type().as_byte() as char,
        size: entry.size(),
    }
}

fn read_open_entry(open: &mut OpenEntry<'_>, len: usize) -> Result<Vec<u8>> {
    let want = usize::try_from(open.remaining).map_or(len, |remaining| remaining.min(len));
    let mut data = vec![0; want];
    let mut filled = 0;

    while filled < want {
        let n = open
            .entry
            .read(&mut data[filled..])
            .map_err(archive_error)?;
        if n == 0 {
            return Err(DecodeError::ArchiveFormat(format!(
                "archive truncated with {} bytes of entry content missing",
                open.remaining - filled as u64
            )));
        }
        filled += n;
    }

    open.remaining -= filled as u64;
    Ok(data)
}

/// Classify an error surfacing from the tar decoder
///
/// A chunk source failure travels through `tar` as an `io::Error` wrapping
/// [`DecodeError::Stream`], possibly behind tar's own context error; anything
/// else is a format problem.
fn archive_error(err: io::Error) -> DecodeError {
    let mut messages = Vec::new();
    let mut node: Option<&(dyn StdError + 'static)> = Some(&err);

    while let Some(current) = node {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            match io_err.get_ref() {
                Some(inner) => {
                    node = Some(inner as &(dyn StdError + 'static));
                    continue;
                }
                None => {
                    messages.push(io_err.to_string());
                    break;
                }
            }
        }
        if let Some(DecodeError::Stream(message)) = current.downcast_ref::<DecodeError>() {
            return DecodeError::Stream(message.clone());
        }
        messages.push(current.to_string());
        node = current.source();
    }

    DecodeError::ArchiveFormat(messages.join(": "))
}

fn replay(err: &DecodeError) -> DecodeError {
    match err {
        DecodeError::Stream(message) => DecodeError::Stream(message.clone()),
        DecodeError::ArchiveFormat(message) => DecodeError::ArchiveFormat(message.clone()),
        other => DecodeError::ArchiveFormat(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_error_finds_stream_failure() {
        let inner = io::Error::other(DecodeError::Stream("reset".to_string()));
        assert!(matches!(archive_error(inner), DecodeError::Stream(ref m) if m == "reset"));
    }

    #[test]
    fn test_archive_error_through_context_error() {
        #[derive(Debug)]
        struct Context(io::Error);
        impl std::fmt::Display for Context {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("failed to iterate over archive")
            }
        }
        impl StdError for Context {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let stream = io::Error::other(DecodeError::Stream("gone".to_string()));
        let wrapped = io::Error::other(Context(stream));
        assert!(matches!(archive_error(wrapped), DecodeError::Stream(ref m) if m == "gone"));

        let format = io::Error::other(Context(io::Error::other("checksum mismatch")));
        match archive_error(format) {
            DecodeError::ArchiveFormat(message) => {
                assert_eq!(message, "failed to iterate over archive: checksum mismatch")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_plain_io_error_is_format_error() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "failed to read entire block");
        assert!(matches!(archive_error(err), DecodeError::ArchiveFormat(_)));
    }

    #[test]
    fn test_entry_kinds() {
        let file = ArchiveEntry {
            name: "a".to_string(),
            type_flag: '0',
            size: 1,
        };
        let dir = ArchiveEntry {
            name: "d/".to_string(),
            type_flag: '5',
            size: 0,
        };
        assert!(file.is_file() && !file.is_dir());
        assert!(dir.is_dir() && !dir.is_file());
    }
}
