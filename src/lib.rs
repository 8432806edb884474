#![doc = include_str!("../README.md")]

/// Streaming tar reading over async chunk sources
pub mod archive;
mod config;
/// RFC 2047 encoded words in header values
pub mod encoded_words;
mod error;
/// RFC 5322 header blocks
pub mod headers;
/// Whole-message decoding and header extraction
pub mod message;
/// MIME body extraction (RFC 2045, RFC 2046)
pub mod mime;
/// Async chunk source to blocking reader bridge
pub mod stream;

pub use archive::{ArchiveEntry, ArchiveReader, open_archive};
pub use config::{DEFAULT_HEADERS, DecodeConfig, HEADERS_WITH_CONTENT_TYPE};
pub use encoded_words::{decode_encoded_word, decode_header_value};
pub use error::{DecodeError, Result};
pub use headers::{HeaderMap, HeaderView, parse_header_block};
pub use message::{DecodedMessage, MessageDecoder, decode_message, extract_headers};
pub use mime::{ContentType, MimeWalker, Section, TransferEncoding};
pub use stream::{
    AsyncReadSource, ByteStreamAdapter, ChunkPump, ChunkSource, Delivery, VecSource, bridge,
};
