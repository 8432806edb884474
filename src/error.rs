//! Decode error types

use thiserror::Error;

/// Message decoding and archive reading errors
#[derive(Error, Debug)]
pub enum DecodeError {
    /// IO error from an underlying reader
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Message framing is broken (opening line, header block, multipart delimiters)
    #[error("Malformed message: {0}")]
    Structural(String),

    /// Bad encoded word, bad body payload, or unsupported transfer encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Missing or malformed media type, parameters, or boundary
    #[error("Content-Type error: {0}")]
    ContentType(String),

    /// Malformed tar header, checksum mismatch, or truncated archive
    #[error("Archive format error: {0}")]
    ArchiveFormat(String),

    /// The chunk source failed or went away
    #[error("Stream error: {0}")]
    Stream(String),

    /// The archive worker is no longer running
    #[error("Archive session closed")]
    SessionClosed,

    /// MIME nesting exceeded the configured limit
    #[error("MIME nesting deeper than {0} levels")]
    TooDeep(usize),
}

/// Result type alias using DecodeError
pub type Result<T> = std::result::Result<T, DecodeError>;
