//! Content-Transfer-Encoding decoding (RFC 2045 section 6)

use std::io::{self, BufRead, Read};

use base64::Engine;

use crate::encoded_words::{BASE64, hex_pair};
use crate::error::{DecodeError, Result};
use crate::headers::HeaderView;

/// Transfer encodings a text part may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// `7bit`, `8bit`, `binary`, or no header at all
    Identity,
    /// `base64`
    Base64,
    /// `quoted-printable`
    QuotedPrintable,
}

impl TransferEncoding {
    /// Interpret a `Content-Transfer-Encoding` value (case-insensitive)
    ///
    /// # Errors
    ///
    /// [`DecodeError::Encoding`] for any other mechanism.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "7bit" | "8bit" | "binary" => Ok(Self::Identity),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            other => Err(DecodeError::Encoding(format!(
                "unsupported transfer encoding {other:?}"
            ))),
        }
    }

    /// Read the encoding declared by a header block, defaulting to identity
    pub fn from_headers<H: HeaderView + ?Sized>(headers: &H) -> Result<Self> {
        headers
            .get("Content-Transfer-Encoding")
            .map_or(Ok(Self::Identity), Self::parse)
    }

    /// Decode `body` and append the result to `out`
    ///
    /// Nothing is appended when decoding fails.
    pub fn decode_into(self, body: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Identity => out.extend_from_slice(body),
            Self::Base64 => out.extend(decode_base64_body(body)?),
            Self::QuotedPrintable => {
                io::copy(&mut QuotedPrintableReader::new(body), out)?;
            }
        }
        Ok(())
    }
}

/// Decode a base64 body, ignoring line breaks
pub fn decode_base64_body(body: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|&b| b != b'\r' && b != b'\n')
        .collect();
    BASE64
        .decode(compact)
        .map_err(|e| DecodeError::Encoding(format!("invalid base64 body: {e}")))
}

/// Streaming quoted-printable decoder
///
/// Decodes one input line at a time: trailing whitespace is dropped, a final
/// `=` marks a soft line break, `=XX` becomes the byte `XX`, and hard line
/// breaks are passed through as written. An `=` that is not followed by two
/// hex digits is kept literally.
///
/// ```
/// use std::io::Read;
/// use mimetar::mime::QuotedPrintableReader;
///
/// let mut reader = QuotedPrintableReader::new(&b"caf=C3=A9 =\r\nnoir  \r\n"[..]);
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "café noir\r\n");
/// ```
#[derive(Debug)]
pub struct QuotedPrintableReader<R> {
    inner: R,
    raw: Vec<u8>,
    line: Vec<u8>,
    pos: usize,
}

impl<R: BufRead> QuotedPrintableReader<R> {
    /// Wrap a buffered reader of encoded text
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            raw: Vec::new(),
            line: Vec::new(),
            pos: 0,
        }
    }

    /// Decode the next input line; false at end of input
    fn fill_line(&mut self) -> io::Result<bool> {
        self.raw.clear();
        if self.inner.read_until(b'\n', &mut self.raw)? == 0 {
            return Ok(false);
        }
        self.line.clear();
        self.pos = 0;
        decode_line(&self.raw, &mut self.line);
        Ok(true)
    }
}

impl<R: BufRead> Read for QuotedPrintableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.line.len() {
            if !self.fill_line()? {
                return Ok(0);
            }
        }
        let available = &self.line[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

fn decode_line(raw: &[u8], out: &mut Vec<u8>) {
    let (content, eol): (&[u8], &[u8]) = if let Some(c) = raw.strip_suffix(b"\r\n") {
        (c, b"\r\n")
    } else if let Some(c) = raw.strip_suffix(b"\n") {
        (c, b"\n")
    } else {
        (raw, b"")
    };

    let trimmed_len = content
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map_or(0, |i| i + 1);
    let content = &content[..trimmed_len];

    let (content, soft_break) = match content.strip_suffix(b"=") {
        Some(c) => (c, true),
        None => (content, false),
    };

    let mut i = 0;
    while i < content.len() {
        if content[i] == b'='
            && let Some(byte) = content.get(i + 1..i + 3).and_then(hex_pair)
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(content[i]);
        i += 1;
    }

    if !soft_break {
        out.extend_from_slice(eol);
    }
}
