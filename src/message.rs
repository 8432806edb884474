//! Whole-message decoding
//!
//! A raw message is an opening line (an mbox `From ` line, for instance)
//! followed by CRLF and an RFC 5322 message. Decoding renders the opening
//! line, a whitelist of RFC 2047-decoded headers, a blank line and the
//! extracted body text.

use tracing::debug;

use crate::config::DecodeConfig;
use crate::encoded_words::decode_header_value;
use crate::error::{DecodeError, Result};
use crate::headers::{HeaderView, parse_header_block};
use crate::mime::MimeWalker;

/// The canonical plain form of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Opening line, verbatim and without its CRLF
    pub opening_line: Vec<u8>,
    /// Whitelisted headers with non-empty decoded values, in whitelist order
    pub headers: Vec<(String, String)>,
    /// Extracted body bytes, not transcoded
    pub body: Vec<u8>,
}

impl DecodedMessage {
    /// Render as opening line, `Name: value` lines, blank line, body
    pub fn to_bytes(&self) -> Vec<u8> {
        let header_len: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.len() + value.len() + 4)
            .sum();
        let mut out =
            Vec::with_capacity(self.opening_line.len() + header_len + self.body.len() + 4);

        out.extend_from_slice(&self.opening_line);
        out.extend_from_slice(b"\r\n");
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// Decode the whitelisted headers of a header block
///
/// Absent headers and headers that decode to an empty string are left out.
/// Output names use the whitelist's spelling.
///
/// # Errors
///
/// Fails if any present header holds an undecodable encoded word.
///
/// # Example
///
/// ```
/// use mimetar::headers::HeaderMap;
/// use mimetar::message::extract_headers;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("subject", "=?UTF-8?Q?Hi?=");
/// headers.insert("From", "a@example.com");
///
/// let names = ["From".to_string(), "To".to_string(), "Subject".to_string()];
/// let decoded = extract_headers(&headers, &names).unwrap();
/// assert_eq!(
///     decoded,
///     vec![
///         ("From".to_string(), "a@example.com".to_string()),
///         ("Subject".to_string(), "Hi".to_string()),
///     ]
/// );
/// ```
pub fn extract_headers<H: HeaderView + ?Sized>(
    headers: &H,
    names: &[String],
) -> Result<Vec<(String, String)>> {
    let mut decoded = Vec::with_capacity(names.len());
    for name in names {
        let Some(raw) = headers.get(name) else {
            continue;
        };
        let value = decode_header_value(raw)?;
        if !value.is_empty() {
            decoded.push((name.clone(), value));
        }
    }
    Ok(decoded)
}

/// Decodes raw messages according to a [`DecodeConfig`]
#[derive(Debug, Clone, Default)]
pub struct MessageDecoder {
    config: DecodeConfig,
}

impl MessageDecoder {
    /// Create a decoder with the given configuration
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode one raw message
    ///
    /// # Errors
    ///
    /// Any structural, encoding or content-type problem anywhere in the
    /// message fails the whole call; no partial result is returned.
    pub fn decode(&self, raw: &[u8]) -> Result<DecodedMessage> {
        let (opening_line, rest) = split_opening_line(raw)?;
        let (headers, body) = parse_header_block(rest)?;

        let rendered = extract_headers(&headers, &self.config.headers)?;

        let mut decoded_body = Vec::with_capacity(body.len());
        MimeWalker::with_max_depth(self.config.max_depth).walk(&headers, body, &mut decoded_body)?;

        debug!(
            headers = rendered.len(),
            body_bytes = decoded_body.len(),
            "message decoded"
        );

        Ok(DecodedMessage {
            opening_line: opening_line.to_vec(),
            headers: rendered,
            body: decoded_body,
        })
    }
}

/// Decode one raw message with the default configuration and render it
///
/// # Example
///
/// ```
/// let raw = b"From x\r\nSubject: =?UTF-8?Q?Hi?=\r\nContent-Type: text/plain\r\n\r\nHello";
/// let text = mimetar::decode_message(raw).unwrap();
/// assert_eq!(text, b"From x\r\nSubject: Hi\r\n\r\nHello");
/// ```
pub fn decode_message(raw: &[u8]) -> Result<Vec<u8>> {
    MessageDecoder::default()
        .decode(raw)
        .map(|message| message.to_bytes())
}

fn split_opening_line(raw: &[u8]) -> Result<(&[u8], &[u8])> {
    let end = raw
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or_else(|| DecodeError::Structural("no CRLF after the opening line".to_string()))?;
    Ok((&raw[..end], &raw[end + 2..]))
}
