//! RFC 2047 Encoded Words Support
//!
//! Decodes RFC 2047 encoded words, which carry non-ASCII text in email
//! headers.
//!
//! Encoded words have the format: `=?charset?encoding?encoded-text?=`
//!
//! ## Supported Encodings
//! - `B` - Base64 (RFC 2045)
//! - `Q` - Quoted-Printable variant (RFC 2047)
//!
//! ## Charsets
//!
//! Charset names are resolved as WHATWG encoding labels, so `UTF-8`,
//! `ISO-8859-1`, `Windows-1252`, `KOI8-R`, `Shift_JIS` and friends all work.
//! An RFC 2231 language suffix (`UTF-8*en`) is ignored.
//!
//! ## Strictness
//!
//! Decoding is all-or-nothing. A delimited encoded word with an unknown
//! encoding letter, an undecodable payload or an unknown charset is an error.
//! A stray `=?` that never forms a complete word is ordinary text.
//!
//! ```
//! use mimetar::encoded_words::decode_header_value;
//!
//! let subject = decode_header_value("=?UTF-8?B?SGVsbG8gV29ybGQ=?=").unwrap();
//! assert_eq!(subject, "Hello World");
//!
//! let name = decode_header_value("=?ISO-8859-1?Q?Andr=E9?=").unwrap();
//! assert_eq!(name, "André");
//!
//! // Whitespace between adjacent encoded words is dropped
//! let text = decode_header_value("=?UTF-8?B?SGVsbG8=?= =?UTF-8?B?V29ybGQ=?=").unwrap();
//! assert_eq!(text, "HelloWorld");
//!
//! // Unknown charsets are rejected
//! assert!(decode_header_value("=?X-NOPE?Q?hi?=").is_err());
//! ```

use crate::error::{DecodeError, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::Encoding;

/// Standard-alphabet base64 that tolerates non-zero bits in the final symbol
///
/// Shared by B-encoded words and base64 bodies. Invalid symbols and bad
/// padding are still rejected.
pub(crate) const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decodes a single, complete RFC 2047 encoded word.
///
/// # Errors
///
/// Returns [`DecodeError::Encoding`] if `encoded` is not of the form
/// `=?charset?B|Q?text?=`, if the payload does not decode, or if the charset
/// is unknown.
///
/// # Examples
///
/// ```
/// use mimetar::encoded_words::decode_encoded_word;
///
/// assert_eq!(decode_encoded_word("=?UTF-8?B?SGVsbG8=?=").unwrap(), "Hello");
/// assert_eq!(decode_encoded_word("=?ISO-8859-1?Q?Caf=E9?=").unwrap(), "Café");
/// assert!(decode_encoded_word("=?UTF-8?X?test?=").is_err());
/// ```
pub fn decode_encoded_word(encoded: &str) -> Result<String> {
    let inner = encoded
        .strip_prefix("=?")
        .and_then(|s| s.strip_suffix("?="))
        .ok_or_else(|| malformed(encoded))?;

    let mut parts = inner.splitn(3, '?');
    let (Some(charset), Some(encoding), Some(text)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed(encoded));
    };
    if charset.is_empty() {
        return Err(malformed(encoded));
    }

    let decoded = match encoding {
        "B" | "b" => decode_base64(text)?,
        "Q" | "q" => decode_q(text)?,
        other => {
            return Err(DecodeError::Encoding(format!(
                "unsupported encoded-word encoding {other:?} in {encoded:?}"
            )));
        }
    };

    charset_to_string(&decoded, charset)
}

/// Decodes a header value that may contain any number of encoded words.
///
/// # Behavior
/// - Whitespace between two adjacent encoded words is removed
/// - Text around encoded words is kept as-is
/// - Values without `=?` are returned unchanged
///
/// # Errors
///
/// Fails on the first encoded word that [`decode_encoded_word`] rejects.
///
/// # Examples
///
/// ```
/// use mimetar::encoded_words::decode_header_value;
///
/// let text = decode_header_value("Re: =?UTF-8?B?SGVsbG8=?= World").unwrap();
/// assert_eq!(text, "Re: Hello World");
///
/// let from = decode_header_value("=?UTF-8?Q?Mar=C3=ADa_Garc=C3=ADa?= <maria@example.com>").unwrap();
/// assert_eq!(from, "María García <maria@example.com>");
///
/// let plain = decode_header_value("=?not finished").unwrap();
/// assert_eq!(plain, "=?not finished");
/// ```
pub fn decode_header_value(value: &str) -> Result<String> {
    if !value.contains("=?") {
        return Ok(value.to_string());
    }

    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    let mut last_was_encoded = false;

    while let Some(start) = rest.find("=?") {
        let candidate = &rest[start..];
        let Some(end) = find_encoded_word_end(candidate) else {
            // Not a delimited word, keep the "=?" and scan on
            result.push_str(&rest[..start + 2]);
            rest = &rest[start + 2..];
            last_was_encoded = false;
            continue;
        };

        let between = &rest[..start];
        let only_whitespace = between.chars().all(|c| c.is_ascii_whitespace());
        if !(last_was_encoded && only_whitespace) {
            result.push_str(between);
        }

        result.push_str(&decode_encoded_word(&candidate[..end])?);
        rest = &candidate[end..];
        last_was_encoded = true;
    }

    result.push_str(rest);
    Ok(result)
}

/// Finds the end position of an encoded word starting at the beginning of the input.
///
/// Returns the byte index after the closing `?=`, or None if no complete word is found.
fn find_encoded_word_end(input: &str) -> Option<usize> {
    if !input.starts_with("=?") {
        return None;
    }

    let bytes = input.as_bytes();
    let mut question_count = 0;

    for i in 2..bytes.len() {
        match bytes[i] {
            b'?' => {
                question_count += 1;
                // charset?encoding?text?= needs at least 3 question marks
                if question_count >= 3 && bytes.get(i + 1) == Some(&b'=') {
                    return Some(i + 2);
                }
            }
            // Whitespace not allowed inside encoded word
            b' ' | b'\t' | b'\r' | b'\n' => return None,
            _ => {}
        }
    }

    None
}

fn malformed(encoded: &str) -> DecodeError {
    DecodeError::Encoding(format!("malformed encoded word {encoded:?}"))
}

/// Decodes Base64 encoded text (B encoding).
fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| DecodeError::Encoding(format!("invalid B-encoded word: {e}")))
}

/// Decodes Q encoded text.
///
/// Underscores represent spaces and `=XX` is a hex-escaped byte.
fn decode_q(encoded: &str) -> Result<Vec<u8>> {
    let bytes = encoded.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .and_then(hex_pair)
                    .ok_or_else(|| {
                        DecodeError::Encoding(format!("invalid Q escape in {encoded:?}"))
                    })?;
                result.push(byte);
                i += 3;
            }
            other => {
                result.push(other);
                i += 1;
            }
        }
    }

    Ok(result)
}

pub(crate) fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = (pair[0] as char).to_digit(16)?;
    let lo = (pair[1] as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Converts bytes to a String using the named charset.
fn charset_to_string(bytes: &[u8], charset: &str) -> Result<String> {
    // RFC 2231: charset*language
    let label = charset.split('*').next().unwrap_or(charset);
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| DecodeError::Encoding(format!("unsupported charset {charset:?}")))?;

    let (text, _) = encoding.decode_without_bom_handling(bytes);
    Ok(text.into_owned())
}
