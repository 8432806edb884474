//! RFC 5322 header blocks
//!
//! Parses the header section of a message or MIME part into a [`HeaderMap`]
//! and exposes case-insensitive lookups through the [`HeaderView`] trait.

use std::borrow::Cow;

use crate::error::{DecodeError, Result};

/// Read-only, case-insensitive header lookup
pub trait HeaderView {
    /// First value recorded for `name`, with folding already undone
    fn get(&self, name: &str) -> Option<&str>;
}

/// Header fields in source order
///
/// Lookups return the first field with a matching name, compared
/// ASCII case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: Vec<(String, String)>,
}

impl HeaderMap {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Number of fields, duplicates included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields were recorded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs in source order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl HeaderView for HeaderMap {
    fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a header block and return it together with the body that follows
///
/// The block ends at the first empty line (CRLF or bare LF). Continuation
/// lines (leading space or tab) are joined to the previous field with a
/// single space; field values are trimmed.
///
/// # Errors
///
/// [`DecodeError::Structural`] if the block has no terminating empty line,
/// starts with a continuation line, or contains a line without a colon.
///
/// # Example
///
/// ```
/// use mimetar::headers::{parse_header_block, HeaderView};
///
/// let raw = b"Subject: hello\r\n  world\r\nX-Tag: a\r\n\r\nbody";
/// let (headers, body) = parse_header_block(raw).unwrap();
/// assert_eq!(headers.get("subject"), Some("hello world"));
/// assert_eq!(body, b"body");
/// ```
pub fn parse_header_block(raw: &[u8]) -> Result<(HeaderMap, &[u8])> {
    let mut headers = HeaderMap::new();
    let mut current: Option<(String, String)> = None;
    let mut pos = 0;

    loop {
        let Some(newline) = raw[pos..].iter().position(|&b| b == b'\n') else {
            return Err(DecodeError::Structural(
                "header block is not terminated by an empty line".to_string(),
            ));
        };
        let line = trim_cr(&raw[pos..pos + newline]);
        pos += newline + 1;

        if line.is_empty() {
            break;
        }

        if line[0] == b' ' || line[0] == b'\t' {
            let Some((_, value)) = current.as_mut() else {
                return Err(DecodeError::Structural(
                    "header block starts with a continuation line".to_string(),
                ));
            };
            let continuation = lossy(line);
            let continuation = continuation.trim();
            if !continuation.is_empty() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(continuation);
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.insert(name, value);
        }

        let colon = line.iter().position(|&b| b == b':').ok_or_else(|| {
            DecodeError::Structural(format!("malformed header line {:?}", lossy(line)))
        })?;
        let name = lossy(&line[..colon]).trim().to_string();
        if name.is_empty() {
            return Err(DecodeError::Structural(format!(
                "header line without a field name {:?}",
                lossy(line)
            )));
        }
        let value = lossy(&line[colon + 1..]).trim().to_string();
        current = Some((name, value));
    }

    if let Some((name, value)) = current {
        headers.insert(name, value);
    }

    Ok((headers, &raw[pos..]))
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let (headers, _) = parse_header_block(b"Content-Type: text/plain\r\n\r\n").unwrap();
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_first_duplicate_wins() {
        let (headers, _) = parse_header_block(b"To: a\r\nTo: b\r\n\r\n").unwrap();
        assert_eq!(headers.get("To"), Some("a"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_bare_lf_lines() {
        let (headers, body) = parse_header_block(b"From: x\nSubject: y\n\nhello\n").unwrap();
        assert_eq!(headers.get("from"), Some("x"));
        assert_eq!(headers.get("subject"), Some("y"));
        assert_eq!(body, b"hello\n");
    }

    #[test]
    fn test_folded_value() {
        let raw = b"Subject: first\r\n\tsecond\r\n   third\r\n\r\n";
        let (headers, _) = parse_header_block(raw).unwrap();
        assert_eq!(headers.get("Subject"), Some("first second third"));
    }

    #[test]
    fn test_empty_value() {
        let (headers, _) = parse_header_block(b"Cc:\r\n\r\n").unwrap();
        assert_eq!(headers.get("cc"), Some(""));
    }

    #[test]
    fn test_no_headers() {
        let (headers, body) = parse_header_block(b"\r\nbody").unwrap();
        assert!(headers.is_empty());
        assert_eq!(body, b"body");
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_header_block(b"Subject: x\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::Structural(_)));
    }

    #[test]
    fn test_line_without_colon() {
        let err = parse_header_block(b"Subject x\r\n\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::Structural(_)));
    }

    #[test]
    fn test_leading_continuation() {
        let err = parse_header_block(b" folded\r\n\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::Structural(_)));
    }

    #[test]
    fn test_iter_preserves_order() {
        let (headers, _) = parse_header_block(b"B: 2\r\nA: 1\r\n\r\n").unwrap();
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
