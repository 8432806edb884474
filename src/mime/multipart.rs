//! Multipart body framing (RFC 2046 section 5.1)

use crate::error::{DecodeError, Result};
use crate::headers::{HeaderMap, parse_header_block};

/// One body part of a multipart entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<'a> {
    /// The part's own header fields
    pub headers: HeaderMap,
    /// Content between the header block and the next delimiter
    pub body: &'a [u8],
}

/// Sequential reader over the parts of a multipart body
///
/// Parts are borrowed from the parent body and yielded in document order.
/// The preamble and epilogue are skipped. Reading stops at the close
/// delimiter; a reader that is dropped early simply leaves the rest unread.
///
/// # Example
///
/// ```
/// use mimetar::headers::HeaderView;
/// use mimetar::mime::MultipartReader;
///
/// let body = b"preamble\r\n--b\r\nContent-Type: text/plain\r\n\r\nhi\r\n--b--\r\n";
/// let mut parts = MultipartReader::new(body, "b");
/// let part = parts.next_part().unwrap().unwrap();
/// assert_eq!(part.headers.get("content-type"), Some("text/plain"));
/// assert_eq!(part.body, b"hi");
/// assert!(parts.next_part().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct MultipartReader<'a> {
    body: &'a [u8],
    dash_boundary: Vec<u8>,
    pos: usize,
    state: ReaderState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Preamble,
    InParts,
    Finished,
}

struct Delimiter {
    /// End of the content preceding the delimiter line
    content_end: usize,
    /// Start of the line after the delimiter
    next: usize,
    is_final: bool,
}

impl<'a> MultipartReader<'a> {
    /// Create a reader for `body` split on `boundary`
    pub fn new(body: &'a [u8], boundary: &str) -> Self {
        let mut dash_boundary = Vec::with_capacity(boundary.len() + 2);
        dash_boundary.extend_from_slice(b"--");
        dash_boundary.extend_from_slice(boundary.as_bytes());
        Self {
            body,
            dash_boundary,
            pos: 0,
            state: ReaderState::Preamble,
        }
    }

    /// The next part, or `None` after the close delimiter
    ///
    /// # Errors
    ///
    /// [`DecodeError::Structural`] when the body has no delimiter at all, ends
    /// before the close delimiter, or a part's header block is malformed.
    pub fn next_part(&mut self) -> Result<Option<Part<'a>>> {
        match self.state {
            ReaderState::Finished => return Ok(None),
            ReaderState::Preamble => {
                let delimiter = self.find_delimiter(0).ok_or_else(|| {
                    DecodeError::Structural("multipart body has no boundary delimiter".to_string())
                })?;
                self.pos = delimiter.next;
                if delimiter.is_final {
                    self.state = ReaderState::Finished;
                    return Ok(None);
                }
                self.state = ReaderState::InParts;
            }
            ReaderState::InParts => {}
        }

        let (headers, rest) = parse_header_block(&self.body[self.pos..])?;
        let content_start = self.body.len() - rest.len();

        let delimiter = self.find_delimiter(content_start).ok_or_else(|| {
            DecodeError::Structural("multipart body ended before the close delimiter".to_string())
        })?;

        let part = Part {
            headers,
            body: &self.body[content_start..delimiter.content_end],
        };
        self.pos = delimiter.next;
        if delimiter.is_final {
            self.state = ReaderState::Finished;
        }
        Ok(Some(part))
    }

    /// Scan lines from `from` for the next delimiter line
    fn find_delimiter(&self, from: usize) -> Option<Delimiter> {
        let mut line_start = from;

        while line_start < self.body.len() {
            let (line_end, next) = match self.body[line_start..].iter().position(|&b| b == b'\n') {
                Some(i) => (line_start + i, line_start + i + 1),
                None => (self.body.len(), self.body.len()),
            };

            if let Some(is_final) = self.match_delimiter(&self.body[line_start..line_end]) {
                // The line break before a delimiter belongs to the delimiter
                let mut content_end = line_start;
                if content_end > from && self.body[content_end - 1] == b'\n' {
                    content_end -= 1;
                    if content_end > from && self.body[content_end - 1] == b'\r' {
                        content_end -= 1;
                    }
                }
                return Some(Delimiter {
                    content_end,
                    next,
                    is_final,
                });
            }

            line_start = next;
        }

        None
    }

    /// `Some(false)` for a delimiter line, `Some(true)` for the close delimiter
    fn match_delimiter(&self, line: &[u8]) -> Option<bool> {
        let rest = line.strip_prefix(self.dash_boundary.as_slice())?;
        let (rest, is_final) = match rest.strip_prefix(b"--") {
            Some(after) => (after, true),
            None => (rest, false),
        };
        // Transport padding
        rest.iter()
            .all(|&b| matches!(b, b' ' | b'\t' | b'\r'))
            .then_some(is_final)
    }
}
