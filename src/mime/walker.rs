//! Recursive body extraction over a MIME tree

use tracing::trace;

use super::content_type::ContentType;
use super::multipart::MultipartReader;
use super::transfer::TransferEncoding;
use crate::error::{DecodeError, Result};
use crate::headers::HeaderView;

/// What one MIME entity contributes to the extracted body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// `text/plain` or `text/html`, decoded with its transfer encoding
    Text(TransferEncoding),
    /// `multipart/alternative`: the first text child wins
    Alternative {
        /// Delimiter between children
        boundary: String,
    },
    /// Any other `multipart/*`: every child, in document order
    Multipart {
        /// Delimiter between children
        boundary: String,
    },
    /// Anything else contributes nothing
    Skip,
}

impl Section {
    /// Classify an entity from its parsed Content-Type
    ///
    /// # Errors
    ///
    /// Fails for a text entity with an unsupported transfer encoding, or a
    /// multipart entity without a boundary.
    pub fn from_content_type<H: HeaderView + ?Sized>(
        content_type: &ContentType,
        headers: &H,
    ) -> Result<Self> {
        if content_type.is_text_body() {
            return Ok(Self::Text(TransferEncoding::from_headers(headers)?));
        }
        if !content_type.is_multipart() {
            return Ok(Self::Skip);
        }

        let boundary = content_type.boundary()?.to_string();
        if content_type.sub_type() == "alternative" {
            Ok(Self::Alternative { boundary })
        } else {
            Ok(Self::Multipart { boundary })
        }
    }

    /// Classify an entity from its header block
    pub fn classify<H: HeaderView + ?Sized>(headers: &H) -> Result<Self> {
        let content_type = ContentType::from_headers(headers)?;
        Self::from_content_type(&content_type, headers)
    }
}

/// Extracts the readable text of a MIME tree into one byte buffer
///
/// Text leaves are decoded and appended as-is, with no charset conversion
/// and no separators between parts. See [`Section`] for how each kind of
/// entity is treated.
///
/// # Example
///
/// ```
/// use mimetar::headers::parse_header_block;
/// use mimetar::mime::MimeWalker;
///
/// let raw = b"Content-Type: multipart/alternative; boundary=b\r\n\r\n\
/// --b\r\nContent-Type: text/html\r\n\r\n<p>hi</p>\r\n\
/// --b\r\nContent-Type: text/plain\r\n\r\nhi\r\n--b--\r\n";
/// let (headers, body) = parse_header_block(raw).unwrap();
///
/// let mut out = Vec::new();
/// MimeWalker::new().walk(&headers, body, &mut out).unwrap();
/// assert_eq!(out, b"<p>hi</p>");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeWalker {
    max_depth: Option<usize>,
}

impl MimeWalker {
    /// Walker with no nesting limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Walker that fails with [`DecodeError::TooDeep`] past `max_depth` levels
    pub fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self { max_depth }
    }

    /// Append the decoded body of the entity described by `headers` to `out`
    ///
    /// On error `out` may hold a partial result; callers that must not
    /// surface partial output should discard it.
    pub fn walk<H: HeaderView + ?Sized>(
        &self,
        headers: &H,
        body: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let section = Section::classify(headers)?;
        self.decode_section(section, body, out, 0)
    }

    fn decode_section(
        &self,
        section: Section,
        body: &[u8],
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<()> {
        if let Some(max) = self.max_depth
            && depth > max
        {
            return Err(DecodeError::TooDeep(max));
        }

        match section {
            Section::Text(encoding) => encoding.decode_into(body, out),
            Section::Alternative { boundary } => {
                let mut parts = MultipartReader::new(body, &boundary);
                while let Some(part) = parts.next_part()? {
                    let content_type = ContentType::from_headers(&part.headers)?;
                    if content_type.is_text_body() {
                        let child = Section::from_content_type(&content_type, &part.headers)?;
                        return self.decode_section(child, part.body, out, depth + 1);
                    }
                    trace!(
                        media_type = content_type.media_type(),
                        "alternative branch passed over"
                    );
                }
                trace!("alternative without a text branch");
                Ok(())
            }
            Section::Multipart { boundary } => {
                let mut parts = MultipartReader::new(body, &boundary);
                while let Some(part) = parts.next_part()? {
                    let child = Section::classify(&part.headers)?;
                    self.decode_section(child, part.body, out, depth + 1)?;
                }
                Ok(())
            }
            Section::Skip => Ok(()),
        }
    }
}
