//! MIME body extraction
//!
//! Reference: https://datatracker.ietf.org/doc/html/rfc2045,
//! https://datatracker.ietf.org/doc/html/rfc2046
//!
//! This module is organized into:
//! - `content_type`: Content-Type parsing, including RFC 2231 parameters
//! - `transfer`: Content-Transfer-Encoding decoders
//! - `multipart`: boundary framing of multipart bodies
//! - `walker`: recursive descent that assembles the readable text

mod content_type;
mod multipart;
mod transfer;
mod walker;

pub use self::content_type::ContentType;
pub use self::multipart::{MultipartReader, Part};
pub use self::transfer::{QuotedPrintableReader, TransferEncoding, decode_base64_body};
pub use self::walker::{MimeWalker, Section};
