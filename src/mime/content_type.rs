//! Content-Type header values (RFC 2045, RFC 2231)

use std::collections::HashMap;

use encoding_rs::Encoding;

use crate::encoded_words::hex_pair;
use crate::error::{DecodeError, Result};
use crate::headers::HeaderView;

/// A parsed `Content-Type` value
///
/// The media type and parameter names are lowercased; parameter values are
/// kept as written, with quoting removed and RFC 2231 continuations joined.
///
/// # Example
///
/// ```
/// use mimetar::mime::ContentType;
///
/// let ct = ContentType::parse("Multipart/Mixed; BOUNDARY=\"a b\"").unwrap();
/// assert_eq!(ct.media_type(), "multipart/mixed");
/// assert_eq!(ct.parameter("boundary"), Some("a b"));
/// assert!(ct.is_multipart());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    parameters: HashMap<String, String>,
}

impl ContentType {
    /// Parse a `Content-Type` header value
    ///
    /// # Errors
    ///
    /// [`DecodeError::ContentType`] when the media type is not `type/subtype`,
    /// a parameter is malformed or a parameter name repeats.
    pub fn parse(value: &str) -> Result<Self> {
        let (head, mut rest) = match value.find(';') {
            Some(i) => (&value[..i], &value[i..]),
            None => (value, ""),
        };

        let media_type = head.trim().to_ascii_lowercase();
        if media_type.is_empty() {
            return Err(invalid(value, "no media type"));
        }
        let Some((primary, sub)) = media_type.split_once('/') else {
            return Err(invalid(value, "expected type/subtype"));
        };
        if !is_token(primary) || !is_token(sub) {
            return Err(invalid(value, "media type is not a token pair"));
        }

        let mut raw = Vec::new();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            let Some(after) = rest.strip_prefix(';') else {
                return Err(invalid(value, "expected ';' between parameters"));
            };
            let after = after.trim_start();
            // Trailing or doubled semicolons
            if after.is_empty() || after.starts_with(';') {
                rest = after;
                continue;
            }
            let (name, param_value, remaining) =
                consume_parameter(after).map_err(|reason| invalid(value, reason))?;
            raw.push((name, param_value));
            rest = remaining;
        }

        let parameters = resolve_parameters(raw).map_err(|reason| invalid(value, &reason))?;
        Ok(Self {
            media_type,
            parameters,
        })
    }

    /// Parse the `Content-Type` field of a header block
    ///
    /// # Errors
    ///
    /// [`DecodeError::ContentType`] when the field is absent or malformed.
    pub fn from_headers<H: HeaderView + ?Sized>(headers: &H) -> Result<Self> {
        let value = headers.get("Content-Type").ok_or_else(|| {
            DecodeError::ContentType("missing Content-Type header".to_string())
        })?;
        Self::parse(value)
    }

    /// Lowercased `type/subtype`
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The part before the slash
    pub fn primary_type(&self) -> &str {
        self.media_type
            .split_once('/')
            .map_or(self.media_type.as_str(), |(primary, _)| primary)
    }

    /// The part after the slash
    pub fn sub_type(&self) -> &str {
        self.media_type.split_once('/').map_or("", |(_, sub)| sub)
    }

    /// Parameter value by case-insensitive name
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All parameters, names lowercased
    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// `multipart/*`
    pub fn is_multipart(&self) -> bool {
        self.primary_type() == "multipart"
    }

    /// `text/plain` or `text/html`, the media types that carry a body worth extracting
    pub fn is_text_body(&self) -> bool {
        matches!(self.media_type.as_str(), "text/plain" | "text/html")
    }

    /// The multipart boundary
    ///
    /// # Errors
    ///
    /// [`DecodeError::ContentType`] when the parameter is missing or empty.
    pub fn boundary(&self) -> Result<&str> {
        match self.parameter("boundary") {
            Some(boundary) if !boundary.is_empty() => Ok(boundary),
            _ => Err(DecodeError::ContentType(format!(
                "{} without a boundary parameter",
                self.media_type
            ))),
        }
    }
}

fn invalid(value: &str, reason: &str) -> DecodeError {
    DecodeError::ContentType(format!("{reason} in {value:?}"))
}

/// RFC 2045 token character
fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

/// Split `name=value` off the front of `input`, returning the remainder
fn consume_parameter(input: &str) -> std::result::Result<(String, String, &str), &'static str> {
    let eq = input.find('=').ok_or("parameter without '='")?;
    let name = input[..eq].trim();
    if !is_token(name) {
        return Err("invalid parameter name");
    }

    let rest = input[eq + 1..].trim_start();
    let (value, remaining) = match rest.strip_prefix('"') {
        Some(quoted) => consume_quoted(quoted)?,
        None => {
            // Tspecials such as '=' are allowed so boundaries like ----=_Part_1 parse
            let end = rest
                .find(|c: char| c == ';' || c.is_ascii_whitespace())
                .unwrap_or(rest.len());
            let value = &rest[..end];
            if value.is_empty() {
                return Err("empty parameter value");
            }
            if value.contains('"') {
                return Err("stray quote in parameter value");
            }
            (value.to_string(), &rest[end..])
        }
    };

    Ok((name.to_ascii_lowercase(), value, remaining))
}

/// Read a quoted-string body (opening quote already consumed)
fn consume_quoted(input: &str) -> std::result::Result<(String, &str), &'static str> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            '"' => return Ok((value, &input[i + 1..])),
            _ => value.push(c),
        }
    }

    Err("unterminated quoted string")
}

/// RFC 2231 name forms: `name*`, `name*0`, `name*0*`
fn split_rfc2231(name: &str) -> Option<(&str, Option<u32>, bool)> {
    let (name, extended) = match name.strip_suffix('*') {
        Some(stripped) => (stripped, true),
        None => (name, false),
    };

    if let Some((base, section)) = name.rsplit_once('*')
        && let Ok(index) = section.parse::<u32>()
    {
        return Some((base, Some(index), extended));
    }

    extended.then_some((name, None, true))
}

struct Section {
    index: u32,
    value: String,
    extended: bool,
}

fn resolve_parameters(
    raw: Vec<(String, String)>,
) -> std::result::Result<HashMap<String, String>, String> {
    let mut parameters = HashMap::new();
    let mut continued: HashMap<String, Vec<Section>> = HashMap::new();

    for (name, value) in raw {
        match split_rfc2231(&name) {
            Some((base, None, _)) => {
                let decoded = decode_extended_value(&value)?;
                parameters.insert(base.to_string(), decoded);
            }
            Some((base, Some(index), extended)) => {
                continued.entry(base.to_string()).or_default().push(Section {
                    index,
                    value,
                    extended,
                });
            }
            None => {
                if parameters.contains_key(&name) {
                    return Err(format!("duplicate parameter {name:?}"));
                }
                parameters.insert(name, value);
            }
        }
    }

    for (base, mut sections) in continued {
        sections.sort_by_key(|s| s.index);

        let mut joined = Vec::new();
        let mut charset = None;
        for (expected, section) in sections.iter().enumerate() {
            if section.index as usize != expected {
                return Err(format!("parameter {base:?} has a gap in its continuations"));
            }
            if !section.extended {
                joined.extend_from_slice(section.value.as_bytes());
            } else if expected == 0 {
                let (label, bytes) = split_extended_value(&section.value)?;
                charset = Some(label);
                joined.extend(bytes);
            } else {
                joined.extend(percent_decode(&section.value)?);
            }
        }

        parameters.insert(base, bytes_to_string(&joined, charset.as_deref()));
    }

    Ok(parameters)
}

/// `charset'language'percent-encoded`
fn split_extended_value(value: &str) -> std::result::Result<(String, Vec<u8>), String> {
    let mut parts = value.splitn(3, '\'');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(charset), Some(_language), Some(encoded)) => {
            Ok((charset.to_string(), percent_decode(encoded)?))
        }
        _ => Err(format!("malformed extended parameter value {value:?}")),
    }
}

fn decode_extended_value(value: &str) -> std::result::Result<String, String> {
    let (charset, bytes) = split_extended_value(value)?;
    Ok(bytes_to_string(&bytes, Some(&charset)))
}

fn percent_decode(value: &str) -> std::result::Result<Vec<u8>, String> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(hex_pair)
                .ok_or_else(|| format!("invalid percent escape in {value:?}"))?;
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    Ok(decoded)
}

fn bytes_to_string(bytes: &[u8], charset: Option<&str>) -> String {
    match charset.and_then(|label| Encoding::for_label(label.as_bytes())) {
        Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}
