//! Message decoder configuration

/// Headers echoed into decoded output, in output order
pub const DEFAULT_HEADERS: &[&str] = &["From", "To", "Cc", "Subject", "X-Gmail-Labels"];

/// Header whitelist variant that also echoes `Content-Type`
pub const HEADERS_WITH_CONTENT_TYPE: &[&str] = &[
    "From",
    "To",
    "Cc",
    "Subject",
    "Content-Type",
    "X-Gmail-Labels",
];

/// Message decoder configuration
///
/// The header whitelist only controls which headers are rendered into the
/// output. `Content-Type` and `Content-Transfer-Encoding` are always read to
/// walk the body, whether or not they are listed here.
///
/// # Example
///
/// ```
/// use mimetar::DecodeConfig;
///
/// // Default whitelist, unbounded nesting
/// let config = DecodeConfig::default();
/// assert_eq!(config.headers[0], "From");
///
/// // Echo Content-Type too, and refuse absurdly deep trees
/// let config = DecodeConfig::with_content_type().max_depth(32);
/// assert!(config.headers.iter().any(|h| h == "Content-Type"));
/// assert_eq!(config.max_depth, Some(32));
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeConfig {
    /// Header names rendered into the output, in this order
    #[cfg_attr(feature = "serde", serde(default = "default_headers"))]
    pub headers: Vec<String>,

    /// Maximum multipart nesting depth
    ///
    /// `None` accepts any depth. The top-level entity is depth 0.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_depth: Option<usize>,
}

fn default_headers() -> Vec<String> {
    DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect()
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            headers: default_headers(),
            max_depth: None,
        }
    }
}

impl DecodeConfig {
    /// Create a configuration rendering the given headers
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            max_depth: None,
        }
    }

    /// Create a configuration using [`HEADERS_WITH_CONTENT_TYPE`]
    pub fn with_content_type() -> Self {
        Self::new(HEADERS_WITH_CONTENT_TYPE.iter().copied())
    }

    /// Limit multipart nesting to `depth` levels
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}
