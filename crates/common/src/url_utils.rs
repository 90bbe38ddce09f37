//! Resolution of encoded file names into canonical remote URLs.
//!
//! File names presented to the filesystem are base64 (standard alphabet)
//! encodings of either an absolute URL or a reference relative to a
//! configured base URL. Resolution decodes the name, joins it against the
//! base and enforces the scheme and containment policy.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::constants::ALLOWED_SCHEMES;
use crate::error::ResolveError;

/// Decode a base64 file name into the reference string it carries.
///
/// # Arguments
/// * `name` - Raw file name bytes as received from the kernel
///
/// # Errors
/// Returns error if the name is not valid base64 or does not decode to UTF-8.
pub fn decode_name(name: &[u8]) -> Result<String, ResolveError> {
    let bytes: Vec<u8> = STANDARD
        .decode(name)
        .map_err(|e| ResolveError::InvalidEncoding {
            message: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|_| ResolveError::InvalidUtf8)
}

/// Encode a URL or relative reference as a file name.
///
/// # Arguments
/// * `reference` - Absolute URL or reference relative to the base URL
pub fn encode_name(reference: &str) -> String {
    STANDARD.encode(reference.as_bytes())
}

/// Lexical containment test of a resolved URL against a base URL.
///
/// This is a plain string-prefix check: `https://example.org/data` also
/// admits `https://example.org/data-private/x`.
///
/// # Arguments
/// * `url` - Resolved URL
/// * `base` - Configured base URL (empty admits everything)
pub fn is_within_base(url: &str, base: &str) -> bool {
    base.is_empty() || url.starts_with(base)
}

/// Resolves encoded names against an optional base URL.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    /// Parsed base URL, None when no containment is configured.
    base: Option<Url>,
}

impl UrlResolver {
    /// Create a resolver for the given base URL.
    ///
    /// # Arguments
    /// * `base` - Base URL; an empty string disables containment
    ///
    /// # Errors
    /// Returns error if a non-empty base is not an absolute http(s) URL.
    pub fn new(base: &str) -> Result<Self, ResolveError> {
        let base: &str = base.trim();
        if base.is_empty() {
            return Ok(Self { base: None });
        }

        let parsed: Url = Url::parse(base).map_err(|e| ResolveError::InvalidBase {
            base: base.to_string(),
            message: e.to_string(),
        })?;

        if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
            return Err(ResolveError::InvalidBase {
                base: base.to_string(),
                message: format!("scheme {:?} is not http or https", parsed.scheme()),
            });
        }

        Ok(Self { base: Some(parsed) })
    }

    /// Canonical form of the base URL, or an empty string.
    pub fn base(&self) -> &str {
        self.base.as_ref().map(Url::as_str).unwrap_or("")
    }

    /// Resolve an encoded file name into a canonical URL.
    ///
    /// # Arguments
    /// * `name` - Raw file name bytes
    ///
    /// # Returns
    /// The canonical URL string, also used as the inode table key.
    pub fn resolve(&self, name: &[u8]) -> Result<String, ResolveError> {
        let reference: String = decode_name(name)?;
        self.resolve_reference(&reference)
    }

    /// Resolve an already-decoded reference into a canonical URL.
    ///
    /// # Arguments
    /// * `reference` - Absolute URL or reference relative to the base
    pub fn resolve_reference(&self, reference: &str) -> Result<String, ResolveError> {
        let joined: Result<Url, url::ParseError> = match &self.base {
            Some(base) => base.join(reference),
            None => Url::parse(reference),
        };
        let url: Url = joined.map_err(|e| ResolveError::InvalidReference {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(reference, url = url.as_str(), "resolved name");

        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return Err(ResolveError::UnsupportedScheme {
                url: url.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        if !is_within_base(url.as_str(), self.base()) {
            return Err(ResolveError::OutsideBase {
                url: url.to_string(),
                base: self.base().to_string(),
            });
        }

        Ok(url.into())
    }
}

// ============================================================================
// Tests
// ============================================================================
