//! Shared error types used across claypigeon crates.

use thiserror::Error;

/// Reasons an encoded file name fails to resolve to a URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Name is not valid standard-alphabet base64.
    #[error("Invalid base64 name: {message}")]
    InvalidEncoding {
        /// Decoder error message.
        message: String,
    },

    /// Decoded bytes are not UTF-8.
    #[error("Decoded name is not valid UTF-8")]
    InvalidUtf8,

    /// Reference cannot be parsed or joined to the base URL.
    #[error("Cannot resolve {reference:?}: {message}")]
    InvalidReference {
        /// The decoded reference.
        reference: String,
        /// Parser error message.
        message: String,
    },

    /// Resolved URL uses a scheme other than http or https.
    #[error("Unknown URL scheme {scheme:?} in {url}")]
    UnsupportedScheme {
        /// The resolved URL.
        url: String,
        /// Its scheme.
        scheme: String,
    },

    /// Resolved URL does not start with the configured base URL.
    #[error("URL outside of {base}: {url}")]
    OutsideBase {
        /// The resolved URL.
        url: String,
        /// The configured base.
        base: String,
    },

    /// The configured base URL itself is unusable.
    #[error("Invalid base URL {base:?}: {message}")]
    InvalidBase {
        /// The configured base.
        base: String,
        /// Why it was rejected.
        message: String,
    },
}
