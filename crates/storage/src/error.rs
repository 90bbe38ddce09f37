//! Error types for transport operations.

use thiserror::Error;

use crate::types::ByteRange;

/// Errors that can occur while probing or fetching a remote resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request could not be sent or its body could not be read.
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Request exceeded the configured timeout.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Server answered with a non-success status.
    #[error("{url} returned HTTP {status}{}", describe_range(.range))]
    Status {
        url: String,
        status: u16,
        range: Option<ByteRange>,
    },

    /// Metadata probe response carried no Content-Length.
    #[error("No Content-Length for {url}")]
    MissingLength { url: String },

    /// Content-Length header is not a non-negative integer.
    #[error("Invalid Content-Length {value:?} for {url}")]
    InvalidLength { url: String, value: String },

    /// Invalid configuration.
    #[error("Invalid transport configuration: {message}")]
    InvalidConfig { message: String },
}

impl TransportError {
    /// URL the failed request targeted, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            TransportError::Request { url, .. }
            | TransportError::Timeout { url }
            | TransportError::Status { url, .. }
            | TransportError::MissingLength { url }
            | TransportError::InvalidLength { url, .. } => Some(url),
            TransportError::InvalidConfig { .. } => None,
        }
    }
}

fn describe_range(range: &Option<ByteRange>) -> String {
    range.map(|r| format!(" for bytes {}", r)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err: TransportError = TransportError::Status {
            url: "https://example.org/a".into(),
            status: 416,
            range: Some(ByteRange::new(10, 13)),
        };
        assert_eq!(err.to_string(), "https://example.org/a returned HTTP 416 for bytes 10-13");
        assert_eq!(err.url(), Some("https://example.org/a"));

        let err: TransportError = TransportError::Status {
            url: "https://example.org/a".into(),
            status: 404,
            range: None,
        };
        assert_eq!(err.to_string(), "https://example.org/a returned HTTP 404");
    }
}
