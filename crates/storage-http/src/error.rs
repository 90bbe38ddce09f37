//! Error types for the HTTP backend.

use claypigeon_storage::TransportError;
use thiserror::Error;

/// Errors specific to the HTTP client.
#[derive(Error, Debug)]
pub enum HttpError {
    /// reqwest error while talking to `url`.
    #[error("HTTP error for {url}: {source}")]
    Reqwest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Client construction failed.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl HttpError {
    /// Wrap a reqwest error with the URL it concerns.
    ///
    /// # Arguments
    /// * `url` - Target URL
    /// * `source` - Underlying error
    pub fn reqwest(url: &str, source: reqwest::Error) -> Self {
        HttpError::Reqwest {
            url: url.to_string(),
            source,
        }
    }
}

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Reqwest { url, source } if source.is_timeout() => {
                TransportError::Timeout { url }
            }
            HttpError::Reqwest { url, source } => TransportError::Request {
                url,
                message: source.to_string(),
            },
            HttpError::ConfigError(message) => TransportError::InvalidConfig { message },
        }
    }
}
