//! reqwest-based range client implementation.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::{Client, Response, StatusCode};

use claypigeon_storage::{ByteRange, RangeClient, TransportError, TransportSettings};

use crate::error::HttpError;

/// RangeClient implementation over HTTP(S) using reqwest.
///
/// One `HEAD` per probe, one ranged `GET` per block. No retries; every
/// failure is returned to the caller immediately.
#[derive(Debug, Clone)]
pub struct HttpRangeClient {
    /// The underlying HTTP client (connection pool is shared across clones).
    http_client: Client,
}

impl HttpRangeClient {
    /// Create a new client from transport settings.
    ///
    /// # Arguments
    /// * `settings` - Timeouts and User-Agent
    pub fn new(settings: TransportSettings) -> Result<Self, TransportError> {
        let http_client: Client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent)
            .build()
            .map_err(|e| HttpError::ConfigError(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Create a client from an existing reqwest client (for testing).
    ///
    /// # Arguments
    /// * `http_client` - Pre-configured reqwest client
    pub fn from_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

/// Extract the Content-Length header of a probe response.
fn parse_content_length(url: &str, response: &Response) -> Result<u64, TransportError> {
    let value = response
        .headers()
        .get(CONTENT_LENGTH)
        .ok_or_else(|| TransportError::MissingLength {
            url: url.to_string(),
        })?;

    let text: &str = value.to_str().map_err(|_| TransportError::InvalidLength {
        url: url.to_string(),
        value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
    })?;

    text.trim()
        .parse::<u64>()
        .map_err(|_| TransportError::InvalidLength {
            url: url.to_string(),
            value: text.to_string(),
        })
}

#[async_trait]
impl RangeClient for HttpRangeClient {
    async fn content_length(&self, url: &str) -> Result<u64, TransportError> {
        let response: Response = self
            .http_client
            .head(url)
            .send()
            .await
            .map_err(|e| HttpError::reqwest(url, e))?;

        let status: StatusCode = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                range: None,
            });
        }

        let length: u64 = parse_content_length(url, &response)?;
        tracing::debug!(url, length, "probed length");
        Ok(length)
    }

    async fn get_range(&self, url: &str, range: ByteRange) -> Result<Vec<u8>, TransportError> {
        let response: Response = self
            .http_client
            .get(url)
            .header(RANGE, range.header_value())
            .send()
            .await
            .map_err(|e| HttpError::reqwest(url, e))?;

        let status: StatusCode = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                range: Some(range),
            });
        }

        // A 200 is only usable when its body is exactly the requested range.
        let exact: bool = response.content_length() == Some(range.len());
        if status != StatusCode::PARTIAL_CONTENT && !exact {
            tracing::warn!(
                url,
                %range,
                %status,
                body_length = ?response.content_length(),
                "server ignored Range header"
            );
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                range: Some(range),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::reqwest(url, e))?;

        Ok(body.to_vec())
    }
}
