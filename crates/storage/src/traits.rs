//! Transport trait implemented by each backend.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::ByteRange;

/// Low-level ranged read operations against a remote resource.
#[async_trait]
pub trait RangeClient: Send + Sync {
    /// Probe the total length of the resource in bytes.
    ///
    /// Missing or invalid length information and non-success statuses
    /// are errors.
    async fn content_length(&self, url: &str) -> Result<u64, TransportError>;

    /// Fetch an inclusive byte range of the resource.
    ///
    /// Returns the raw response body. Callers verify its length.
    async fn get_range(&self, url: &str, range: ByteRange) -> Result<Vec<u8>, TransportError>;
}
