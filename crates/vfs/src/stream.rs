//! Seekable byte stream over one remote URL.
//!
//! Content is fetched in fixed-size, block-aligned ranges and cached for
//! the life of the stream, so each block crosses the network at most once
//! per open file.
//!
//! ```text
//!  offset:   0       S      2S      3S   length
//!            |-------|-------|-------|----|
//!  blocks:   [  0   ][  S   ][  2S  ][3S ]   (last block is short)
//! ```

use std::io::SeekFrom;
use std::sync::Arc;

use claypigeon_storage::{ByteRange, RangeClient};

use crate::block_cache::{BlockCache, BlockCacheStats};
use crate::error::VfsError;

/// Open stream over a remote resource with a private block cache.
pub struct RemoteStream {
    /// Target URL.
    url: String,
    /// Transport used for range fetches.
    client: Arc<dyn RangeClient>,
    /// Total length, probed once at open.
    length: u64,
    /// Cursor used by `seek`/`read`/`tell`.
    offset: u64,
    /// Bytes per range request.
    block_size: u64,
    /// Fetched blocks keyed by start offset.
    cache: BlockCache,
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream")
            .field("url", &self.url)
            .field("length", &self.length)
            .field("offset", &self.offset)
            .field("block_size", &self.block_size)
            .field("cache", &self.cache.stats())
            .finish()
    }
}

impl RemoteStream {
    /// Open a stream, probing the resource length.
    ///
    /// # Arguments
    /// * `client` - Transport
    /// * `url` - Resource URL
    /// * `block_size` - Bytes per range request, non-zero
    ///
    /// # Errors
    /// Returns error if the probe fails or the block size is zero.
    pub async fn open(
        client: Arc<dyn RangeClient>,
        url: impl Into<String>,
        block_size: u64,
    ) -> Result<Self, VfsError> {
        if block_size == 0 {
            return Err(VfsError::InvalidConfig("block size must be non-zero".into()));
        }

        let url: String = url.into();
        let length: u64 = client.content_length(&url).await?;
        tracing::debug!(url = %url, length, "opened remote stream");

        Ok(Self {
            url,
            client,
            length,
            offset: 0,
            block_size,
            cache: BlockCache::new(),
        })
    }

    /// Resource URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Total resource length in bytes.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether the resource is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Current cursor position.
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Block cache statistics.
    pub fn cache_stats(&self) -> BlockCacheStats {
        self.cache.stats()
    }

    /// Move the cursor. Positions past the end are allowed and read as empty.
    ///
    /// # Arguments
    /// * `pos` - Absolute, cursor-relative or end-relative position
    ///
    /// # Errors
    /// Returns error if the resulting position is negative or overflows.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, VfsError> {
        let target: i128 = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(delta) => self.offset as i128 + delta as i128,
            SeekFrom::End(delta) => self.length as i128 + delta as i128,
        };

        self.offset = u64::try_from(target).map_err(|_| VfsError::InvalidSeek {
            url: self.url.clone(),
            position: target,
        })?;
        Ok(self.offset)
    }

    /// Read from the cursor and advance it by the bytes returned.
    ///
    /// # Arguments
    /// * `count` - Bytes wanted; None reads to the end of the resource
    pub async fn read(&mut self, count: Option<u64>) -> Result<Vec<u8>, VfsError> {
        let count: u64 = count.unwrap_or_else(|| self.length.saturating_sub(self.offset));
        let data: Vec<u8> = self.read_at(self.offset, count).await?;
        self.offset += data.len() as u64;
        Ok(data)
    }

    /// Read `count` bytes at `offset` without touching the cursor.
    ///
    /// The result is short only when the range runs past the end of the
    /// resource, and empty when `offset` is at or beyond it.
    ///
    /// # Arguments
    /// * `offset` - Starting byte offset
    /// * `count` - Bytes wanted
    pub async fn read_at(&mut self, offset: u64, count: u64) -> Result<Vec<u8>, VfsError> {
        let end: u64 = offset.saturating_add(count).min(self.length);
        let mut out: Vec<u8> = Vec::with_capacity(end.saturating_sub(offset) as usize);
        let mut pos: u64 = offset;

        while pos < end {
            let block_start: u64 = self.block_size * (pos / self.block_size);
            let block: Arc<Vec<u8>> = self.block(block_start).await?;

            let in_block: u64 = pos - block_start;
            let take: u64 = (end - pos).min(self.block_size - in_block);
            let from: usize = in_block as usize;
            let to: usize = (in_block + take) as usize;

            out.extend_from_slice(&block[from..to]);
            pos += take;
        }

        Ok(out)
    }

    /// Get a block from cache, fetching it on a miss.
    ///
    /// # Arguments
    /// * `block_start` - Block-aligned offset, less than the resource length
    async fn block(&mut self, block_start: u64) -> Result<Arc<Vec<u8>>, VfsError> {
        if let Some(block) = self.cache.get(block_start) {
            return Ok(block);
        }

        let range: ByteRange = ByteRange::new(
            block_start,
            self.length.min(block_start + self.block_size) - 1,
        );
        tracing::info!(url = %self.url, %range, length = self.length, "fetching block");

        let data: Vec<u8> = self.client.get_range(&self.url, range).await?;
        if data.len() as u64 != range.len() {
            return Err(VfsError::BlockLength {
                url: self.url.clone(),
                block_start,
                expected: range.len(),
                actual: data.len() as u64,
            });
        }

        Ok(self.cache.insert(block_start, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claypigeon_storage::{MemoryRangeClient, RequestCounts};

    const URL: &str = "https://example.org/data/report.csv";

    fn client_with(data: &[u8]) -> Arc<MemoryRangeClient> {
        let client: Arc<MemoryRangeClient> = Arc::new(MemoryRangeClient::new());
        client.insert(URL, data.to_vec());
        client
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_open_probes_once() {
        let client: Arc<MemoryRangeClient> = client_with(b"abcdefghij");
        let stream: RemoteStream = RemoteStream::open(client.clone(), URL, 4).await.unwrap();

        assert_eq!(stream.len(), 10);
        assert_eq!(stream.tell(), 0);
        assert_eq!(client.counts(), RequestCounts { probes: 1, fetches: 0 });
    }

    #[tokio::test]
    async fn test_read_all_fetches_each_block_once() {
        let client: Arc<MemoryRangeClient> = client_with(b"abcdefghij");
        let mut stream: RemoteStream = RemoteStream::open(client.clone(), URL, 4).await.unwrap();

        let data: Vec<u8> = stream.read(None).await.unwrap();
        assert_eq!(data, b"abcdefghij");
        assert_eq!(stream.tell(), 10);

        let ranges: Vec<ByteRange> = client.fetched_ranges().into_iter().map(|(_, r)| r).collect();
        assert_eq!(
            ranges,
            vec![ByteRange::new(0, 3), ByteRange::new(4, 7), ByteRange::new(8, 9)]
        );
    }

    #[tokio::test]
    async fn test_cached_block_not_refetched() {
        let client: Arc<MemoryRangeClient> = client_with(b"abcdefghij");
        let mut stream: RemoteStream = RemoteStream::open(client.clone(), URL, 4).await.unwrap();

        assert_eq!(stream.read_at(1, 2).await.unwrap(), b"bc");
        assert_eq!(stream.read_at(0, 4).await.unwrap(), b"abcd");
        assert_eq!(stream.read_at(3, 1).await.unwrap(), b"d");

        assert_eq!(client.counts().fetches, 1);
        assert_eq!(stream.cache_stats().hits, 2);
    }

    #[tokio::test]
    async fn test_ranges_match_direct_slice() {
        const RANGES: [(u64, u64); 7] = [
            (0, 0),
            (0, 1000),
            (99, 101),
            (100, 200),
            (63, 129),
            (998, 1000),
            (500, 999),
        ];

        let data: Vec<u8> = sample(1000);
        let client: Arc<MemoryRangeClient> = client_with(&data);

        for block_size in [1u64, 7, 64, 100, 999, 1000, 4096] {
            let mut stream: RemoteStream =
                RemoteStream::open(client.clone(), URL, block_size).await.unwrap();
            for (a, b) in RANGES {
                let got: Vec<u8> = stream.read_at(a, b - a).await.unwrap();
                let want: &[u8] = &data[a as usize..b as usize];
                assert_eq!(got, want, "block {} range {}..{}", block_size, a, b);
            }
        }
    }

    #[tokio::test]
    async fn test_split_reads_match_single_read() {
        let data: Vec<u8> = sample(64);
        let client: Arc<MemoryRangeClient> = client_with(&data);
        let mut stream: RemoteStream = RemoteStream::open(client, URL, 8).await.unwrap();

        stream.seek(SeekFrom::Start(5)).unwrap();
        let mut out: Vec<u8> = Vec::new();
        for count in [3u64, 8, 1, 16, 13] {
            out.extend(stream.read(Some(count)).await.unwrap());
        }
        assert_eq!(out, &data[5..46]);
        assert_eq!(stream.tell(), 46);
    }

    #[tokio::test]
    async fn test_seek_whence() {
        let client: Arc<MemoryRangeClient> = client_with(b"abcdefghij");
        let mut stream: RemoteStream = RemoteStream::open(client, URL, 4).await.unwrap();

        assert_eq!(stream.seek(SeekFrom::Start(6)).unwrap(), 6);
        assert_eq!(stream.seek(SeekFrom::Current(-2)).unwrap(), 4);
        assert_eq!(stream.seek(SeekFrom::End(-1)).unwrap(), 9);
        assert_eq!(stream.read(None).await.unwrap(), b"j");
        assert_eq!(stream.seek(SeekFrom::End(5)).unwrap(), 15);
        assert!(matches!(
            stream.seek(SeekFrom::Current(-100)),
            Err(VfsError::InvalidSeek { position: -85, .. })
        ));
        assert_eq!(stream.tell(), 15);
    }

    #[tokio::test]
    async fn test_read_past_end_is_empty() {
        let client: Arc<MemoryRangeClient> = client_with(b"abcdefghij");
        let mut stream: RemoteStream = RemoteStream::open(client.clone(), URL, 4).await.unwrap();

        assert!(stream.read_at(10, 5).await.unwrap().is_empty());
        assert!(stream.read_at(50, 5).await.unwrap().is_empty());
        assert_eq!(stream.read_at(8, 100).await.unwrap(), b"ij");

        stream.seek(SeekFrom::Start(20)).unwrap();
        assert!(stream.read(None).await.unwrap().is_empty());
        assert_eq!(client.counts().fetches, 1);
    }

    #[tokio::test]
    async fn test_empty_resource() {
        let client: Arc<MemoryRangeClient> = client_with(b"");
        let mut stream: RemoteStream = RemoteStream::open(client.clone(), URL, 4).await.unwrap();
        assert!(stream.is_empty());
        assert!(stream.read(None).await.unwrap().is_empty());
        assert_eq!(client.counts().fetches, 0);
    }

    #[tokio::test]
    async fn test_short_block_is_error() {
        let client: Arc<MemoryRangeClient> = Arc::new(MemoryRangeClient::new());
        client.insert_with_reported_length(URL, b"abcdef".to_vec(), 10);
        let mut stream: RemoteStream = RemoteStream::open(client, URL, 4).await.unwrap();

        assert_eq!(stream.read_at(0, 4).await.unwrap(), b"abcd");
        assert!(matches!(
            stream.read_at(4, 4).await,
            Err(VfsError::BlockLength { block_start: 4, expected: 4, actual: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_errors() {
        let client: Arc<MemoryRangeClient> = Arc::new(MemoryRangeClient::new());
        assert!(matches!(
            RemoteStream::open(client.clone(), URL, 4).await,
            Err(VfsError::Transport(_))
        ));

        client.insert(URL, b"abcdefghij".to_vec());
        let mut stream: RemoteStream = RemoteStream::open(client.clone(), URL, 4).await.unwrap();
        client.set_offline(true);
        assert!(matches!(stream.read_at(0, 1).await, Err(VfsError::Transport(_))));

        assert!(matches!(
            RemoteStream::open(client, URL, 0).await,
            Err(VfsError::InvalidConfig(_))
        ));
    }
}
