//! Per-stream cache of fetched blocks.
//!
//! Blocks are keyed by their block-aligned start offset and kept for the
//! life of the owning stream. There is no eviction: a stream holds at most
//! the bytes of the resource it reads.

use std::collections::HashMap;
use std::sync::Arc;

/// Cache of fetched blocks, keyed by block start offset.
#[derive(Debug, Default)]
pub struct BlockCache {
    /// Block data (Arc so callers can read it while the cache is borrowed).
    blocks: HashMap<u64, Arc<Vec<u8>>>,
    /// Total bytes held.
    cached_bytes: u64,
    /// Blocks inserted after a network fetch.
    fetch_count: u64,
    /// Lookups satisfied without a fetch.
    hit_count: u64,
}

impl BlockCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a block, counting a hit when present.
    ///
    /// # Arguments
    /// * `block_start` - Block-aligned offset
    pub fn get(&mut self, block_start: u64) -> Option<Arc<Vec<u8>>> {
        let block: Arc<Vec<u8>> = self.blocks.get(&block_start)?.clone();
        self.hit_count += 1;
        Some(block)
    }

    /// Whether a block is cached. Does not count as a hit.
    pub fn contains(&self, block_start: u64) -> bool {
        self.blocks.contains_key(&block_start)
    }

    /// Store a freshly fetched block.
    ///
    /// # Arguments
    /// * `block_start` - Block-aligned offset
    /// * `data` - Block bytes
    pub fn insert(&mut self, block_start: u64, data: Vec<u8>) -> Arc<Vec<u8>> {
        let block: Arc<Vec<u8>> = Arc::new(data);
        self.cached_bytes += block.len() as u64;
        if let Some(old) = self.blocks.insert(block_start, block.clone()) {
            self.cached_bytes -= old.len() as u64;
        }
        self.fetch_count += 1;
        block
    }

    /// Drop every cached block. Counters are kept.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.cached_bytes = 0;
    }

    /// Current cache statistics.
    pub fn stats(&self) -> BlockCacheStats {
        BlockCacheStats {
            cached_blocks: self.blocks.len(),
            cached_bytes: self.cached_bytes,
            fetches: self.fetch_count,
            hits: self.hit_count,
        }
    }
}

/// Statistics about a block cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCacheStats {
    /// Number of blocks held.
    pub cached_blocks: usize,
    /// Total bytes held.
    pub cached_bytes: u64,
    /// Blocks fetched from the network.
    pub fetches: u64,
    /// Block lookups served from cache.
    pub hits: u64,
}

impl BlockCacheStats {
    /// Cache hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total: u64 = self.hits + self.fetches;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
