//! Inode table mapping inode numbers to resolved URLs.
//!
//! Inodes are allocated sequentially starting after the root. The first
//! lookup of a URL allocates the next number; later lookups of the same URL
//! return it. Entries are never removed, so numbers are stable for the life
//! of the session.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use claypigeon_common::{FIRST_FILE_INODE, ROOT_INODE};

/// A regular file backed by one remote URL.
#[derive(Debug)]
pub struct InodeEntry {
    id: u64,
    url: String,
    /// First probed length, kept when the length cache trusts it.
    length: OnceLock<u64>,
}

impl InodeEntry {
    /// Inode number.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Canonical URL of the file.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Previously recorded length, if any.
    pub fn cached_length(&self) -> Option<u64> {
        self.length.get().copied()
    }

    /// Record a probed length. The first recorded value wins.
    ///
    /// # Arguments
    /// * `length` - Probed resource length
    pub fn record_length(&self, length: u64) {
        let _ = self.length.set(length);
    }
}

#[derive(Debug)]
struct InodeTableInner {
    by_id: HashMap<u64, Arc<InodeEntry>>,
    by_url: HashMap<String, u64>,
    next_id: u64,
}

/// Bidirectional inode number <-> URL table.
///
/// Allocation happens under a single write lock, so concurrent lookups of
/// the same URL always agree on one inode.
#[derive(Debug)]
pub struct InodeTable {
    inner: RwLock<InodeTableInner>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// Create an empty table holding only the root.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(InodeTableInner {
                by_id: HashMap::new(),
                by_url: HashMap::new(),
                next_id: FIRST_FILE_INODE,
            }),
        }
    }

    /// Return the inode for `url`, allocating one if the URL is new.
    ///
    /// # Arguments
    /// * `url` - Canonical resolved URL
    pub fn resolve_or_allocate(&self, url: &str) -> Arc<InodeEntry> {
        if let Some(entry) = self.get_by_url(url) {
            return entry;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have allocated between the read and write lock.
        if let Some(id) = inner.by_url.get(url) {
            if let Some(entry) = inner.by_id.get(id) {
                return entry.clone();
            }
        }

        let id: u64 = inner.next_id;
        inner.next_id += 1;

        let entry: Arc<InodeEntry> = Arc::new(InodeEntry {
            id,
            url: url.to_string(),
            length: OnceLock::new(),
        });
        inner.by_id.insert(id, entry.clone());
        inner.by_url.insert(url.to_string(), id);

        tracing::debug!(ino = id, url, "allocated inode");
        entry
    }

    /// Get the entry for an inode. The root has no entry.
    ///
    /// # Arguments
    /// * `id` - Inode number
    pub fn get(&self, id: u64) -> Option<Arc<InodeEntry>> {
        if id == ROOT_INODE {
            return None;
        }
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_id.get(&id).cloned()
    }

    /// URL of an inode, if it was ever issued.
    ///
    /// # Arguments
    /// * `id` - Inode number
    pub fn lookup(&self, id: u64) -> Option<String> {
        self.get(id).map(|e| e.url().to_string())
    }

    /// Get the entry for a URL without allocating.
    ///
    /// # Arguments
    /// * `url` - Canonical resolved URL
    pub fn get_by_url(&self, url: &str) -> Option<Arc<InodeEntry>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let id: &u64 = inner.by_url.get(url)?;
        inner.by_id.get(id).cloned()
    }

    /// Number of file inodes issued.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }

    /// Whether no file inode has been issued yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_allocation() {
        let table: InodeTable = InodeTable::new();
        let a: Arc<InodeEntry> = table.resolve_or_allocate("https://example.org/a");
        let b: Arc<InodeEntry> = table.resolve_or_allocate("https://example.org/b");

        assert_eq!(a.id(), FIRST_FILE_INODE);
        assert_eq!(b.id(), FIRST_FILE_INODE + 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let table: InodeTable = InodeTable::new();
        let first: u64 = table.resolve_or_allocate("https://example.org/a").id();
        let second: u64 = table.resolve_or_allocate("https://example.org/a").id();
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_lookup() {
        let table: InodeTable = InodeTable::new();
        let id: u64 = table.resolve_or_allocate("https://example.org/a").id();

        assert_eq!(table.lookup(id).as_deref(), Some("https://example.org/a"));
        assert_eq!(table.lookup(ROOT_INODE), None);
        assert_eq!(table.lookup(999), None);
        assert!(table.get_by_url("https://example.org/zzz").is_none());
    }

    #[test]
    fn test_length_first_probe_wins() {
        let table: InodeTable = InodeTable::new();
        let entry: Arc<InodeEntry> = table.resolve_or_allocate("https://example.org/a");
        assert_eq!(entry.cached_length(), None);

        entry.record_length(10);
        entry.record_length(20);
        assert_eq!(entry.cached_length(), Some(10));
    }

    #[test]
    fn test_concurrent_allocation() {
        let table: Arc<InodeTable> = Arc::new(InodeTable::new());
        let threads: Vec<std::thread::JoinHandle<u64>> = (0..16)
            .map(|_| {
                let t: Arc<InodeTable> = table.clone();
                std::thread::spawn(move || t.resolve_or_allocate("https://example.org/race").id())
            })
            .collect();

        let ids: Vec<u64> = threads.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|&id| id == ids[0]));
        assert_eq!(table.len(), 1);
    }
}
