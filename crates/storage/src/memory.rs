//! In-memory transport backend.
//!
//! Serves resources from a map and records every request, so tests can
//! assert exactly which probes and range fetches were issued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::traits::RangeClient;
use crate::types::ByteRange;

/// A stored resource and the length its metadata probe reports.
#[derive(Debug, Clone)]
struct MemoryResource {
    data: Vec<u8>,
    reported_length: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of requests issued against a [`MemoryRangeClient`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCounts {
    /// Number of metadata probes.
    pub probes: usize,
    /// Number of ranged fetches.
    pub fetches: usize,
}

/// Range client backed by an in-memory map of URL to bytes.
///
/// Mirrors HTTP semantics where it matters: unknown URLs answer 404, a
/// range starting past the end answers 416, and a range running past the
/// end is truncated.
#[derive(Debug, Default)]
pub struct MemoryRangeClient {
    resources: RwLock<HashMap<String, MemoryResource>>,
    probes: Mutex<Vec<String>>,
    fetches: Mutex<Vec<(String, ByteRange)>>,
    offline: AtomicBool,
}

impl MemoryRangeClient {
    /// Create an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    ///
    /// # Arguments
    /// * `url` - URL the resource is served under
    /// * `data` - Resource bytes
    pub fn insert(&self, url: impl Into<String>, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        let reported_length: u64 = data.len() as u64;
        self.insert_with_reported_length(url, data, reported_length);
    }

    /// Add a resource whose probe reports a length different from its data.
    ///
    /// Simulates a resource that changed size between probe and fetch.
    ///
    /// # Arguments
    /// * `url` - URL the resource is served under
    /// * `data` - Bytes served by range fetches
    /// * `reported_length` - Length returned by the metadata probe
    pub fn insert_with_reported_length(
        &self,
        url: impl Into<String>,
        data: impl Into<Vec<u8>>,
        reported_length: u64,
    ) {
        let resource: MemoryResource = MemoryResource {
            data: data.into(),
            reported_length,
        };
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), resource);
    }

    /// Make every subsequent request fail with a transport error.
    ///
    /// # Arguments
    /// * `offline` - Whether requests should fail
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of probes and fetches issued so far.
    pub fn counts(&self) -> RequestCounts {
        RequestCounts {
            probes: lock(&self.probes).len(),
            fetches: lock(&self.fetches).len(),
        }
    }

    /// Every ranged fetch issued so far, in order.
    pub fn fetched_ranges(&self) -> Vec<(String, ByteRange)> {
        lock(&self.fetches).clone()
    }

    /// Forget all recorded requests.
    pub fn reset_counts(&self) {
        lock(&self.probes).clear();
        lock(&self.fetches).clear();
    }

    fn check_online(&self, url: &str) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Request {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RangeClient for MemoryRangeClient {
    async fn content_length(&self, url: &str) -> Result<u64, TransportError> {
        lock(&self.probes).push(url.to_string());
        self.check_online(url)?;

        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .map(|r| r.reported_length)
            .ok_or_else(|| TransportError::Status {
                url: url.to_string(),
                status: 404,
                range: None,
            })
    }

    async fn get_range(&self, url: &str, range: ByteRange) -> Result<Vec<u8>, TransportError> {
        lock(&self.fetches).push((url.to_string(), range));
        self.check_online(url)?;

        let resources = self.resources.read().unwrap_or_else(PoisonError::into_inner);
        let resource: &MemoryResource = resources.get(url).ok_or_else(|| TransportError::Status {
            url: url.to_string(),
            status: 404,
            range: Some(range),
        })?;

        let len: u64 = resource.data.len() as u64;
        if range.start >= len {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: 416,
                range: Some(range),
            });
        }

        let end: u64 = range.end.min(len - 1);
        Ok(resource.data[range.start as usize..=end as usize].to_vec())
    }
}
