//! Open file handle table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::stream::RemoteStream;

/// Stream shared between the handle table and in-flight reads.
///
/// The async mutex serializes reads on one handle; reads on different
/// handles proceed independently.
pub type SharedStream = Arc<tokio::sync::Mutex<RemoteStream>>;

/// An open file: its inode and private stream.
#[derive(Debug, Clone)]
pub struct OpenFile {
    /// Inode the handle was opened on.
    pub ino: u64,
    /// Stream owned by this handle.
    pub stream: SharedStream,
}

/// Allocates handle ids and owns the stream behind each one.
#[derive(Debug)]
pub struct HandleTable {
    open: Mutex<HashMap<u64, OpenFile>>,
    next_handle: AtomicU64,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            open: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Register a stream and return its new handle id.
    ///
    /// # Arguments
    /// * `ino` - Inode being opened
    /// * `stream` - Stream for this handle
    pub fn insert(&self, ino: u64, stream: RemoteStream) -> u64 {
        let fh: u64 = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let file: OpenFile = OpenFile {
            ino,
            stream: Arc::new(tokio::sync::Mutex::new(stream)),
        };
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fh, file);
        fh
    }

    /// Get an open file by handle.
    pub fn get(&self, fh: u64) -> Option<OpenFile> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&fh)
            .cloned()
    }

    /// Remove a handle. Returns None if it was not open.
    ///
    /// A read still holding the stream finishes; the stream and its cache
    /// are freed when that read drops its reference.
    pub fn remove(&self, fh: u64) -> Option<OpenFile> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fh)
    }

    /// Remove every handle, returning how many were open.
    pub fn clear(&self) -> usize {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        let count: usize = open.len();
        open.clear();
        count
    }

    /// Number of open handles.
    pub fn len(&self) -> usize {
        self.open.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no handle is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
