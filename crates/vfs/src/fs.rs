//! Remote file filesystem driver.
//!
//! Implements the filesystem operation set (getattr, lookup, open, read,
//! release, readdir) over the inode table, the name resolver and
//! [`RemoteStream`]. Independent of FUSE: the `fuse` module adapts these
//! operations to `fuser`, and tests drive them directly.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use claypigeon_common::{
    UrlResolver, DIR_PERMISSIONS, FILE_PERMISSIONS, ROOT_INODE, STATIC_TIMESTAMP_NANOS,
};
use claypigeon_storage::RangeClient;
use futures::FutureExt;

use crate::error::VfsError;
use crate::handles::{HandleTable, OpenFile};
use crate::inode::{InodeEntry, InodeTable};
use crate::options::{LengthCachePolicy, VfsOptions};
use crate::session::{Session, SessionState};
use crate::stream::RemoteStream;

/// Run one operation, turning a panic into [`VfsError::Internal`].
///
/// The operation future is dropped before returning, so its session guard
/// and any handle lock are released and later requests proceed.
async fn contain_panic<T, F>(op: &'static str, fut: F) -> Result<T, VfsError>
where
    F: Future<Output = Result<T, VfsError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message: String = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(op, panic = %message, "operation panicked");
            Err(VfsError::Internal(format!("{} panicked: {}", op, message)))
        }
    }
}

/// Kind of filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The root directory.
    Directory,
    /// A remote resource.
    RegularFile,
}

/// Synthesized attributes of an inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAttributes {
    pub ino: u64,
    pub kind: EntryKind,
    pub size: u64,
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    /// Shared by atime, mtime and ctime.
    pub mtime: SystemTime,
}

/// One entry returned by readdir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub kind: EntryKind,
    pub name: String,
}

/// Read-only filesystem exposing remote HTTP resources as files.
///
/// All operations take `&self`; the driver can be shared across tasks
/// behind an `Arc`.
pub struct RemoteFileFs {
    /// Name resolver built from the base URL.
    resolver: UrlResolver,
    /// Transport for probes and range fetches.
    client: Arc<dyn RangeClient>,
    /// Options for VFS behavior.
    options: VfsOptions,
    /// Inode number <-> URL table.
    inodes: InodeTable,
    /// Open handles and their streams.
    handles: HandleTable,
    /// Lifecycle and in-flight tracking.
    session: Session,
    /// Owner reported for every inode.
    uid: u32,
    gid: u32,
}

impl RemoteFileFs {
    /// Create a new filesystem driver.
    ///
    /// # Arguments
    /// * `client` - Transport for remote reads
    /// * `options` - VFS options
    ///
    /// # Errors
    /// Returns error if the options are invalid.
    pub fn new(client: Arc<dyn RangeClient>, options: VfsOptions) -> Result<Self, VfsError> {
        let resolver: UrlResolver = options.validate()?;
        // SAFETY: getuid/getgid have no preconditions and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };

        Ok(Self {
            resolver,
            client,
            options,
            inodes: InodeTable::new(),
            handles: HandleTable::new(),
            session: Session::new(),
            uid,
            gid,
        })
    }

    /// Options this driver was built with.
    pub fn options(&self) -> &VfsOptions {
        &self.options
    }

    /// Inode table.
    pub fn inodes(&self) -> &InodeTable {
        &self.inodes
    }

    /// Number of open file handles.
    pub fn open_handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Get attributes of an inode.
    ///
    /// # Arguments
    /// * `ino` - Inode number
    pub async fn getattr(&self, ino: u64) -> Result<EntryAttributes, VfsError> {
        contain_panic("getattr", self.attributes(ino)).await
    }

    async fn attributes(&self, ino: u64) -> Result<EntryAttributes, VfsError> {
        let _guard = self.session.begin()?;
        tracing::debug!(ino, "getattr");

        if ino == ROOT_INODE {
            return Ok(self.root_attributes());
        }

        let entry: Arc<InodeEntry> = self.inodes.get(ino).ok_or(VfsError::InodeNotFound(ino))?;
        self.file_attributes(&entry).await
    }

    /// Resolve an encoded name in the root directory.
    ///
    /// # Arguments
    /// * `parent` - Parent inode, must be the root
    /// * `name` - Base64-encoded URL or relative reference
    pub async fn lookup(&self, parent: u64, name: &[u8]) -> Result<EntryAttributes, VfsError> {
        contain_panic("lookup", self.lookup_name(parent, name)).await
    }

    async fn lookup_name(&self, parent: u64, name: &[u8]) -> Result<EntryAttributes, VfsError> {
        let _guard = self.session.begin()?;
        tracing::debug!(parent, name = %String::from_utf8_lossy(name), "lookup");

        if parent != ROOT_INODE {
            return Err(VfsError::InodeNotFound(parent));
        }

        let url: String = self.resolver.resolve(name).map_err(|source| {
            tracing::warn!(name = %String::from_utf8_lossy(name), error = %source, "rejected name");
            VfsError::NameResolution {
                name: String::from_utf8_lossy(name).into_owned(),
                source,
            }
        })?;

        let entry: Arc<InodeEntry> = self.inodes.resolve_or_allocate(&url);
        self.file_attributes(&entry).await
    }

    /// Open a file for reading.
    ///
    /// # Arguments
    /// * `ino` - Inode number
    /// * `flags` - open(2) flags; any write access is refused
    ///
    /// # Returns
    /// Handle id for subsequent reads.
    pub async fn open(&self, ino: u64, flags: i32) -> Result<u64, VfsError> {
        contain_panic("open", self.open_stream(ino, flags)).await
    }

    async fn open_stream(&self, ino: u64, flags: i32) -> Result<u64, VfsError> {
        let _guard = self.session.begin()?;
        tracing::debug!(ino, flags, "open");

        let entry: Arc<InodeEntry> = self.inodes.get(ino).ok_or(VfsError::InodeNotFound(ino))?;

        let access: i32 = flags & libc::O_ACCMODE;
        if access == libc::O_WRONLY || access == libc::O_RDWR {
            return Err(VfsError::PermissionDenied { ino, flags });
        }

        let stream: RemoteStream =
            RemoteStream::open(self.client.clone(), entry.url(), self.options.block_size)
                .await
                .inspect_err(|e| {
                    tracing::error!(ino, url = entry.url(), error = %e, "open failed")
                })?;
        entry.record_length(stream.len());

        let fh: u64 = self.handles.insert(ino, stream);
        tracing::debug!(ino, fh, "opened");
        Ok(fh)
    }

    /// Read from an open handle.
    ///
    /// # Arguments
    /// * `fh` - Handle from `open`
    /// * `offset` - Byte offset
    /// * `size` - Bytes wanted
    ///
    /// # Returns
    /// The bytes read; short only at end of file.
    pub async fn read(&self, fh: u64, offset: u64, size: u32) -> Result<Vec<u8>, VfsError> {
        contain_panic("read", self.read_handle(fh, offset, size)).await
    }

    async fn read_handle(&self, fh: u64, offset: u64, size: u32) -> Result<Vec<u8>, VfsError> {
        let _guard = self.session.begin()?;
        tracing::debug!(fh, offset, size, "read");

        let file: OpenFile = self.handles.get(fh).ok_or(VfsError::HandleNotFound(fh))?;
        let mut stream = file.stream.lock().await;

        stream.read_at(offset, u64::from(size)).await.inspect_err(|e| {
            tracing::error!(
                fh,
                ino = file.ino,
                url = stream.url(),
                offset,
                size,
                error = %e,
                "read failed"
            )
        })
    }

    /// Release a handle, dropping its stream and cache.
    ///
    /// Releasing an unknown or already-released handle does nothing.
    /// Accepted while unmounting so the kernel can drain open files.
    ///
    /// # Arguments
    /// * `fh` - Handle from `open`
    pub fn release(&self, fh: u64) {
        match self.handles.remove(fh) {
            Some(file) => tracing::debug!(fh, ino = file.ino, "released"),
            None => tracing::debug!(fh, "release of unknown handle"),
        }
    }

    /// List a directory. Only the root is a directory, and it lists nothing
    /// but `.` and `..`: files exist only once looked up by name.
    ///
    /// # Arguments
    /// * `ino` - Directory inode
    pub fn readdir(&self, ino: u64) -> Result<Vec<DirEntry>, VfsError> {
        let _guard = self.session.begin()?;
        tracing::debug!(ino, "readdir");

        if ino != ROOT_INODE {
            return match self.inodes.get(ino) {
                Some(_) => Err(VfsError::NotADirectory(ino)),
                None => Err(VfsError::InodeNotFound(ino)),
            };
        }

        Ok([".", ".."]
            .into_iter()
            .map(|name| DirEntry {
                ino: ROOT_INODE,
                kind: EntryKind::Directory,
                name: name.to_string(),
            })
            .collect())
    }

    /// Stop accepting requests, wait for outstanding ones, and drop every
    /// open stream.
    pub async fn shutdown(&self) {
        if self.session.begin_unmount() {
            tracing::info!(in_flight = self.session.in_flight(), "unmounting");
        }
        self.session.wait_drained().await;
        let dropped: usize = self.handles.clear();
        self.session.mark_closed();
        tracing::info!(dropped_handles = dropped, inodes = self.inodes.len(), "closed");
    }

    fn static_time() -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(STATIC_TIMESTAMP_NANOS)
    }

    fn root_attributes(&self) -> EntryAttributes {
        EntryAttributes {
            ino: ROOT_INODE,
            kind: EntryKind::Directory,
            size: 0,
            perm: DIR_PERMISSIONS,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            mtime: Self::static_time(),
        }
    }

    async fn file_attributes(&self, entry: &InodeEntry) -> Result<EntryAttributes, VfsError> {
        let size: u64 = self.file_length(entry).await?;
        Ok(EntryAttributes {
            ino: entry.id(),
            kind: EntryKind::RegularFile,
            size,
            perm: FILE_PERMISSIONS,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            mtime: Self::static_time(),
        })
    }

    async fn file_length(&self, entry: &InodeEntry) -> Result<u64, VfsError> {
        if self.options.length_cache == LengthCachePolicy::TrustFirstProbe {
            if let Some(length) = entry.cached_length() {
                return Ok(length);
            }
        }

        let length: u64 = self
            .client
            .content_length(entry.url())
            .await
            .inspect_err(|e| {
                tracing::error!(
                    ino = entry.id(),
                    url = entry.url(),
                    error = %e,
                    "length probe failed"
                )
            })?;
        entry.record_length(length);
        Ok(length)
    }
}
