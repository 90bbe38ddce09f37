//! Error types for the VFS crate.

use std::fmt;

use claypigeon_common::ResolveError;
use claypigeon_storage::TransportError;

/// Errors that can occur during VFS operations.
#[derive(Debug)]
pub enum VfsError {
    /// Inode not found (never issued, or the root where a file is required).
    InodeNotFound(u64),

    /// File handle not open.
    HandleNotFound(u64),

    /// Not a directory.
    NotADirectory(u64),

    /// File name did not resolve to a permitted URL.
    NameResolution { name: String, source: ResolveError },

    /// Open requested write access on a read-only filesystem.
    PermissionDenied { ino: u64, flags: i32 },

    /// Metadata probe or range fetch failed.
    Transport(TransportError),

    /// A fetched block does not have the length its range implies.
    BlockLength {
        url: String,
        block_start: u64,
        expected: u64,
        actual: u64,
    },

    /// Seek to a position that cannot be represented.
    InvalidSeek { url: String, position: i128 },

    /// Invalid configuration.
    InvalidConfig(String),

    /// Session no longer accepts requests.
    Unmounting,

    /// Unexpected failure inside a single operation.
    Internal(String),

    /// Mount operation failed.
    MountFailed(String),
}

impl VfsError {
    /// Errno reported to the kernel for this error.
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::InodeNotFound(_)
            | VfsError::HandleNotFound(_)
            | VfsError::NameResolution { .. } => libc::ENOENT,
            VfsError::NotADirectory(_) => libc::ENOTDIR,
            VfsError::PermissionDenied { .. } => libc::EPERM,
            VfsError::InvalidConfig(_) => libc::EINVAL,
            VfsError::Unmounting => libc::ESHUTDOWN,
            VfsError::Transport(_)
            | VfsError::BlockLength { .. }
            | VfsError::InvalidSeek { .. }
            | VfsError::Internal(_)
            | VfsError::MountFailed(_) => libc::EIO,
        }
    }

    /// Whether this error surfaces as a generic I/O error.
    pub fn is_io(&self) -> bool {
        self.errno() == libc::EIO
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::InodeNotFound(id) => write!(f, "Inode not found: {}", id),
            VfsError::HandleNotFound(fh) => write!(f, "File handle not open: {}", fh),
            VfsError::NotADirectory(id) => write!(f, "Not a directory: {}", id),
            VfsError::NameResolution { name, source } => {
                write!(f, "Cannot resolve name {:?}: {}", name, source)
            }
            VfsError::PermissionDenied { ino, flags } => {
                write!(f, "Write access denied for inode {} (flags {:#o})", ino, flags)
            }
            VfsError::Transport(e) => write!(f, "Transport error: {}", e),
            VfsError::BlockLength {
                url,
                block_start,
                expected,
                actual,
            } => write!(
                f,
                "Block at {} of {}: expected {} bytes, got {}",
                block_start, url, expected, actual
            ),
            VfsError::InvalidSeek { url, position } => {
                write!(f, "Invalid seek position {} in {}", position, url)
            }
            VfsError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            VfsError::Unmounting => write!(f, "Filesystem is unmounting"),
            VfsError::Internal(msg) => write!(f, "Internal error: {}", msg),
            VfsError::MountFailed(msg) => write!(f, "Mount failed: {}", msg),
        }
    }
}

impl std::error::Error for VfsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VfsError::NameResolution { source, .. } => Some(source),
            VfsError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for VfsError {
    fn from(err: TransportError) -> Self {
        VfsError::Transport(err)
    }
}
