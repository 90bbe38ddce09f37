//! FUSE-based virtual filesystem over remote HTTP(S) resources.
//!
//! This crate provides a read-only filesystem whose files are remote URLs.
//! A file name is the base64 encoding of a URL (or of a reference relative
//! to a configured base URL). Content is fetched on demand with HTTP range
//! requests in fixed-size blocks and cached per open file.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: FUSE Interface (fuser::Filesystem impl, `fuse` feature)
//! Layer 2: VFS Operations (RemoteFileFs: getattr, lookup, open, read, release)
//! Layer 1: Primitives (InodeTable, HandleTable, RemoteStream, BlockCache)
//! ```

pub mod block_cache;
pub mod error;
pub mod fs;
pub mod fuse;
pub mod handles;
pub mod inode;
pub mod options;
pub mod session;
pub mod stream;

pub use block_cache::{BlockCache, BlockCacheStats};
pub use error::VfsError;
pub use fs::{DirEntry, EntryAttributes, EntryKind, RemoteFileFs};
#[cfg(feature = "fuse")]
pub use fuse::{mount, spawn_mount, RemoteFuse, FS_NAME};
pub use handles::{HandleTable, OpenFile, SharedStream};
pub use inode::{InodeEntry, InodeTable};
pub use options::{KernelCacheOptions, LengthCachePolicy, TimeoutOptions, VfsOptions};
pub use session::{OpGuard, Session, SessionState};
pub use stream::RemoteStream;
