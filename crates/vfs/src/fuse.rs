//! FUSE adapter for [`RemoteFileFs`].
//!
//! Network-bound operations are spawned onto the tokio runtime and reply
//! from the task, so a slow fetch does not hold up unrelated requests.

#[cfg(feature = "fuse")]
mod impl_fuse {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;
    use std::sync::Arc;

    use fuser::{
        FileAttr, FileType, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyData,
        ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, Request,
    };
    use tokio::runtime::Handle;

    use crate::error::VfsError;
    use crate::fs::{EntryAttributes, EntryKind, RemoteFileFs};

    /// Filesystem name shown in the mount table.
    pub const FS_NAME: &str = "claypigeon";

    /// Block size reported in attributes.
    const ATTR_BLKSIZE: u32 = 512;

    /// Log a failed operation at a level matching its kind and return its errno.
    fn errno(op: &str, err: &VfsError) -> i32 {
        if err.is_io() {
            tracing::error!(op, error = %err, "operation failed");
        } else {
            tracing::debug!(op, error = %err, "operation refused");
        }
        err.errno()
    }

    fn to_file_attr(attr: &EntryAttributes) -> FileAttr {
        let kind: FileType = match attr.kind {
            EntryKind::Directory => FileType::Directory,
            EntryKind::RegularFile => FileType::RegularFile,
        };

        FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.size.div_ceil(512),
            atime: attr.mtime,
            mtime: attr.mtime,
            ctime: attr.mtime,
            crtime: attr.mtime,
            kind,
            perm: attr.perm,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: ATTR_BLKSIZE,
            flags: 0,
        }
    }

    /// `fuser::Filesystem` wrapper around a shared [`RemoteFileFs`].
    pub struct RemoteFuse {
        fs: Arc<RemoteFileFs>,
        runtime: Handle,
    }

    impl RemoteFuse {
        /// Wrap a driver. Must be called inside a tokio runtime.
        ///
        /// # Arguments
        /// * `fs` - Filesystem driver
        pub fn new(fs: Arc<RemoteFileFs>) -> Result<Self, VfsError> {
            let runtime: Handle = Handle::try_current()
                .map_err(|e| VfsError::MountFailed(format!("No tokio runtime: {}", e)))?;
            Ok(Self { fs, runtime })
        }
    }

    impl Filesystem for RemoteFuse {
        fn init(
            &mut self,
            _req: &Request<'_>,
            _config: &mut KernelConfig,
        ) -> Result<(), libc::c_int> {
            tracing::info!(base_url = %self.fs.options().base_url, "mounted");
            Ok(())
        }

        fn destroy(&mut self) {
            let fs: Arc<RemoteFileFs> = self.fs.clone();
            self.runtime.block_on(fs.shutdown());
        }

        fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
            let fs: Arc<RemoteFileFs> = self.fs.clone();
            let name: Vec<u8> = name.as_bytes().to_vec();
            self.runtime.spawn(async move {
                match fs.lookup(parent, &name).await {
                    Ok(attr) => {
                        let ttl = fs.options().kernel_cache.entry_ttl();
                        reply.entry(&ttl, &to_file_attr(&attr), 0)
                    }
                    Err(e) => reply.error(errno("lookup", &e)),
                }
            });
        }

        fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
            let fs: Arc<RemoteFileFs> = self.fs.clone();
            self.runtime.spawn(async move {
                match fs.getattr(ino).await {
                    Ok(attr) => {
                        let ttl = fs.options().kernel_cache.attr_ttl();
                        reply.attr(&ttl, &to_file_attr(&attr))
                    }
                    Err(e) => reply.error(errno("getattr", &e)),
                }
            });
        }

        fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
            let fs: Arc<RemoteFileFs> = self.fs.clone();
            self.runtime.spawn(async move {
                match fs.open(ino, flags).await {
                    Ok(fh) => reply.opened(fh, 0),
                    Err(e) => reply.error(errno("open", &e)),
                }
            });
        }

        fn read(
            &mut self,
            _req: &Request<'_>,
            _ino: u64,
            fh: u64,
            offset: i64,
            size: u32,
            _flags: i32,
            _lock_owner: Option<u64>,
            reply: ReplyData,
        ) {
            let Ok(offset) = u64::try_from(offset) else {
                reply.error(libc::EINVAL);
                return;
            };
            let fs: Arc<RemoteFileFs> = self.fs.clone();
            self.runtime.spawn(async move {
                match fs.read(fh, offset, size).await {
                    Ok(data) => reply.data(&data),
                    Err(e) => reply.error(errno("read", &e)),
                }
            });
        }

        fn release(
            &mut self,
            _req: &Request<'_>,
            _ino: u64,
            fh: u64,
            _flags: i32,
            _lock_owner: Option<u64>,
            _flush: bool,
            reply: ReplyEmpty,
        ) {
            self.fs.release(fh);
            reply.ok();
        }

        fn readdir(
            &mut self,
            _req: &Request<'_>,
            ino: u64,
            _fh: u64,
            offset: i64,
            mut reply: ReplyDirectory,
        ) {
            let entries = match self.fs.readdir(ino) {
                Ok(entries) => entries,
                Err(e) => {
                    reply.error(errno("readdir", &e));
                    return;
                }
            };

            for (i, entry) in entries.iter().enumerate().skip(offset.max(0) as usize) {
                let kind: FileType = match entry.kind {
                    EntryKind::Directory => FileType::Directory,
                    EntryKind::RegularFile => FileType::RegularFile,
                };
                if reply.add(entry.ino, (i + 1) as i64, kind, &entry.name) {
                    break;
                }
            }
            reply.ok();
        }
    }

    fn mount_options() -> Vec<MountOption> {
        vec![
            MountOption::FSName(FS_NAME.into()),
            MountOption::RO,
            MountOption::AutoUnmount,
        ]
    }

    /// Mount the filesystem and block until it is unmounted.
    ///
    /// # Arguments
    /// * `fs` - The driver to mount
    /// * `mountpoint` - Path to mount at
    pub fn mount(fs: Arc<RemoteFileFs>, mountpoint: &Path) -> Result<(), VfsError> {
        let adapter: RemoteFuse = RemoteFuse::new(fs)?;
        fuser::mount2(adapter, mountpoint, &mount_options())
            .map_err(|e| VfsError::MountFailed(e.to_string()))
    }

    /// Mount the filesystem in a background thread.
    ///
    /// # Arguments
    /// * `fs` - The driver to mount
    /// * `mountpoint` - Path to mount at
    ///
    /// # Returns
    /// Background session handle; dropping it unmounts.
    pub fn spawn_mount(
        fs: Arc<RemoteFileFs>,
        mountpoint: &Path,
    ) -> Result<fuser::BackgroundSession, VfsError> {
        let adapter: RemoteFuse = RemoteFuse::new(fs)?;
        fuser::spawn_mount2(adapter, mountpoint, &mount_options())
            .map_err(|e| VfsError::MountFailed(e.to_string()))
    }
}

#[cfg(feature = "fuse")]
pub use impl_fuse::{mount, spawn_mount, RemoteFuse, FS_NAME};
