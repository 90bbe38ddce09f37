//! Shared constants used across claypigeon crates.

/// Inode number of the single root directory.
pub const ROOT_INODE: u64 = 1;

/// First inode number handed out to a resolved URL.
pub const FIRST_FILE_INODE: u64 = ROOT_INODE + 1;

/// Default block size for ranged fetches (256KB).
pub const DEFAULT_BLOCK_SIZE: u64 = 256 * 1024;

/// Permission bits reported for every remote file.
pub const FILE_PERMISSIONS: u16 = 0o644;

/// Permission bits reported for the root directory.
pub const DIR_PERMISSIONS: u16 = 0o755;

/// Fixed timestamp (nanoseconds since the epoch) reported for every inode.
/// Remote resources carry no trustworthy mtime, so all of them share one.
pub const STATIC_TIMESTAMP_NANOS: u64 = 1_438_467_123_985_654_000;

/// URL schemes a resolved name may use.
pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];
