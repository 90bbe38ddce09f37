//! Configuration options for the VFS.
//!
//! This module provides configuration for name resolution, block size,
//! kernel caching, network timeouts and length caching.

use std::time::Duration;

use claypigeon_common::{UrlResolver, DEFAULT_BLOCK_SIZE};
use claypigeon_storage::TransportSettings;

use crate::error::VfsError;

/// Configuration options for the VFS.
///
/// # Example
///
/// ```ignore
/// let options = VfsOptions::default()
///     .with_base_url("https://example.org/data/")
///     .with_block_size(64 * 1024);
///
/// let fs = RemoteFileFs::new(client, options)?;
/// ```
#[derive(Debug, Clone)]
pub struct VfsOptions {
    /// Base URL names are resolved against. Empty means any http(s) URL.
    pub base_url: String,
    /// Block size in bytes for range requests.
    pub block_size: u64,
    /// Kernel cache settings.
    pub kernel_cache: KernelCacheOptions,
    /// Timeout settings.
    pub timeouts: TimeoutOptions,
    /// How probed lengths are reused by getattr.
    pub length_cache: LengthCachePolicy,
}

impl Default for VfsOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            kernel_cache: KernelCacheOptions::default(),
            timeouts: TimeoutOptions::default(),
            length_cache: LengthCachePolicy::default(),
        }
    }
}

impl VfsOptions {
    /// Set the base URL.
    ///
    /// # Arguments
    /// * `base_url` - Base URL; empty disables containment
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the block size.
    ///
    /// # Arguments
    /// * `block_size` - Bytes per range request
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set kernel cache options.
    ///
    /// # Arguments
    /// * `kernel_cache` - Kernel cache configuration
    pub fn with_kernel_cache(mut self, kernel_cache: KernelCacheOptions) -> Self {
        self.kernel_cache = kernel_cache;
        self
    }

    /// Set timeout options.
    ///
    /// # Arguments
    /// * `timeouts` - Timeout configuration
    pub fn with_timeouts(mut self, timeouts: TimeoutOptions) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the length cache policy.
    ///
    /// # Arguments
    /// * `length_cache` - Policy for reusing probed lengths
    pub fn with_length_cache(mut self, length_cache: LengthCachePolicy) -> Self {
        self.length_cache = length_cache;
        self
    }

    /// Check the options and build the name resolver they describe.
    ///
    /// # Errors
    /// Returns error for a zero block size or an unusable base URL.
    pub fn validate(&self) -> Result<UrlResolver, VfsError> {
        if self.block_size == 0 {
            return Err(VfsError::InvalidConfig("block size must be non-zero".into()));
        }
        UrlResolver::new(&self.base_url).map_err(|e| VfsError::InvalidConfig(e.to_string()))
    }
}

// ============================================================================
// Length Cache Policy
// ============================================================================

/// How getattr obtains a file's length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LengthCachePolicy {
    /// Keep the first probed length for the life of the session.
    /// Never refreshed: a remote resource that changes size keeps its old size.
    #[default]
    TrustFirstProbe,

    /// Probe the remote resource on every getattr.
    AlwaysProbe,
}

// ============================================================================
// Kernel Cache Options
// ============================================================================

/// Options for kernel-level caching (FUSE).
#[derive(Debug, Clone)]
pub struct KernelCacheOptions {
    /// Attribute cache timeout in seconds.
    pub attr_timeout_secs: u64,

    /// Entry cache timeout in seconds.
    pub entry_timeout_secs: u64,
}

impl Default for KernelCacheOptions {
    fn default() -> Self {
        Self {
            attr_timeout_secs: 300,
            entry_timeout_secs: 300,
        }
    }
}

impl KernelCacheOptions {
    /// Create options with no kernel caching.
    pub fn no_cache() -> Self {
        Self {
            attr_timeout_secs: 0,
            entry_timeout_secs: 0,
        }
    }

    /// Attribute TTL handed to the kernel.
    pub fn attr_ttl(&self) -> Duration {
        Duration::from_secs(self.attr_timeout_secs)
    }

    /// Entry TTL handed to the kernel.
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_timeout_secs)
    }
}

// ============================================================================
// Timeout Options
// ============================================================================

/// Timeout settings for network operations.
#[derive(Debug, Clone)]
pub struct TimeoutOptions {
    /// Timeout for a single probe or block fetch in seconds.
    pub fetch_timeout_secs: u64,

    /// Timeout for establishing a connection in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for TimeoutOptions {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl TimeoutOptions {
    /// Transport settings carrying these timeouts.
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            request_timeout: Duration::from_secs(self.fetch_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..TransportSettings::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts: VfsOptions = VfsOptions::default();
        assert_eq!(opts.block_size, 256 * 1024);
        assert!(opts.base_url.is_empty());
        assert_eq!(opts.length_cache, LengthCachePolicy::TrustFirstProbe);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let opts: VfsOptions = VfsOptions::default()
            .with_base_url("https://example.org/data/")
            .with_block_size(4)
            .with_kernel_cache(KernelCacheOptions::no_cache())
            .with_length_cache(LengthCachePolicy::AlwaysProbe);

        assert_eq!(opts.block_size, 4);
        assert_eq!(opts.kernel_cache.attr_ttl(), Duration::ZERO);
        assert_eq!(opts.validate().unwrap().base(), "https://example.org/data/");
    }

    #[test]
    fn test_validate_rejects() {
        let opts: VfsOptions = VfsOptions::default().with_block_size(0);
        assert!(matches!(opts.validate(), Err(VfsError::InvalidConfig(_))));

        let opts: VfsOptions = VfsOptions::default().with_base_url("gopher://example.org/");
        assert!(matches!(opts.validate(), Err(VfsError::InvalidConfig(_))));
    }

    #[test]
    fn test_transport_settings() {
        let timeouts: TimeoutOptions = TimeoutOptions {
            fetch_timeout_secs: 5,
            connect_timeout_secs: 2,
        };
        let settings: TransportSettings = timeouts.transport_settings();
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.connect_timeout, Duration::from_secs(2));
    }
}
