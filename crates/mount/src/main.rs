//! claypigeon-mount: expose remote HTTP(S) files through a read-only FUSE mount.
//!
//! Usage:
//!   claypigeon-mount /mnt/remote --base-url https://example.org/data/
//!
//! Every file name under the mount point is a base64-encoded URL reference,
//! resolved against `--base-url`:
//!   cat "/mnt/remote/$(printf report.csv | base64)"

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use claypigeon_common::DEFAULT_BLOCK_SIZE;
use claypigeon_storage_http::HttpRangeClient;
use claypigeon_vfs::{KernelCacheOptions, RemoteFileFs, TimeoutOptions, VfsOptions};

/// Read-only FUSE filesystem over HTTP range requests.
#[derive(Parser, Debug)]
#[command(name = "claypigeon-mount", version)]
#[command(about = "Mount remote HTTP(S) resources as read-only files")]
struct Args {
    /// Directory to mount the filesystem on
    #[arg(value_name = "MOUNTPOINT")]
    mountpoint: PathBuf,

    /// Base URL that names are resolved against; empty admits any http(s) URL
    #[arg(long, default_value = "")]
    base_url: String,

    /// Size in bytes of each ranged fetch
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u64,

    /// Per-request timeout for remote fetches
    #[arg(long, default_value_t = 60)]
    fetch_timeout_secs: u64,

    /// Kernel attribute and entry cache timeout
    #[arg(long, default_value_t = 300)]
    attr_timeout_secs: u64,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Log every FUSE request received from the kernel
    #[arg(long)]
    debug_fuse: bool,
}

impl Args {
    fn vfs_options(&self) -> VfsOptions {
        VfsOptions::default()
            .with_base_url(self.base_url.clone())
            .with_block_size(self.block_size)
            .with_kernel_cache(KernelCacheOptions {
                attr_timeout_secs: self.attr_timeout_secs,
                entry_timeout_secs: self.attr_timeout_secs,
            })
            .with_timeouts(TimeoutOptions {
                fetch_timeout_secs: self.fetch_timeout_secs,
                ..TimeoutOptions::default()
            })
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let level: tracing::Level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let mut filter: EnvFilter = EnvFilter::from_default_env().add_directive(level.into());
    if args.debug_fuse {
        filter = filter.add_directive("fuser=debug".parse().context("bad fuser directive")?);
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let options: VfsOptions = args.vfs_options();
    let client = HttpRangeClient::new(options.timeouts.transport_settings())
        .context("failed to build HTTP client")?;
    let fs = RemoteFileFs::new(Arc::new(client), options)
        .context("invalid filesystem options")?;

    // FUSE callbacks run on the session thread and hand work to this runtime.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let _enter = runtime.enter();

    tracing::info!(
        mountpoint = %args.mountpoint.display(),
        base_url = %args.base_url,
        block_size = args.block_size,
        "Mounting"
    );

    claypigeon_vfs::mount(Arc::new(fs), &args.mountpoint)
        .with_context(|| format!("failed to mount {}", args.mountpoint.display()))?;

    tracing::info!("Unmounted");
    Ok(())
}
