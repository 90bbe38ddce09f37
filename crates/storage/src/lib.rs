//! Transport abstraction for reading remote resources by byte range.
//!
//! This crate provides a backend-agnostic interface for the two network
//! operations the filesystem needs:
//!
//! - **Metadata probe** - total length of a resource
//! - **Ranged fetch** - an inclusive byte range of a resource
//!
//! Backends live in their own crates (see `claypigeon-storage-http`). An
//! in-memory backend with request counting is provided here for tests.

mod error;
mod memory;
mod traits;
mod types;

pub use error::TransportError;
pub use memory::{MemoryRangeClient, RequestCounts};
pub use traits::RangeClient;
pub use types::{ByteRange, TransportSettings};
