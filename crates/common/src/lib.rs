//! Shared types and utilities for claypigeon.
//!
//! This crate provides common functionality used across all claypigeon crates:
//! - Filesystem-wide constants (root inode, default block size, permissions)
//! - Decoding of base64 file names into canonical remote URLs
//! - Shared error types

pub mod constants;
pub mod error;
pub mod url_utils;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::ResolveError;
pub use url_utils::{decode_name, encode_name, is_within_base, UrlResolver};
