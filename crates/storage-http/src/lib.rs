//! HTTP(S) backend for claypigeon storage.
//!
//! This crate provides a `RangeClient` implementation using `reqwest`.
//! Lengths are probed with `HEAD` and blocks are fetched with `GET` plus a
//! `Range: bytes=<start>-<end>` header.
//!
//! # Example
//!
//! ```ignore
//! use claypigeon_storage::{ByteRange, RangeClient, TransportSettings};
//! use claypigeon_storage_http::HttpRangeClient;
//!
//! let client = HttpRangeClient::new(TransportSettings::default())?;
//! let length = client.content_length("https://example.org/data.zip").await?;
//! let head = client.get_range("https://example.org/data.zip", ByteRange::new(0, 1023)).await?;
//! ```

mod client;
mod error;

pub use client::HttpRangeClient;
pub use error::HttpError;
