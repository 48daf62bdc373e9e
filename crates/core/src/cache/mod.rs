//! SQLite-backed cache storage split into named partitions.
//!
//! This module provides a persistent response cache using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Independently addressable partitions (`cache_name`)
//! - Revision-aware cache keys
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Explicit deletion only; nothing is evicted under capacity pressure

pub mod connection;
pub mod key;
pub mod migrations;
pub mod partition;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::{CacheKey, REVISION_PARAM};
pub use partition::{CacheEntry, Partition};
