//! Core types and shared functionality for revcache.
//!
//! This crate provides:
//! - Cache storage with a SQLite backend, split into named partitions
//! - Revision-aware cache keys and the runtime manifest
//! - Request/response value types shared by strategies and hosts
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod manifest;

pub use cache::{CacheDb, CacheEntry, CacheKey, Partition};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Request, Response};
pub use manifest::RuntimeManifest;
