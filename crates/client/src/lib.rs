//! Client code for revcache.
//!
//! This crate provides the request-interception pipeline shared by the
//! server and CLI: the network fetcher, the two caching strategies, the
//! ordered router and the worker lifecycle host.

pub mod fetch;
pub mod lifecycle;
pub mod router;
pub mod strategy;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use lifecycle::WorkerState;
pub use router::{Dispatch, Router};
pub use strategy::{CacheFirst, ReconcileStats, RevisionCacheFirst, Strategy, StrategyKind};
pub use worker::{Served, Worker};
