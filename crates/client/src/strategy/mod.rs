//! Caching strategies.
//!
//! Two policies share one handler capability:
//!
//! - [`RevisionCacheFirst`]: manifest URLs, keyed by `(url, revision)` in a
//!   dedicated partition and reconciled against the manifest on activation.
//! - [`CacheFirst`]: resource classes assumed immutable per URL, keyed by the
//!   bare URL and never revalidated.
//!
//! Both share the per-request sequence: cache read, then on a miss a network
//! fetch followed by a cache write.

pub mod cache_first;
pub mod revision;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use cache_first::CacheFirst;
pub use revision::{ReconcileStats, RevisionCacheFirst};

use crate::fetch::Fetcher;
use revcache_core::{Error, Request, Response};

/// A registered caching policy.
#[derive(Debug, Clone)]
pub enum Strategy {
    Revision(RevisionCacheFirst),
    CacheFirst(CacheFirst),
}

/// Which strategy served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    RevisionCacheFirst,
    CacheFirst,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::RevisionCacheFirst => f.write_str("revision-cache-first"),
            StrategyKind::CacheFirst => f.write_str("cache-first"),
        }
    }
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Revision(_) => StrategyKind::RevisionCacheFirst,
            Strategy::CacheFirst(_) => StrategyKind::CacheFirst,
        }
    }

    /// Serve a request through this strategy.
    pub async fn handle(&self, request: &Request, fetcher: &dyn Fetcher) -> Result<Response, Error> {
        match self {
            Strategy::Revision(strategy) => strategy.handle(request, fetcher).await,
            Strategy::CacheFirst(strategy) => strategy.handle(request, fetcher).await,
        }
    }
}

impl From<RevisionCacheFirst> for Strategy {
    fn from(strategy: RevisionCacheFirst) -> Self {
        Strategy::Revision(strategy)
    }
}

impl From<CacheFirst> for Strategy {
    fn from(strategy: CacheFirst) -> Self {
        Strategy::CacheFirst(strategy)
    }
}
