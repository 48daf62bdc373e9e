//! Plain cache-first strategy.
//!
//! Used for resource classes (fonts, images) that never change once published
//! under a URL. The first stored copy wins until the partition is cleared.

use crate::fetch::Fetcher;
use revcache_core::{CacheKey, Error, Partition, Request, Response};

#[derive(Debug, Clone)]
pub struct CacheFirst {
    partition: Partition,
}

impl CacheFirst {
    pub fn new(partition: Partition) -> Self {
        Self { partition }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Serve from the partition, fetching and storing under the bare URL on a miss.
    pub async fn handle(&self, request: &Request, fetcher: &dyn Fetcher) -> Result<Response, Error> {
        let cache_key = CacheKey::bare(request.url());

        if let Some(entry) = self.partition.match_key(&cache_key).await? {
            tracing::debug!(%cache_key, "cache-first hit");
            return Ok(entry.into_response());
        }

        tracing::debug!(%cache_key, "cache-first miss");
        let response = fetcher.fetch(request).await?;
        self.partition.put(&cache_key, &response).await?;
        Ok(response)
    }
}
