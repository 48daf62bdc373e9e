//! cache_purge tool implementation.
//!
//! Deletes one entry by key, or clears a whole cache.

use revcache_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// The cache (partition) to purge.
    pub cache_name: String,

    /// Delete only this key. Clears the whole cache when omitted.
    #[serde(default)]
    pub key: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.cache_name.trim().is_empty() {
        return Err(Error::InvalidInput("cache_name must not be empty".to_string()).into());
    }

    let partition = cache.open_partition(params.cache_name.as_str());
    let deleted = match params.key {
        Some(key) => u64::from(partition.delete(&key).await?),
        None => partition.clear().await?,
    };
    tracing::info!(cache = partition.name(), deleted, "purged cache entries");

    let output = CachePurgeOutput { deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use revcache_core::{CacheKey, Response};
    use url::Url;

    async fn seeded() -> CacheDb {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let runtime = cache.open_partition("runtime");
        for path in ["a.png", "b.png"] {
            let url = Url::parse("https://example.com/").unwrap().join(path).unwrap();
            runtime
                .put(&CacheKey::bare(&url), &Response::new(url.as_str(), 200, path))
                .await
                .unwrap();
        }
        cache
    }

    fn deleted(result: &CallToolResult) -> u64 {
        serde_json::from_str::<CachePurgeOutput>(&result_text(result)).unwrap().deleted
    }

    #[tokio::test]
    async fn test_purge_single_key() {
        let cache = seeded().await;
        let params = CachePurgeParams {
            cache_name: "runtime".to_string(),
            key: Some("https://example.com/a.png".to_string()),
        };

        let result = purge_impl(&cache, params).await.unwrap();
        assert_eq!(deleted(&result), 1);
        assert_eq!(cache.open_partition("runtime").keys().await.unwrap(), vec!["https://example.com/b.png"]);
    }

    #[tokio::test]
    async fn test_purge_missing_key() {
        let cache = seeded().await;
        let params =
            CachePurgeParams { cache_name: "runtime".to_string(), key: Some("https://example.com/z.png".to_string()) };

        let result = purge_impl(&cache, params).await.unwrap();
        assert_eq!(deleted(&result), 0);
    }

    #[tokio::test]
    async fn test_purge_whole_cache() {
        let cache = seeded().await;
        let params = CachePurgeParams { cache_name: "runtime".to_string(), key: None };

        let result = purge_impl(&cache, params).await.unwrap();
        assert_eq!(deleted(&result), 2);
        assert!(cache.cache_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_empty_name() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CachePurgeParams { cache_name: " ".to_string(), key: None };
        assert!(purge_impl(&cache, params).await.is_err());
    }
}
