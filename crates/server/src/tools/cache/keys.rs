//! cache_keys tool implementation.

use revcache_core::{CacheDb, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Restrict the listing to one cache. Lists every cache when omitted.
    #[serde(default)]
    pub cache_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListing {
    pub cache_name: String,
    pub keys: Vec<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub caches: Vec<CacheListing>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(cache: &CacheDb, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let names = match params.cache_name {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::InvalidInput("cache_name must not be empty".to_string()).into());
        }
        Some(name) => vec![name],
        None => cache.cache_names().await?,
    };

    let mut caches = Vec::with_capacity(names.len());
    for cache_name in names {
        let keys = cache.open_partition(cache_name.as_str()).keys().await?;
        caches.push(CacheListing { cache_name, keys });
    }

    let output = CacheKeysOutput { caches };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
