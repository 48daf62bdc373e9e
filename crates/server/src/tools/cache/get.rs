//! cache_get tool implementation.
//!
//! Retrieves a stored response by cache name and key.

use revcache_core::{CacheDb, CacheKey, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The cache (partition) to look in.
    pub cache_name: String,

    /// The full cache key, as listed by cache_keys.
    pub key: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub cache_name: String,
    pub cache_key: String,
    pub url: String,
    pub revision: Option<String>,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body_bytes: usize,
    pub body_sha256: String,
    pub stored_at: String,
    /// Body as text, when it is valid UTF-8.
    pub body_text: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let (_, revision) = CacheKey::parse(&params.key)?;

    let entry = cache
        .open_partition(params.cache_name.as_str())
        .match_key(&params.key)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {}", params.key, params.cache_name)))?;

    let output = CacheGetOutput {
        revision,
        status: entry.status,
        body_bytes: entry.body.len(),
        body_text: std::str::from_utf8(&entry.body).ok().map(str::to_string),
        cache_name: entry.cache_name,
        cache_key: entry.cache_key,
        url: entry.url,
        headers: entry.headers,
        body_sha256: entry.body_sha256,
        stored_at: entry.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_text;
    use revcache_core::Response;
    use url::Url;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams {
            cache_name: "runtime".to_string(),
            key: "https://example.com/missing.png".to_string(),
        };

        let result = get_impl(&cache, params).await;
        assert_eq!(result.unwrap_err().code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_bad_key() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { cache_name: "runtime".to_string(), key: "not a url".to_string() };

        let result = get_impl(&cache, params).await;
        assert_eq!(result.unwrap_err().code.0, -32002);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let url = Url::parse("https://example.com/a.html").unwrap();
        let response = Response::new(url.as_str(), 200, "page a").with_header("content-type", "text/html");
        cache
            .open_partition("runtime-revision")
            .put(&CacheKey::new(&url, Some("rev1")), &response)
            .await
            .unwrap();

        let params = CacheGetParams {
            cache_name: "runtime-revision".to_string(),
            key: "https://example.com/a.html?__WB_REVISION__=rev1".to_string(),
        };
        let result = get_impl(&cache, params).await.unwrap();
        let output: CacheGetOutput = serde_json::from_str(&result_text(&result)).unwrap();

        assert_eq!(output.url, "https://example.com/a.html");
        assert_eq!(output.revision.as_deref(), Some("rev1"));
        assert_eq!(output.body_text.as_deref(), Some("page a"));
        assert_eq!(output.body_sha256.len(), 64);
    }

    #[tokio::test]
    async fn test_get_impl_looks_up_stored_key_verbatim() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let url = Url::parse("https://cdn.example.org/map.png?__WB_REVISION__=2").unwrap();
        cache
            .open_partition("runtime")
            .put(CacheKey::bare(&url), &Response::new(url.as_str(), 200, "new map"))
            .await
            .unwrap();

        let params = CacheGetParams { cache_name: "runtime".to_string(), key: url.to_string() };
        let result = get_impl(&cache, params).await.unwrap();
        let output: CacheGetOutput = serde_json::from_str(&result_text(&result)).unwrap();

        assert_eq!(output.cache_key, url.as_str());
        assert_eq!(output.body_text.as_deref(), Some("new map"));
    }

    #[tokio::test]
    async fn test_get_impl_wrong_partition() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let url = Url::parse("https://example.com/a.html").unwrap();
        cache
            .open_partition("runtime-revision")
            .put(&CacheKey::new(&url, Some("rev1")), &Response::new(url.as_str(), 200, "a"))
            .await
            .unwrap();

        let params = CacheGetParams {
            cache_name: "runtime".to_string(),
            key: "https://example.com/a.html?__WB_REVISION__=rev1".to_string(),
        };
        assert!(get_impl(&cache, params).await.is_err());
    }
}
