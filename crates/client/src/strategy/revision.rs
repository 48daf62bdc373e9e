//! Revision-checked cache-first strategy.
//!
//! Manifest URLs are cached under a key that embeds their current revision.
//! A hit is served without touching the network; a revision bump changes the
//! key, so the next request misses and refetches. Entries left behind by old
//! revisions are removed by [`RevisionCacheFirst::reconcile`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fetch::Fetcher;
use revcache_core::{CacheKey, Error, Partition, Request, Response, RuntimeManifest};
use url::Url;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Keys found in the partition.
    pub scanned: usize,
    /// Keys matching a manifest URL at its current revision.
    pub kept: usize,
    /// Stale or unknown keys deleted.
    pub purged: usize,
    /// Stale keys whose delete failed; retried on the next pass.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct RevisionCacheFirst {
    manifest: Arc<RuntimeManifest>,
    partition: Partition,
}

impl RevisionCacheFirst {
    pub fn new(manifest: Arc<RuntimeManifest>, partition: Partition) -> Self {
        Self { manifest, partition }
    }

    pub fn manifest(&self) -> &RuntimeManifest {
        &self.manifest
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Serve a manifest URL from the revision partition, fetching on a miss.
    ///
    /// # Errors
    ///
    /// - `Error::NotInManifest` if the request URL has no revision; the
    ///   router must only dispatch manifest URLs here.
    /// - Any fetch error on a miss. Nothing is written in that case.
    pub async fn handle(&self, request: &Request, fetcher: &dyn Fetcher) -> Result<Response, Error> {
        let url = request.url();
        let revision = self
            .manifest
            .get(url.as_str())
            .ok_or_else(|| Error::NotInManifest(url.to_string()))?;
        let cache_key = CacheKey::new(url, Some(revision));

        if let Some(entry) = self.partition.match_key(&cache_key).await? {
            tracing::debug!(%cache_key, "revision cache hit");
            return Ok(entry.into_response());
        }

        tracing::debug!(%cache_key, "revision cache miss");
        let response = fetcher.fetch(request).await?;
        // put copies the body out; the caller keeps an unconsumed response
        self.partition.put(&cache_key, &response).await?;
        Ok(response)
    }

    /// Remove every entry that is not a manifest URL at its current revision.
    ///
    /// Delete failures are counted and logged; the pass carries on so one bad
    /// row cannot pin the rest of the partition.
    pub async fn reconcile(&self) -> Result<ReconcileStats, Error> {
        let keys = self.partition.keys().await?;
        let current = self.current_keys();
        let mut stats = ReconcileStats { scanned: keys.len(), ..Default::default() };

        for key in keys {
            if current.contains(&key) {
                stats.kept += 1;
                continue;
            }

            match self.partition.delete(&key).await {
                Ok(_) => {
                    stats.purged += 1;
                    tracing::debug!(cache_key = %key, "purged stale revision entry");
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(cache_key = %key, error = %e, "failed to purge stale revision entry");
                }
            }
        }

        tracing::info!(
            cache = self.partition.name(),
            scanned = stats.scanned,
            kept = stats.kept,
            purged = stats.purged,
            failed = stats.failed,
            "reconciled revision cache"
        );

        Ok(stats)
    }

    /// Keys `handle` would write for the manifest as it stands. A stored key
    /// is current iff it is in this set.
    fn current_keys(&self) -> HashSet<String> {
        self.manifest
            .iter()
            .filter_map(|(url, revision)| {
                Url::parse(url)
                    .ok()
                    .map(|url| String::from(CacheKey::new(&url, Some(revision))))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StubFetcher;
    use revcache_core::CacheDb;

    const ORIGIN: &str = "https://example.com";

    fn manifest(pairs: &[(&str, &str)]) -> Arc<RuntimeManifest> {
        Arc::new(RuntimeManifest::load(&Url::parse(ORIGIN).unwrap(), pairs.iter().copied()))
    }

    async fn strategy(pairs: &[(&str, &str)]) -> (CacheDb, RevisionCacheFirst) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let strategy = RevisionCacheFirst::new(manifest(pairs), db.open_partition("runtime-revision"));
        (db, strategy)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores_under_revision_key() {
        let (_db, strategy) = strategy(&[("a.html", "rev1")]).await;
        let fetcher = StubFetcher::new().route("https://example.com/a.html", 200, "page a");
        let request = Request::parse("https://example.com/a.html").unwrap();

        let response = strategy.handle(&request, &fetcher).await.unwrap();
        assert_eq!(response.body, "page a");
        assert_eq!(fetcher.calls(), 1);

        let keys = strategy.partition().keys().await.unwrap();
        assert_eq!(keys, vec!["https://example.com/a.html?__WB_REVISION__=rev1".to_string()]);
    }

    #[tokio::test]
    async fn test_hit_does_not_touch_network() {
        let (_db, strategy) = strategy(&[("a.html", "rev1")]).await;
        let fetcher = StubFetcher::new().route("https://example.com/a.html", 200, "page a");
        let request = Request::parse("https://example.com/a.html").unwrap();

        let first = strategy.handle(&request, &fetcher).await.unwrap();
        fetcher.set("https://example.com/a.html", 200, "changed upstream");
        let second = strategy.handle(&request, &fetcher).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_non_success_status_is_stored() {
        let (_db, strategy) = strategy(&[("gone.html", "rev1")]).await;
        let fetcher = StubFetcher::new().route("https://example.com/gone.html", 404, "missing");
        let request = Request::parse("https://example.com/gone.html").unwrap();

        let response = strategy.handle(&request, &fetcher).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(strategy.partition().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let (_db, strategy) = strategy(&[("a.html", "rev1")]).await;
        let fetcher = StubFetcher::new();
        let request = Request::parse("https://example.com/a.html").unwrap();

        let result = strategy.handle(&request, &fetcher).await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert!(strategy.partition().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_url_outside_manifest_is_contract_error() {
        let (_db, strategy) = strategy(&[("a.html", "rev1")]).await;
        let fetcher = StubFetcher::new().route("https://example.com/b.html", 200, "b");
        let request = Request::parse("https://example.com/b.html").unwrap();

        let result = strategy.handle(&request, &fetcher).await;
        assert!(matches!(result, Err(Error::NotInManifest(_))));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_revision_bump_misses() {
        let (db, old) = strategy(&[("a.html", "rev1")]).await;
        let fetcher = StubFetcher::new().route("https://example.com/a.html", 200, "v1");
        let request = Request::parse("https://example.com/a.html").unwrap();
        old.handle(&request, &fetcher).await.unwrap();

        let new = RevisionCacheFirst::new(manifest(&[("a.html", "rev2")]), db.open_partition("runtime-revision"));
        fetcher.set("https://example.com/a.html", 200, "v2");
        let response = new.handle(&request, &fetcher).await.unwrap();

        assert_eq!(response.body, "v2");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_purges_changed_and_removed() {
        let (db, old) = strategy(&[("a.html", "rev1"), ("b.html", "rev1")]).await;
        let fetcher = StubFetcher::new()
            .route("https://example.com/a.html", 200, "a1")
            .route("https://example.com/b.html", 200, "b1");
        let a = Request::parse("https://example.com/a.html").unwrap();
        let b = Request::parse("https://example.com/b.html").unwrap();
        old.handle(&a, &fetcher).await.unwrap();
        old.handle(&b, &fetcher).await.unwrap();

        let new = RevisionCacheFirst::new(manifest(&[("a.html", "rev2")]), db.open_partition("runtime-revision"));
        let stats = new.reconcile().await.unwrap();

        assert_eq!(stats, ReconcileStats { scanned: 2, kept: 0, purged: 2, failed: 0 });
        assert!(new.partition().is_empty().await.unwrap());

        fetcher.set("https://example.com/a.html", 200, "a2");
        let response = new.handle(&a, &fetcher).await.unwrap();
        assert_eq!(response.body, "a2");
        assert_eq!(
            new.partition().keys().await.unwrap(),
            vec!["https://example.com/a.html?__WB_REVISION__=rev2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reconcile_keeps_current_entries() {
        let (db, strategy) = strategy(&[("a.html", "rev1"), ("b.html", "rev1")]).await;
        let fetcher = StubFetcher::new()
            .route("https://example.com/a.html", 200, "a")
            .route("https://example.com/b.html", 200, "b");
        strategy.handle(&Request::parse("https://example.com/a.html").unwrap(), &fetcher).await.unwrap();
        strategy.handle(&Request::parse("https://example.com/b.html").unwrap(), &fetcher).await.unwrap();

        let next = RevisionCacheFirst::new(
            manifest(&[("a.html", "rev1"), ("b.html", "rev2")]),
            db.open_partition("runtime-revision"),
        );
        let stats = next.reconcile().await.unwrap();

        assert_eq!(stats, ReconcileStats { scanned: 2, kept: 1, purged: 1, failed: 0 });
        assert_eq!(
            next.partition().keys().await.unwrap(),
            vec!["https://example.com/a.html?__WB_REVISION__=rev1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reconcile_removes_bare_keys() {
        let (_db, strategy) = strategy(&[("a.html", "rev1")]).await;
        let url = Url::parse("https://example.com/a.html").unwrap();
        let response = Response::new(url.as_str(), 200, "a");
        strategy.partition().put(CacheKey::bare(&url), &response).await.unwrap();
        strategy.partition().put(CacheKey::new(&url, Some("rev1")), &response).await.unwrap();

        let stats = strategy.reconcile().await.unwrap();
        assert_eq!(stats, ReconcileStats { scanned: 2, kept: 1, purged: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_reconcile_removes_unparseable_keys() {
        let (_db, strategy) = strategy(&[("a.html", "rev1")]).await;
        let response = Response::new("https://example.com/a.html", 200, "a");
        strategy.partition().put("not a url", &response).await.unwrap();
        strategy.partition().put("::", &response).await.unwrap();

        let stats = strategy.reconcile().await.unwrap();
        assert_eq!(stats, ReconcileStats { scanned: 2, kept: 0, purged: 2, failed: 0 });
        assert!(strategy.partition().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_reconcile_keeps_manifest_urls_carrying_revision_param() {
        let (_db, strategy) = strategy(&[("map.png?__WB_REVISION__=legacy", "rev1")]).await;
        let fetcher = StubFetcher::new().route("https://example.com/map.png?__WB_REVISION__=legacy", 200, "map");
        let request = Request::parse("https://example.com/map.png?__WB_REVISION__=legacy").unwrap();
        strategy.handle(&request, &fetcher).await.unwrap();

        let stats = strategy.reconcile().await.unwrap();
        assert_eq!(stats, ReconcileStats { scanned: 1, kept: 1, purged: 0, failed: 0 });

        strategy.handle(&request, &fetcher).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_counts_failed_deletes_and_continues() {
        let (db, old) = strategy(&[("a.html", "rev1"), ("b.html", "rev1"), ("c.html", "rev1")]).await;
        let fetcher = StubFetcher::new()
            .route("https://example.com/a.html", 200, "a")
            .route("https://example.com/b.html", 200, "b")
            .route("https://example.com/c.html", 200, "c");
        for page in ["a", "b", "c"] {
            let request = Request::parse(&format!("https://example.com/{page}.html")).unwrap();
            old.handle(&request, &fetcher).await.unwrap();
        }
        db.execute_batch(
            "CREATE TRIGGER refuse_delete BEFORE DELETE ON cache_entries
             WHEN old.cache_key LIKE '%/b.html%'
             BEGIN SELECT RAISE(ABORT, 'locked'); END;",
        )
        .await
        .unwrap();

        let new = RevisionCacheFirst::new(
            manifest(&[("a.html", "rev2"), ("b.html", "rev2"), ("c.html", "rev1")]),
            db.open_partition("runtime-revision"),
        );
        let stats = new.reconcile().await.unwrap();

        assert_eq!(stats, ReconcileStats { scanned: 3, kept: 1, purged: 1, failed: 1 });
        assert_eq!(
            new.partition().keys().await.unwrap(),
            vec![
                "https://example.com/b.html?__WB_REVISION__=rev1".to_string(),
                "https://example.com/c.html?__WB_REVISION__=rev1".to_string(),
            ]
        );

        db.execute_batch("DROP TRIGGER refuse_delete;").await.unwrap();
        let retry = new.reconcile().await.unwrap();
        assert_eq!(retry, ReconcileStats { scanned: 2, kept: 1, purged: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_reconcile_leaves_other_partitions_alone() {
        let (db, strategy) = strategy(&[]).await;
        let url = Url::parse("https://example.com/font.woff2").unwrap();
        let runtime = db.open_partition("runtime");
        runtime.put(CacheKey::bare(&url), &Response::new(url.as_str(), 200, "f")).await.unwrap();

        let stats = strategy.reconcile().await.unwrap();
        assert_eq!(stats.scanned, 0);
        assert_eq!(runtime.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let (_db, strategy) = strategy(&[("a.html", "rev1")]).await;
        let fetcher = StubFetcher::new().route("https://example.com/a.html", 200, "a");
        strategy.handle(&Request::parse("https://example.com/a.html").unwrap(), &fetcher).await.unwrap();

        let first = strategy.reconcile().await.unwrap();
        let second = strategy.reconcile().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.kept, 1);
    }
}
