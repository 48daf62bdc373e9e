//! The offline worker: one router, two strategies, one cache database.
//!
//! Route registration order is fixed:
//!
//! 1. manifest URLs → [`RevisionCacheFirst`] on the revision partition
//! 2. configured destinations → [`CacheFirst`] on the runtime partition
//!
//! Everything else is unhandled and goes straight to the network.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::fetch::{FetchClient, FetchConfig, Fetcher};
use crate::lifecycle::{WorkerState, respond_with, wait_until};
use crate::router::{Dispatch, Router};
use crate::strategy::{CacheFirst, ReconcileStats, RevisionCacheFirst, StrategyKind};
use revcache_core::{AppConfig, CacheDb, Destination, Error, Partition, Request, Response, RuntimeManifest};

/// A response plus the route that produced it (`None` for plain network).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub strategy: Option<StrategyKind>,
    pub response: Response,
}

pub struct Worker {
    db: CacheDb,
    router: Arc<Router>,
    revision: RevisionCacheFirst,
    cache_first: CacheFirst,
    fetcher: Arc<dyn Fetcher>,
    state: Arc<RwLock<WorkerState>>,
}

impl Worker {
    /// Build a worker over an open database and a loaded manifest.
    pub fn new(db: &CacheDb, manifest: RuntimeManifest, config: &AppConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let manifest = Arc::new(manifest);
        let revision = RevisionCacheFirst::new(Arc::clone(&manifest), db.open_partition(&config.revision_cache_name));
        let cache_first = CacheFirst::new(db.open_partition(&config.runtime_cache_name));
        let destinations: HashSet<Destination> = config.cache_first_destinations.iter().copied().collect();

        let mut router = Router::new();
        router
            .register(
                move |req: &Request| req.is_get() && manifest.contains(req.url().as_str()),
                revision.clone(),
            )
            .register(
                move |req: &Request| req.is_get() && destinations.contains(&req.destination()),
                cache_first.clone(),
            );

        tracing::debug!(
            manifest_entries = revision.manifest().len(),
            routes = router.len(),
            "worker constructed"
        );

        Self {
            db: db.clone(),
            router: Arc::new(router),
            revision,
            cache_first,
            fetcher,
            state: Arc::new(RwLock::new(WorkerState::Parsed)),
        }
    }

    /// Open the database, load the manifest and build a network-backed worker.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let manifest = match &config.manifest_path {
            Some(path) => RuntimeManifest::from_path(&origin, path)?,
            None => {
                tracing::warn!("no manifest_path configured; revision cache will be emptied on activation");
                RuntimeManifest::default()
            }
        };
        let db = CacheDb::open(&config.db_path).await?;
        let fetcher = FetchClient::new(FetchConfig::from(config))?;
        Ok(Self::new(&db, manifest, config, Arc::new(fetcher)))
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: WorkerState) {
        transition(&self.state, state);
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn manifest(&self) -> &RuntimeManifest {
        self.revision.manifest()
    }

    pub fn revision_partition(&self) -> &Partition {
        self.revision.partition()
    }

    pub fn runtime_partition(&self) -> &Partition {
        self.cache_first.partition()
    }

    /// Install event. Nothing to precache here; only advances the state.
    pub fn install(&self) {
        self.set_state(WorkerState::Installed);
    }

    /// Activate event: reconcile the revision partition, then go active.
    ///
    /// A failed reconciliation is logged and reported as `None`; activation
    /// completes either way. The final state is set by the spawned task, so
    /// dropping the returned future still ends in `Activated`.
    pub async fn activate(&self) -> Option<ReconcileStats> {
        self.set_state(WorkerState::Activating);
        let revision = self.revision.clone();
        let state = Arc::clone(&self.state);
        let stats = wait_until("activate", async move {
            let result = revision.reconcile().await;
            transition(&state, WorkerState::Activated);
            result
        })
        .await;
        // the task may have panicked before its transition
        self.set_state(WorkerState::Activated);
        stats
    }

    /// Intercept a request.
    ///
    /// Strategy work runs on its own task, so dropping the returned future
    /// does not abort a fetch or cache write that is already under way.
    pub async fn handle_fetch(&self, request: Request) -> Result<Dispatch, Error> {
        let router = Arc::clone(&self.router);
        let fetcher = Arc::clone(&self.fetcher);
        respond_with(async move { router.dispatch(&request, fetcher.as_ref()).await }).await
    }

    /// Intercept a request, falling back to a plain network fetch when unhandled.
    pub async fn fetch(&self, request: Request) -> Result<Served, Error> {
        match self.handle_fetch(request.clone()).await? {
            Dispatch::Handled { strategy, response } => Ok(Served { strategy: Some(strategy), response }),
            Dispatch::Unhandled => {
                tracing::debug!(url = %request.url(), "unhandled, using network");
                let response = self.fetcher.fetch(&request).await?;
                Ok(Served { strategy: None, response })
            }
        }
    }
}

fn transition(state: &RwLock<WorkerState>, next: WorkerState) {
    let mut current = state.write().unwrap_or_else(|e| e.into_inner());
    let previous = *current;
    if previous != next {
        tracing::info!(from = %previous, to = %next, "worker state change");
        *current = next;
    }
}
