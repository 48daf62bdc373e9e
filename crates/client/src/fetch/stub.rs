//! In-memory fetcher for tests.
//!
//! Serves canned responses by URL, counts every network call, and can delay
//! responses to exercise cancellation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use revcache_core::{Error, Request, Response};

use super::Fetcher;

/// Fetcher that answers from a fixed URL → response table.
///
/// URLs without a route fail with `Error::Network`, like an offline host.
#[derive(Debug, Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Response>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve `body` with `status` for `url`, replacing any previous route.
    pub fn route(self, url: &str, status: u16, body: &str) -> Self {
        self.set(url, status, body);
        self
    }

    /// Replace the response for `url` on a shared stub.
    pub fn set(&self, url: &str, status: u16, body: &str) {
        let response = Response::new(url, status, body.to_string()).with_header("content-type", "text/plain");
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), response);
    }

    /// Number of network calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(request.url().as_str())
            .cloned();
        response.ok_or_else(|| Error::Network(format!("no route to {}", request.url())))
    }
}
