//! Ordered request routing.
//!
//! Routes are evaluated in registration order and the first matching
//! predicate wins. Two routes may match the same request (a manifest URL that
//! is also an image); only the earlier one is ever invoked.

use std::fmt;

use crate::fetch::Fetcher;
use crate::strategy::{Strategy, StrategyKind};
use revcache_core::{Error, Request, Response};

type Predicate = Box<dyn Fn(&Request) -> bool + Send + Sync>;

struct Route {
    predicate: Predicate,
    strategy: Strategy,
}

/// Result of dispatching one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A route matched and its strategy produced a response.
    Handled { strategy: StrategyKind, response: Response },
    /// No route matched; the request falls through to the network untouched.
    Unhandled,
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled { .. })
    }
}

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Earlier routes take precedence.
    pub fn register<P>(&mut self, predicate: P, strategy: impl Into<Strategy>) -> &mut Self
    where
        P: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.routes.push(Route { predicate: Box::new(predicate), strategy: strategy.into() });
        self
    }

    /// Strategy of the first route matching `request`.
    pub fn find(&self, request: &Request) -> Option<&Strategy> {
        self.routes
            .iter()
            .find(|route| (route.predicate)(request))
            .map(|route| &route.strategy)
    }

    /// Route a request to its strategy.
    ///
    /// Unmatched requests return `Dispatch::Unhandled` without any cache access.
    pub async fn dispatch(&self, request: &Request, fetcher: &dyn Fetcher) -> Result<Dispatch, Error> {
        let Some(strategy) = self.find(request) else {
            tracing::trace!(url = %request.url(), "no route matched");
            return Ok(Dispatch::Unhandled);
        };

        let response = strategy.handle(request, fetcher).await?;
        Ok(Dispatch::Handled { strategy: strategy.kind(), response })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|route| route.strategy.kind()))
            .finish()
    }
}
