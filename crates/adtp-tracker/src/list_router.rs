//! The fan-out resolver: first success across a set of trackers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::debug;

use adtp_crypto::{Address, Identity};

use crate::error::RouteError;
use crate::messages::RedirectEntry;
use crate::router::{RedirectHandler, Router};

/// Global wall-clock deadline for one fan-out lookup.
pub const FAN_OUT_DEADLINE: Duration = Duration::from_secs(30);

/// A resolver over several independent trackers. Lookups run against all
/// of them concurrently; the first success wins and at most one result is
/// surfaced per call.
pub struct ListRouter {
    routers: Vec<Arc<Router>>,
    deadline: Duration,
}

impl ListRouter {
    pub fn new(routers: Vec<Arc<Router>>) -> Self {
        Self {
            routers,
            deadline: FAN_OUT_DEADLINE,
        }
    }

    /// Build one resolver client per tracker URL, sharing an origin
    /// identity and redirect handler.
    pub fn from_urls<I, S>(
        origin: Arc<Identity>,
        redirector: Arc<dyn RedirectHandler>,
        urls: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let routers = urls
            .into_iter()
            .map(|url| Arc::new(Router::new(url, origin.clone(), redirector.clone())))
            .collect();
        Self::new(routers)
    }

    /// Override the fan-out deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn lookup(&self, address: &str, lookup_type: &str) -> Result<Address, RouteError> {
        let address = address.to_string();
        let lookup_type = lookup_type.to_string();
        self.fan_out(move |router| {
            let address = address.clone();
            let lookup_type = lookup_type.clone();
            async move { router.lookup(&address, &lookup_type).await }
        })
        .await
    }

    pub async fn lookup_alias(&self, alias: &str, lookup_type: &str) -> Result<Address, RouteError> {
        let alias = alias.to_string();
        let lookup_type = lookup_type.to_string();
        self.fan_out(move |router| {
            let alias = alias.clone();
            let lookup_type = lookup_type.clone();
            async move { router.lookup_alias(&alias, &lookup_type).await }
        })
        .await
    }

    /// Register with every tracker, best-effort: dispatch in parallel and
    /// return without awaiting any. Per-tracker failures are not surfaced.
    pub async fn register(
        &self,
        identity: Arc<Identity>,
        alias: &str,
        redirects: HashMap<String, RedirectEntry>,
    ) -> Result<(), RouteError> {
        for router in &self.routers {
            let router = router.clone();
            let identity = identity.clone();
            let alias = alias.to_string();
            let redirects = redirects.clone();
            tokio::spawn(async move {
                if let Err(err) = router.register(&identity, &alias, redirects).await {
                    debug!(url = router.url(), %err, "best-effort registration failed");
                }
            });
        }
        Ok(())
    }

    /// Run `query` against every tracker. First success returns
    /// immediately; if every tracker fails the error is
    /// [`RouteError::ExhaustedAllTrackers`], and if the deadline fires
    /// first it is [`RouteError::Timeout`]. Losing branches are aborted.
    async fn fan_out<F, Fut>(&self, query: F) -> Result<Address, RouteError>
    where
        F: Fn(Arc<Router>) -> Fut,
        Fut: Future<Output = Result<Address, RouteError>> + Send + 'static,
    {
        if self.routers.is_empty() {
            return Err(RouteError::ExhaustedAllTrackers);
        }

        let mut in_flight = JoinSet::new();
        for router in &self.routers {
            in_flight.spawn(query(router.clone()));
        }

        let outcome = tokio::time::timeout(self.deadline, async {
            while let Some(joined) = in_flight.join_next().await {
                match joined {
                    Ok(Ok(address)) => return Some(address),
                    Ok(Err(err)) => debug!(%err, "tracker lookup failed"),
                    Err(err) => debug!(%err, "tracker lookup task died"),
                }
            }
            None
        })
        .await;

        // Tear down stragglers promptly; late completions are discarded.
        in_flight.abort_all();

        match outcome {
            Ok(Some(address)) => Ok(address),
            Ok(None) => Err(RouteError::ExhaustedAllTrackers),
            Err(_) => Err(RouteError::Timeout),
        }
    }
}
