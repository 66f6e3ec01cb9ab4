//! Worker routing over a shared hash ring snapshot.

use crate::config::ClientConfig;
use crate::error::{Result, RoutingError};
use crate::routing::HashRing;
use crate::types::WorkerNode;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Source of worker membership, e.g. a registry watch or a static list.
///
/// Discovery bootstrap itself lives outside this crate; the router only
/// consumes refreshed worker lists.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Fetch the current worker membership.
    async fn fetch_workers(&self) -> Result<Vec<WorkerNode>>;
}

/// Routes paths to workers via a consistent hash ring.
///
/// The router exclusively owns the current ring snapshot. Membership refresh
/// rebuilds the ring wholesale and swaps the snapshot atomically; in-flight
/// lookups complete against whichever snapshot they started with.
#[derive(Debug)]
pub struct WorkerRouter {
    ring: RwLock<Arc<HashRing>>,
    vnodes_per_worker: usize,
}

impl WorkerRouter {
    /// Create a router from the configured initial worker list.
    pub fn new(config: &ClientConfig) -> Self {
        let ring = HashRing::build(&config.workers, config.vnodes_per_worker);
        Self {
            ring: RwLock::new(Arc::new(ring)),
            vnodes_per_worker: config.vnodes_per_worker,
        }
    }

    /// Get the ordered candidate workers responsible for a path.
    ///
    /// Fails with [`RoutingError::EmptyRing`] if no workers are registered.
    pub fn resolve(&self, path: &str, count: usize) -> Result<Vec<WorkerNode>> {
        let ring = self.snapshot();
        if ring.is_empty() {
            return Err(RoutingError::EmptyRing.into());
        }
        Ok(ring.resolve(path, count))
    }

    /// Get the single preferred worker for a path.
    ///
    /// The client always routes each operation to exactly one worker; any
    /// other cardinality from the ring is a topology inconsistency and a
    /// hard error, never a silent degradation.
    pub fn preferred_worker(&self, path: &str) -> Result<WorkerNode> {
        let mut workers = self.resolve(path, 1)?;
        if workers.len() != 1 {
            return Err(RoutingError::UnexpectedWorkerCount {
                path: path.to_string(),
                expected: 1,
                actual: workers.len(),
            }
            .into());
        }
        Ok(workers.remove(0))
    }

    /// Replace the ring with one built from the given membership.
    ///
    /// Readers observe either the old or the fully-new ring, never a
    /// partially-updated one.
    pub fn update_workers(&self, workers: Vec<WorkerNode>) {
        let ring = Arc::new(HashRing::build(&workers, self.vnodes_per_worker));
        *self.ring.write() = ring;
    }

    /// Current number of workers on the ring.
    pub fn worker_count(&self) -> usize {
        self.snapshot().worker_count()
    }

    /// Current ring snapshot.
    fn snapshot(&self) -> Arc<HashRing> {
        self.ring.read().clone()
    }

    /// Periodically refresh membership from `source` until the router is
    /// dropped by all other holders.
    pub fn spawn_refresh_task(
        self: &Arc<Self>,
        source: Arc<dyn MembershipSource>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let router = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(router) = router.upgrade() else {
                    return;
                };
                match source.fetch_workers().await {
                    Ok(workers) => {
                        tracing::debug!(count = workers.len(), "refreshed worker membership");
                        router.update_workers(workers);
                    }
                    Err(e) => {
                        // Keep serving from the last good snapshot.
                        tracing::warn!(error = %e, "membership refresh failed");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn config_with_workers(n: usize) -> ClientConfig {
        let workers = (0..n)
            .map(|i| WorkerNode::new(format!("worker-{i}"), 28080))
            .collect();
        ClientConfig::new(workers)
    }

    #[test]
    fn test_empty_ring_is_routing_error() {
        let router = WorkerRouter::new(&ClientConfig::default());
        assert!(matches!(
            router.resolve("s3://bucket/key", 1),
            Err(Error::Routing(RoutingError::EmptyRing))
        ));
        assert!(router.preferred_worker("s3://bucket/key").is_err());
    }

    #[test]
    fn test_preferred_worker_is_stable() {
        let router = WorkerRouter::new(&config_with_workers(3));
        let first = router.preferred_worker("s3://bucket/key").unwrap();
        for _ in 0..50 {
            assert_eq!(router.preferred_worker("s3://bucket/key").unwrap(), first);
        }
    }

    #[test]
    fn test_update_workers_swaps_snapshot() {
        let router = WorkerRouter::new(&config_with_workers(2));
        assert_eq!(router.worker_count(), 2);

        router.update_workers(vec![WorkerNode::new("other", 28080)]);
        assert_eq!(router.worker_count(), 1);
        assert_eq!(
            router.preferred_worker("s3://bucket/key").unwrap(),
            WorkerNode::new("other", 28080)
        );

        router.update_workers(Vec::new());
        assert!(router.resolve("s3://bucket/key", 1).is_err());
    }

    #[tokio::test]
    async fn test_refresh_task_applies_membership() {
        struct StaticSource(Vec<WorkerNode>);

        #[async_trait]
        impl MembershipSource for StaticSource {
            async fn fetch_workers(&self) -> Result<Vec<WorkerNode>> {
                Ok(self.0.clone())
            }
        }

        let router = Arc::new(WorkerRouter::new(&config_with_workers(1)));
        let source = Arc::new(StaticSource(vec![
            WorkerNode::new("a", 28080),
            WorkerNode::new("b", 28080),
        ]));
        let handle = router.spawn_refresh_task(source, Duration::from_millis(5));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(router.worker_count(), 2);
        handle.abort();
    }
}
