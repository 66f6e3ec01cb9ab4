//! Configuration for the cluster client.

use crate::error::{Error, Result};
use crate::types::WorkerNode;
use std::time::Duration;

/// Default page size used by the worker page store (1 MiB).
pub const DEFAULT_PAGE_SIZE: usize = 1024 * 1024;

/// Default chunk size for chunked transfers (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Default maximum number of concurrent HTTP operations.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Default number of virtual nodes each physical worker occupies on the ring.
pub const DEFAULT_VNODES_PER_WORKER: usize = 5;

/// Default HTTP port of the worker REST server.
pub const DEFAULT_WORKER_HTTP_PORT: u16 = 28080;

/// Default interval between load job progress polls.
pub const DEFAULT_LOAD_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Client configuration. Created once at construction, read-only thereafter.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Initial worker membership.
    pub workers: Vec<WorkerNode>,

    /// Fixed page size used for page addressing, in bytes.
    pub page_size: usize,

    /// Maximum number of concurrent page requests per operation. Also sizes
    /// the HTTP connection pool.
    pub concurrency: usize,

    /// Number of virtual ring positions per physical worker.
    pub vnodes_per_worker: usize,

    /// Interval for membership refresh when a membership source is attached.
    pub refresh_interval: Duration,

    /// Interval between load job progress polls.
    pub load_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            workers: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            vnodes_per_worker: DEFAULT_VNODES_PER_WORKER,
            refresh_interval: Duration::from_secs(120),
            load_poll_interval: DEFAULT_LOAD_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the given initial worker list.
    pub fn new(workers: Vec<WorkerNode>) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Create a configuration from `host1,host2,host3`-style worker hosts,
    /// all using the default worker HTTP port.
    pub fn from_worker_hosts(hosts: &str) -> Self {
        let workers = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|h| WorkerNode::new(h, DEFAULT_WORKER_HTTP_PORT))
            .collect();
        Self::new(workers)
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the number of virtual nodes per worker.
    pub fn with_vnodes_per_worker(mut self, vnodes: usize) -> Self {
        self.vnodes_per_worker = vnodes;
        self
    }

    /// Set the membership refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the load job poll interval.
    pub fn with_load_poll_interval(mut self, interval: Duration) -> Self {
        self.load_poll_interval = interval;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be positive".into()));
        }
        if self.vnodes_per_worker == 0 {
            return Err(Error::Config(
                "vnodes_per_worker must be positive".into(),
            ));
        }
        Ok(())
    }
}
