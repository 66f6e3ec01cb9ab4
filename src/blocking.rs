//! Blocking facade over the async client.
//!
//! Each operation runs to completion on the calling thread, driven by a
//! client-owned current-thread runtime. Page fetches are sequential in this
//! mode; bounded concurrency is available through the batched-fetch
//! capability. Do not use this facade from within an async runtime.

use crate::batch::BatchFetcher;
use crate::client::{CopyOptions, RemoveOptions};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{LoadState, PathStatus};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Blocking client for a distributed storage worker cluster.
pub struct Client {
    inner: crate::Client,
    runtime: tokio::runtime::Runtime,
}

impl Client {
    /// Create a blocking client. Page fetches are sequential; the
    /// configured concurrency still sizes the shared connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_batch_fetcher(config, None)
    }

    /// Create a blocking client with an optional batched-fetch backend.
    pub fn with_batch_fetcher(
        config: ClientConfig,
        batch_fetcher: Option<Arc<dyn BatchFetcher>>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Internal(format!("failed to build runtime: {e}")))?;
        // Sequential page fetches only; the configured concurrency still
        // sizes the shared connection pool.
        let mut builder = crate::Client::builder(config).with_page_fetch_concurrency(1);
        if let Some(fetcher) = batch_fetcher {
            builder = builder.with_batch_fetcher(fetcher);
        }
        let inner = runtime.block_on(async { builder.build() })?;
        Ok(Self { inner, runtime })
    }

    /// See [`crate::Client::list_status`].
    pub fn list_status(&self, path: &str) -> Result<Vec<PathStatus>> {
        self.runtime.block_on(self.inner.list_status(path))
    }

    /// See [`crate::Client::get_status`].
    pub fn get_status(&self, path: &str) -> Result<PathStatus> {
        self.runtime.block_on(self.inner.get_status(path))
    }

    /// See [`crate::Client::read`].
    pub fn read(&self, path: &str) -> Result<Bytes> {
        self.runtime.block_on(self.inner.read(path))
    }

    /// See [`crate::Client::read_range`].
    pub fn read_range(&self, path: &str, offset: u64, length: i64) -> Result<Bytes> {
        self.runtime
            .block_on(self.inner.read_range(path, offset, length))
    }

    /// See [`crate::Client::read_chunked`].
    pub fn read_chunked(&self, path: &str, chunk_size: Option<usize>) -> Result<Bytes> {
        self.runtime
            .block_on(self.inner.read_chunked(path, chunk_size))
    }

    /// See [`crate::Client::write_page`].
    pub fn write_page(&self, path: &str, page_index: u64, data: Bytes) -> Result<()> {
        self.runtime
            .block_on(self.inner.write_page(path, page_index, data))
    }

    /// See [`crate::Client::write_all`].
    pub fn write_all(&self, path: &str, data: Bytes) -> Result<()> {
        self.runtime.block_on(self.inner.write_all(path, data))
    }

    /// See [`crate::Client::write_chunked`].
    pub fn write_chunked(&self, path: &str, data: Bytes, chunk_size: Option<usize>) -> Result<()> {
        self.runtime
            .block_on(self.inner.write_chunked(path, data, chunk_size))
    }

    /// See [`crate::Client::mkdir`].
    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.runtime.block_on(self.inner.mkdir(path))
    }

    /// See [`crate::Client::touch`].
    pub fn touch(&self, path: &str) -> Result<()> {
        self.runtime.block_on(self.inner.touch(path))
    }

    /// See [`crate::Client::rename`].
    pub fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.runtime.block_on(self.inner.rename(src, dst))
    }

    /// See [`crate::Client::remove`].
    pub fn remove(&self, path: &str, options: RemoveOptions) -> Result<()> {
        self.runtime.block_on(self.inner.remove(path, options))
    }

    /// See [`crate::Client::copy`].
    pub fn copy(&self, src: &str, dst: &str, options: CopyOptions) -> Result<()> {
        self.runtime.block_on(self.inner.copy(src, dst, options))
    }

    /// See [`crate::Client::tail`].
    pub fn tail(&self, path: &str, num_bytes: Option<u64>) -> Result<Bytes> {
        self.runtime.block_on(self.inner.tail(path, num_bytes))
    }

    /// See [`crate::Client::head`].
    pub fn head(&self, path: &str, num_bytes: Option<u64>) -> Result<Bytes> {
        self.runtime.block_on(self.inner.head(path, num_bytes))
    }

    /// See [`crate::Client::submit_load`].
    pub fn submit_load(&self, path: &str, verbose: bool) -> Result<bool> {
        self.runtime.block_on(self.inner.submit_load(path, verbose))
    }

    /// See [`crate::Client::load_progress`].
    pub fn load_progress(&self, path: &str, verbose: bool) -> Result<(LoadState, Value)> {
        self.runtime
            .block_on(self.inner.load_progress(path, verbose))
    }

    /// See [`crate::Client::stop_load`].
    pub fn stop_load(&self, path: &str) -> Result<bool> {
        self.runtime.block_on(self.inner.stop_load(path))
    }

    /// See [`crate::Client::load`].
    pub fn load(&self, path: &str, timeout: Option<Duration>, verbose: bool) -> Result<bool> {
        self.runtime
            .block_on(self.inner.load(path, timeout, verbose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWorkerTransport;

    fn test_client(transport: Arc<FakeWorkerTransport>) -> Client {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let config = ClientConfig::from_worker_hosts("worker-0")
            .with_page_size(10)
            .with_concurrency(1);
        let inner = runtime
            .block_on(async {
                crate::Client::builder(config)
                    .with_transport(transport)
                    .build()
            })
            .unwrap();
        Client { inner, runtime }
    }

    #[test]
    fn test_blocking_round_trip() {
        let transport = Arc::new(FakeWorkerTransport::new(10));
        let client = test_client(transport);
        let data = Bytes::from_static(b"hello blocking world, three pages");

        client.write_all("s3://bucket/file", data.clone()).unwrap();
        assert_eq!(client.read("s3://bucket/file").unwrap(), data);
        assert_eq!(
            &client.read_range("s3://bucket/file", 6, 8).unwrap()[..],
            &data[6..14]
        );
    }

    #[test]
    fn test_blocking_keeps_configured_concurrency_for_pool() {
        // Only the page-fetch policy is sequential; the configured limit
        // must survive to size the connection pool.
        let config = ClientConfig::from_worker_hosts("worker-0").with_concurrency(32);
        let client = Client::new(config).unwrap();
        assert_eq!(client.inner.config().concurrency, 32);
        assert_eq!(client.inner.fetch_concurrency(), 1);
    }

    #[test]
    fn test_blocking_validation() {
        let transport = Arc::new(FakeWorkerTransport::new(10));
        let client = test_client(transport);
        assert!(client.read("relative/path").is_err());
    }
}
