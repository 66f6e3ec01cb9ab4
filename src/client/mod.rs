//! The cluster client: worker resolution plus paged, chunked, metadata, and
//! job-control operations against the worker HTTP API.

mod read;
mod write;

use crate::batch::BatchFetcher;
use crate::config::ClientConfig;
use crate::error::{Error, Result, TransportError};
use crate::routing::{MembershipSource, WorkerRouter};
use crate::transport::{HttpTransport, Request, Response, Transport};
use crate::types::{PathStatus, WorkerNode};
use crate::uri;
use bytes::Bytes;
use std::sync::Arc;

/// Options for [`Client::remove`].
///
/// Serialized as explicit query parameters; there is no open-ended
/// passthrough of unvalidated options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    /// Remove directories and their contents recursively.
    pub recursive: bool,
    /// Drop only the cached copy, leaving the underlying storage untouched.
    pub cache_only: bool,
}

/// Options for [`Client::copy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    /// Copy directories and their contents recursively.
    pub recursive: bool,
    /// Overwrite the destination if it exists.
    pub overwrite: bool,
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    batch_fetcher: Option<Arc<dyn BatchFetcher>>,
    membership_source: Option<Arc<dyn MembershipSource>>,
    fetch_concurrency: Option<usize>,
}

impl ClientBuilder {
    /// Start building a client from a configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            batch_fetcher: None,
            membership_source: None,
            fetch_concurrency: None,
        }
    }

    /// Use a custom transport instead of the default reqwest-backed one.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Supply a batched-fetch acceleration backend. When present, multi-page
    /// reads go through it instead of issuing per-page requests.
    pub fn with_batch_fetcher(mut self, fetcher: Arc<dyn BatchFetcher>) -> Self {
        self.batch_fetcher = Some(fetcher);
        self
    }

    /// Attach a membership source; worker membership is refreshed from it on
    /// the configured interval for the lifetime of the client.
    pub fn with_membership_source(mut self, source: Arc<dyn MembershipSource>) -> Self {
        self.membership_source = Some(source);
        self
    }

    /// Override the number of in-flight page fetches per read, without
    /// touching the configured concurrency limit (which also sizes the
    /// connection pool). Defaults to the configured limit. The blocking
    /// facade sets this to 1.
    pub fn with_page_fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = Some(fetch_concurrency);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        self.config.validate()?;
        let fetch_concurrency = match self.fetch_concurrency {
            Some(0) => {
                return Err(Error::Config(
                    "page fetch concurrency must be positive".into(),
                ))
            }
            Some(n) => n,
            None => self.config.concurrency,
        };
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(self.config.concurrency)?),
        };
        let router = Arc::new(WorkerRouter::new(&self.config));
        let refresh_task = self
            .membership_source
            .map(|source| router.spawn_refresh_task(source, self.config.refresh_interval));
        Ok(Client {
            config: self.config,
            router,
            transport,
            batch_fetcher: self.batch_fetcher,
            fetch_concurrency,
            refresh_task,
        })
    }
}

/// Async client for a distributed storage worker cluster.
///
/// Every operation resolves the responsible worker for its path via the
/// consistent hash ring, then issues one or more HTTP calls against that
/// worker's REST API.
pub struct Client {
    config: ClientConfig,
    router: Arc<WorkerRouter>,
    transport: Arc<dyn Transport>,
    batch_fetcher: Option<Arc<dyn BatchFetcher>>,
    fetch_concurrency: usize,
    refresh_task: Option<tokio::task::JoinHandle<()>>,
}

impl Client {
    /// Start building a client.
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Build a client with the default transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new(config).build()
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The worker router, for membership updates driven by the host
    /// application.
    pub fn router(&self) -> &Arc<WorkerRouter> {
        &self.router
    }

    /// Stop background activity. Dropping the client does the same; this
    /// exists for hosts that want deterministic teardown.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }

    /// List the directory at `path`.
    pub async fn list_status(&self, path: &str) -> Result<Vec<PathStatus>> {
        uri::validate_path(path)?;
        let worker = self.router.preferred_worker(path)?;
        let request = Request::get(files_url(&worker)).query("path", path);
        let response = self.send_checked(request).await?;
        let statuses: Vec<PathStatus> = serde_json::from_slice(&response.body)?;
        Ok(statuses)
    }

    /// Get the metadata snapshot for `path`.
    pub async fn get_status(&self, path: &str) -> Result<PathStatus> {
        uri::validate_path(path)?;
        let worker = self.router.preferred_worker(path)?;
        let request = Request::get(info_url(&worker)).query("path", path);
        let response = self.send_checked(request).await?;
        let mut statuses: Vec<PathStatus> = serde_json::from_slice(&response.body)?;
        if statuses.is_empty() {
            return Err(Error::Protocol(format!(
                "empty status response for {path}"
            )));
        }
        Ok(statuses.remove(0))
    }

    /// Create the directory at `path`.
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        let (worker, path_id) = self.locate(path)?;
        let request = Request::post(op_url(&worker, &path_id, "mkdir")).query("filePath", path);
        self.send_checked(request).await?;
        Ok(())
    }

    /// Create an empty file at `path`.
    pub async fn touch(&self, path: &str) -> Result<()> {
        let (worker, path_id) = self.locate(path)?;
        let request = Request::post(op_url(&worker, &path_id, "touch")).query("filePath", path);
        self.send_checked(request).await?;
        Ok(())
    }

    /// Move a file from `src` to `dst`. Routed by the source path.
    pub async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        uri::validate_path(dst)?;
        let (worker, path_id) = self.locate(src)?;
        let request = Request::post(op_url(&worker, &path_id, "mv"))
            .query("srcPath", src)
            .query("dstPath", dst);
        self.send_checked(request).await?;
        Ok(())
    }

    /// Remove the file or directory at `path`.
    pub async fn remove(&self, path: &str, options: RemoveOptions) -> Result<()> {
        let (worker, path_id) = self.locate(path)?;
        let request = Request::post(op_url(&worker, &path_id, "rm"))
            .query("filePath", path)
            .query("recursive", options.recursive)
            .query("cacheOnly", options.cache_only);
        self.send_checked(request).await?;
        Ok(())
    }

    /// Copy a file from `src` to `dst`. Routed by the source path.
    pub async fn copy(&self, src: &str, dst: &str, options: CopyOptions) -> Result<()> {
        uri::validate_path(dst)?;
        let (worker, path_id) = self.locate(src)?;
        let request = Request::post(op_url(&worker, &path_id, "cp"))
            .query("srcPath", src)
            .query("dstPath", dst)
            .query("recursive", options.recursive)
            .query("overwrite", options.overwrite);
        self.send_checked(request).await?;
        Ok(())
    }

    /// Read the last `num_bytes` bytes of the file at `path`.
    pub async fn tail(&self, path: &str, num_bytes: Option<u64>) -> Result<Bytes> {
        let (worker, path_id) = self.locate(path)?;
        let mut request = Request::get(op_url(&worker, &path_id, "tail")).query("filePath", path);
        if let Some(n) = num_bytes {
            request = request.query("numOfBytes", n);
        }
        let response = self.send_checked(request).await?;
        Ok(response.body)
    }

    /// Read the first `num_bytes` bytes of the file at `path`.
    pub async fn head(&self, path: &str, num_bytes: Option<u64>) -> Result<Bytes> {
        let (worker, path_id) = self.locate(path)?;
        let mut request = Request::get(op_url(&worker, &path_id, "head")).query("filePath", path);
        if let Some(n) = num_bytes {
            request = request.query("numBytes", n);
        }
        let response = self.send_checked(request).await?;
        Ok(response.body)
    }

    /// Validate `path`, resolve its worker, and derive its path identifier.
    pub(crate) fn locate(&self, path: &str) -> Result<(WorkerNode, String)> {
        uri::validate_path(path)?;
        let worker = self.router.preferred_worker(path)?;
        let path_id = uri::path_hash(path);
        Ok((worker, path_id))
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn batch_fetcher(&self) -> Option<&Arc<dyn BatchFetcher>> {
        self.batch_fetcher.as_ref()
    }

    /// In-flight page fetches per read.
    pub(crate) fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency
    }

    /// Send a request and fail on any non-2xx status.
    pub(crate) async fn send_checked(&self, request: Request) -> Result<Response> {
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(TransportError::Status {
                url,
                status: response.status,
            }
            .into());
        }
        Ok(response)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub(crate) fn worker_base(worker: &WorkerNode) -> String {
    format!("http://{}:{}/v1", worker.host, worker.http_port)
}

pub(crate) fn files_url(worker: &WorkerNode) -> String {
    format!("{}/files", worker_base(worker))
}

pub(crate) fn info_url(worker: &WorkerNode) -> String {
    format!("{}/info", worker_base(worker))
}

pub(crate) fn load_url(worker: &WorkerNode) -> String {
    format!("{}/load", worker_base(worker))
}

pub(crate) fn page_url(worker: &WorkerNode, path_id: &str, page_index: u64) -> String {
    format!("{}/file/{}/page/{}", worker_base(worker), path_id, page_index)
}

pub(crate) fn chunk_url(worker: &WorkerNode, path_id: &str) -> String {
    format!("{}/file/{}/chunk", worker_base(worker), path_id)
}

pub(crate) fn op_url(worker: &WorkerNode, path_id: &str, op: &str) -> String {
    format!("{}/files/{}/{}", worker_base(worker), path_id, op)
}
