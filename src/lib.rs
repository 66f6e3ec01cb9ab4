//! Client for DriftFS distributed storage worker clusters.
//!
//! This crate locates the worker node responsible for a logical path via
//! consistent hashing, then performs paginated reads and writes, bulk
//! chunked transfers, and asynchronous cache-warming (load) jobs against
//! that worker over HTTP. It is the building block for filesystem adapters
//! and applications that need byte-range access to files backed by the
//! cluster.
//!
//! # Example
//!
//! ```rust,no_run
//! use driftfs_client::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_worker_hosts("host1,host2,host3");
//!     let client = Client::new(config)?;
//!
//!     // Warm the worker cache, best-effort.
//!     client.load("s3://bucket/data.bin", None, true).await?;
//!
//!     // Byte-range read, assembled from fixed-size pages.
//!     let bytes = client.read_range("s3://bucket/data.bin", 1024, 4096).await?;
//!     println!("read {} bytes", bytes.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │          Client / blocking::Client         │
//! │  read · write · chunked · load · metadata  │
//! └────────────────────────────────────────────┘
//!          │                │
//!          ▼                ▼
//! ┌───────────────┐  ┌─────────────────────────┐
//! │ WorkerRouter  │  │ PagePlan + Transport    │
//! │  (hash ring)  │  │  (page/chunk requests)  │
//! └───────────────┘  └─────────────────────────┘
//! ```
//!
//! Routing is deterministic: the same path always resolves to the same
//! worker for a given membership, so repeated operations hit warm worker
//! caches. Reads reassemble pages in ascending index order regardless of
//! fetch concurrency; a short page response is the end-of-file signal.

pub mod batch;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod load;
pub mod paging;
pub mod routing;
pub mod testing;
pub mod transport;
pub mod types;
pub mod uri;

// Re-export main types for convenience
pub use batch::BatchFetcher;
pub use client::{Client, ClientBuilder, CopyOptions, RemoveOptions};
pub use config::ClientConfig;
pub use error::{Error, Result, RoutingError, TransportError};
pub use paging::{PageDescriptor, PagePlan};
pub use routing::{HashRing, MembershipSource, WorkerRouter};
pub use transport::{HttpTransport, Request, RequestBody, Response, Transport};
pub use types::{LoadState, OpType, PathStatus, WorkerNode};
