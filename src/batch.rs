//! Optional batched-fetch acceleration capability.

use crate::error::Result;
use crate::transport::Request;
use async_trait::async_trait;
use bytes::Bytes;

/// Capability for fetching many page URLs in one native call.
///
/// This models an out-of-process or native acceleration backend as a
/// strategy: the read engine checks at construction time whether a fetcher
/// was supplied and takes the batched path only if so, falling back to
/// per-page requests otherwise.
#[async_trait]
pub trait BatchFetcher: Send + Sync {
    /// Fetch all requests and return their bodies in request order.
    ///
    /// Implementations must either return one body per request or fail the
    /// whole batch; a partially-filled result is a contract violation.
    async fn fetch_many(&self, requests: Vec<Request>) -> Result<Vec<Bytes>>;
}
