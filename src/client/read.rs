//! Paged and chunked read paths.
//!
//! A byte range is translated into page descriptors and fetched from the
//! responsible worker. Pages may be fetched concurrently (bounded by the
//! configured limit) but are always reassembled in ascending page-index
//! order. A page response shorter than requested is the canonical
//! end-of-file signal.

use super::{chunk_url, page_url, Client};
use crate::batch::BatchFetcher;
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result};
use crate::paging::{PageDescriptor, PagePlan};
use crate::transport::Request;
use crate::types::WorkerNode;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::sync::Arc;

impl Client {
    /// Read the full content of the file at `path`.
    ///
    /// The file length comes from a metadata lookup; if that lookup fails,
    /// the whole read fails.
    pub async fn read(&self, path: &str) -> Result<Bytes> {
        let status = self.get_status(path).await?;
        self.read_range(path, 0, status.length as i64).await
    }

    /// Read `length` bytes starting at `offset` from the file at `path`.
    ///
    /// `length == -1` means "to end of file" and is resolved via a metadata
    /// lookup before any page is addressed. A zero-length range returns
    /// empty bytes without a network call.
    ///
    /// If the file is shorter than the requested range, the returned bytes
    /// stop at end of file; the caller distinguishes partial from complete
    /// reads by comparing lengths.
    pub async fn read_range(&self, path: &str, offset: u64, length: i64) -> Result<Bytes> {
        tracing::debug!(path, offset, length, "read_range");
        crate::uri::validate_path(path)?;
        let length = match length {
            -1 => {
                let status = self.get_status(path).await?;
                status.length.saturating_sub(offset)
            }
            l if l < 0 => {
                return Err(Error::Validation(format!(
                    "length must be a non-negative integer or -1, got {l}"
                )))
            }
            l => l as u64,
        };
        if length == 0 {
            return Ok(Bytes::new());
        }

        let (worker, path_id) = self.locate(path)?;
        let plan: Vec<PageDescriptor> =
            PagePlan::new(offset, length, self.config().page_size).collect();

        match self.batch_fetcher().cloned() {
            Some(fetcher) => {
                self.read_pages_batched(&fetcher, &worker, &path_id, path, &plan)
                    .await
            }
            None => self.read_pages(&worker, &path_id, path, &plan).await,
        }
    }

    /// Read the full file in one streaming round trip of `chunk_size`-sized
    /// increments, bypassing page addressing.
    pub async fn read_chunked(&self, path: &str, chunk_size: Option<usize>) -> Result<Bytes> {
        let chunk_size = chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(Error::Validation("chunk_size must be positive".into()));
        }
        let (worker, path_id) = self.locate(path)?;
        let request = Request::get(chunk_url(&worker, &path_id))
            .query("filePath", path)
            .query("chunkSize", chunk_size)
            .header("transfer-type", "chunked");
        let response = self.send_checked(request).await?;
        Ok(response.body)
    }

    /// Fetch the planned pages with bounded, order-preserving concurrency.
    async fn read_pages(
        &self,
        worker: &WorkerNode,
        path_id: &str,
        path: &str,
        plan: &[PageDescriptor],
    ) -> Result<Bytes> {
        let fetches = plan.iter().map(|descriptor| {
            let request = self.page_request(worker, path_id, path, descriptor);
            async move { self.send_checked(request).await.map(|r| r.body) }
        });
        let mut pages = futures::stream::iter(fetches).buffered(self.fetch_concurrency());

        let mut assembled = BytesMut::new();
        let mut position = 0usize;
        while let Some(result) = pages.next().await {
            let descriptor = &plan[position];
            match result {
                Ok(content) => {
                    let short = content.len() < descriptor.in_page_length;
                    assembled.extend_from_slice(&content);
                    if short {
                        // End of file: the worker had fewer bytes than the
                        // range asked for. Remaining pages are not fetched.
                        break;
                    }
                }
                Err(e) if position == 0 => {
                    return Err(e.context(format!(
                        "error reading page {} of {path} from {worker}",
                        descriptor.page_index
                    )));
                }
                Err(e) => {
                    // Data was already read successfully; return it and let
                    // the caller observe the shortfall by length.
                    tracing::warn!(
                        path,
                        page_index = descriptor.page_index,
                        error = %e,
                        "page read failed after partial success, truncating"
                    );
                    break;
                }
            }
            position += 1;
        }
        Ok(assembled.freeze())
    }

    /// Fetch the planned pages through the batched-fetch backend.
    async fn read_pages_batched(
        &self,
        fetcher: &Arc<dyn BatchFetcher>,
        worker: &WorkerNode,
        path_id: &str,
        path: &str,
        plan: &[PageDescriptor],
    ) -> Result<Bytes> {
        let requests = plan
            .iter()
            .map(|descriptor| self.page_request(worker, path_id, path, descriptor))
            .collect();
        let contents = fetcher
            .fetch_many(requests)
            .await
            .map_err(|e| e.context(format!("batched read of {path} from {worker} failed")))?;
        if contents.len() != plan.len() {
            return Err(Error::Protocol(format!(
                "batch fetcher returned {} bodies for {} requests",
                contents.len(),
                plan.len()
            )));
        }
        let mut assembled = BytesMut::new();
        for (descriptor, content) in plan.iter().zip(contents) {
            let short = content.len() < descriptor.in_page_length;
            assembled.extend_from_slice(&content);
            if short {
                break;
            }
        }
        Ok(assembled.freeze())
    }

    /// Build the request for one page. Full-page fetches use the offset-free
    /// request shape; partial pages carry explicit in-page bounds.
    fn page_request(
        &self,
        worker: &WorkerNode,
        path_id: &str,
        path: &str,
        descriptor: &PageDescriptor,
    ) -> Request {
        let request =
            Request::get(page_url(worker, path_id, descriptor.page_index)).query("filePath", path);
        if descriptor.is_full_page(self.config().page_size) {
            request
        } else {
            request
                .query("pageOffset", descriptor.in_page_offset)
                .query("pageLength", descriptor.in_page_length)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchFetcher;
    use crate::config::ClientConfig;
    use crate::testing::FakeWorkerTransport;
    use async_trait::async_trait;
    use std::sync::Arc;

    const PAGE_SIZE: usize = 10;

    fn test_client(transport: Arc<FakeWorkerTransport>, concurrency: usize) -> Client {
        let config = ClientConfig::from_worker_hosts("worker-0")
            .with_page_size(PAGE_SIZE)
            .with_concurrency(concurrency);
        Client::builder(config)
            .with_transport(transport)
            .build()
            .unwrap()
    }

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_read_range_mid_file() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(25);
        transport.put_file("s3://bucket/file", data.clone());
        let client = test_client(transport.clone(), 1);

        let read = client.read_range("s3://bucket/file", 5, 15).await.unwrap();
        assert_eq!(&read[..], &data[5..20]);

        // page 0 offset 5 len 5, page 1 full, page 2 offset 0 len 5
        let pages = transport.page_requests();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], (0, Some((5, 5))));
        assert_eq!(pages[1], (1, None));
        assert_eq!(pages[2], (2, Some((0, 5))));
    }

    #[tokio::test]
    async fn test_read_range_zero_length_makes_no_network_call() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        transport.put_file("s3://bucket/file", content(25));
        let client = test_client(transport.clone(), 1);

        let read = client.read_range("s3://bucket/file", 5, 0).await.unwrap();
        assert!(read.is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_read_range_to_end_of_file_resolves_length_first() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(25);
        transport.put_file("s3://bucket/file", data.clone());
        let client = test_client(transport, 1);

        let read = client.read_range("s3://bucket/file", 7, -1).await.unwrap();
        assert_eq!(&read[..], &data[7..]);
    }

    #[tokio::test]
    async fn test_read_range_negative_length_rejected() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let client = test_client(transport, 1);
        assert!(matches!(
            client.read_range("s3://bucket/file", 0, -2).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_read_full_file() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(37);
        transport.put_file("s3://bucket/file", data.clone());
        let client = test_client(transport, 1);

        let read = client.read("s3://bucket/file").await.unwrap();
        assert_eq!(&read[..], &data[..]);
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let client = test_client(transport, 1);
        assert!(client.read("s3://bucket/absent").await.is_err());
    }

    #[tokio::test]
    async fn test_short_page_terminates_read_without_fetching_rest() {
        // File is 17 bytes but we ask for 30: page 1 comes back short (7 of
        // 10 requested bytes), so page 2 must never be contacted.
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(17);
        transport.put_file("s3://bucket/file", data.clone());
        let client = test_client(transport.clone(), 1);

        let read = client.read_range("s3://bucket/file", 0, 30).await.unwrap();
        assert_eq!(&read[..], &data[..]);

        let pages = transport.page_requests();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].0, 1);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_fatal_and_stays_transport_class() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(25);
        transport.put_file("s3://bucket/file", data);
        transport.fail_page("s3://bucket/file", 0);
        let client = test_client(transport, 1);

        let err = client
            .read_range("s3://bucket/file", 0, 25)
            .await
            .unwrap_err();
        // Context is attached but the failure is still matchable as a
        // transport error.
        assert!(matches!(err, Error::Transport(_)), "got {err}");
        assert!(err.to_string().contains("page 0"));
    }

    #[tokio::test]
    async fn test_fetch_concurrency_override_keeps_reads_sequential() {
        // High configured concurrency (sizing the pool), page fetches
        // overridden to one at a time: once page 1 fails, page 2 must
        // never be contacted.
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(25);
        transport.put_file("s3://bucket/file", data.clone());
        transport.fail_page("s3://bucket/file", 1);
        let config = ClientConfig::from_worker_hosts("worker-0")
            .with_page_size(PAGE_SIZE)
            .with_concurrency(32);
        let client = Client::builder(config)
            .with_transport(transport.clone())
            .with_page_fetch_concurrency(1)
            .build()
            .unwrap();

        let read = client.read_range("s3://bucket/file", 0, 25).await.unwrap();
        assert_eq!(&read[..], &data[..10]);
        assert_eq!(transport.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_later_page_failure_returns_partial_data() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(25);
        transport.put_file("s3://bucket/file", data.clone());
        transport.fail_page("s3://bucket/file", 1);
        let client = test_client(transport.clone(), 1);

        let read = client.read_range("s3://bucket/file", 0, 25).await.unwrap();
        assert_eq!(&read[..], &data[..10]);
        // Page 2 is not contacted once page 1 failed.
        assert_eq!(transport.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_fetch_reassembles_in_page_order() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(95);
        transport.put_file("s3://bucket/file", data.clone());
        let client = test_client(transport, 8);

        let read = client.read_range("s3://bucket/file", 0, 95).await.unwrap();
        assert_eq!(&read[..], &data[..]);
    }

    #[tokio::test]
    async fn test_read_chunked_sets_transfer_type_header() {
        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(40);
        transport.put_file("s3://bucket/file", data.clone());
        let client = test_client(transport.clone(), 1);

        let read = client
            .read_chunked("s3://bucket/file", Some(16))
            .await
            .unwrap();
        assert_eq!(&read[..], &data[..]);

        let request = transport.last_request().unwrap();
        assert!(request.url.ends_with("/chunk"));
        assert!(request.headers.contains(&("transfer-type", "chunked")));
    }

    #[tokio::test]
    async fn test_batched_read_path() {
        struct TransportBatcher(Arc<FakeWorkerTransport>);

        #[async_trait]
        impl BatchFetcher for TransportBatcher {
            async fn fetch_many(&self, requests: Vec<Request>) -> crate::error::Result<Vec<Bytes>> {
                use crate::transport::Transport;
                let mut out = Vec::with_capacity(requests.len());
                for request in requests {
                    out.push(self.0.send(request).await?.body);
                }
                Ok(out)
            }
        }

        let transport = Arc::new(FakeWorkerTransport::new(PAGE_SIZE));
        let data = content(25);
        transport.put_file("s3://bucket/file", data.clone());
        let config = ClientConfig::from_worker_hosts("worker-0").with_page_size(PAGE_SIZE);
        let client = Client::builder(config)
            .with_transport(transport.clone())
            .with_batch_fetcher(Arc::new(TransportBatcher(transport)))
            .build()
            .unwrap();

        let read = client.read_range("s3://bucket/file", 5, 15).await.unwrap();
        assert_eq!(&read[..], &data[5..20]);
    }
}
