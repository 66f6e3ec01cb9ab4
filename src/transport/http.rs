//! reqwest-backed production transport.

use super::{Method, Request, RequestBody, Response, Transport};
use crate::error::{Error, Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;

/// HTTP transport over a shared reqwest connection pool.
///
/// The pool is owned by the client for its entire lifetime and torn down
/// when the last handle is dropped; there is no finalizer-driven teardown.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a connection pool sized to `concurrency`.
    pub fn new(concurrency: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(concurrency)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let url = request.url.clone();
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        let mut builder = builder.query(&request.query);
        for (key, value) in &request.headers {
            builder = builder.header(*key, *value);
        }
        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Full(bytes) => builder.body(bytes),
            RequestBody::Chunked { data, chunk_size } => {
                builder.body(reqwest::Body::wrap_stream(chunk_stream(data, chunk_size)))
            }
        };

        let response = builder.send().await.map_err(|e| {
            TransportError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::RequestFailed {
                url,
                reason: format!("failed to read body: {e}"),
            })?;

        Ok(Response { status, body })
    }
}

/// A finite, non-restartable stream of `chunk_size`-byte slices of `data`.
fn chunk_stream(
    data: Bytes,
    chunk_size: usize,
) -> impl futures::Stream<Item = std::result::Result<Bytes, std::convert::Infallible>> {
    let chunk_size = chunk_size.max(1);
    futures::stream::unfold(data, move |mut rest| async move {
        if rest.is_empty() {
            return None;
        }
        let take = rest.len().min(chunk_size);
        let chunk = rest.split_to(take);
        Some((Ok(chunk), rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_chunk_stream_slices_in_order() {
        let data = Bytes::from_static(b"abcdefghij");
        let chunks: Vec<Bytes> = chunk_stream(data, 4).map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec![
            Bytes::from_static(b"abcd"),
            Bytes::from_static(b"efgh"),
            Bytes::from_static(b"ij"),
        ]);
    }

    #[tokio::test]
    async fn test_chunk_stream_empty_input() {
        let chunks: Vec<Bytes> = chunk_stream(Bytes::new(), 4)
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert!(chunks.is_empty());
    }
}
