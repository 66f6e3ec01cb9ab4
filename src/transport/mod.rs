//! Transport-agnostic HTTP seam.
//!
//! The routing, paging, and job-control logic is written against the
//! [`Transport`] trait rather than a concrete HTTP library, so the same core
//! serves the async client, the blocking facade, and in-process test
//! transports. [`http::HttpTransport`] is the production reqwest adapter.

mod http;

pub use http::HttpTransport;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// HTTP method subset used by the worker API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// How a request body is shipped to the worker.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// The full body in one piece.
    Full(Bytes),
    /// A streaming body produced as consecutive `chunk_size`-byte slices of
    /// `data`. The sequence is finite and consumed exactly once.
    Chunked { data: Bytes, chunk_size: usize },
}

/// A worker API request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL without query parameters.
    pub url: String,
    /// Query parameters, appended (and encoded) by the transport.
    pub query: Vec<(&'static str, String)>,
    /// Extra headers, e.g. `transfer-type: chunked`.
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: RequestBody,
}

impl Request {
    /// Build a GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Build a POST request for `url`.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Append a header.
    pub fn header(mut self, key: &'static str, value: &'static str) -> Self {
        self.headers.push((key, value));
        self
    }

    /// Attach a full body.
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = RequestBody::Full(body);
        self
    }

    /// Attach a chunked streaming body.
    pub fn chunked_body(mut self, data: Bytes, chunk_size: usize) -> Self {
        self.body = RequestBody::Chunked { data, chunk_size };
        self
    }
}

/// A worker API response, fully collected.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    /// Whether the status is in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability required from an HTTP transport: send one request, return the
/// collected response. Implementations own connection pooling and any
/// timeout policy; each request here is independent and idempotent at the
/// protocol level.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}
