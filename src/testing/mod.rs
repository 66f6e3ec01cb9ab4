//! Test utilities: an in-process fake worker behind the [`Transport`] trait.
//!
//! `FakeWorkerTransport` serves the worker REST surface from in-memory file
//! content, records every request it sees, and supports scripted load-job
//! progressions and injected page failures. It lets the paging, routing,
//! and job-control logic be exercised without a network.

use crate::error::Result;
use crate::transport::{Method, Request, RequestBody, Response, Transport};
use crate::types::PathStatus;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};

/// Scripted behavior of the load-job API for one path.
#[derive(Debug, Clone)]
struct LoadScript {
    submit_ok: bool,
    progress: VecDeque<Value>,
}

#[derive(Default)]
struct FakeWorkerState {
    files: HashMap<String, Vec<u8>>,
    failing_pages: HashSet<(String, u64)>,
    load_scripts: HashMap<String, LoadScript>,
    requests: Vec<Request>,
}

/// An in-memory worker serving the cluster HTTP API.
pub struct FakeWorkerTransport {
    page_size: usize,
    state: Mutex<FakeWorkerState>,
}

impl FakeWorkerTransport {
    /// Create a fake worker with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            state: Mutex::new(FakeWorkerState::default()),
        }
    }

    /// Seed a file with the given content.
    pub fn put_file(&self, path: &str, content: Vec<u8>) {
        self.state.lock().files.insert(path.to_string(), content);
    }

    /// Current content of a file, if it exists.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    /// Make page `page_index` of `path` answer with a 500 status.
    pub fn fail_page(&self, path: &str, page_index: u64) {
        self.state
            .lock()
            .failing_pages
            .insert((path.to_string(), page_index));
    }

    /// Script the load-job API for `path`: whether submission is accepted
    /// and the sequence of `jobState` values successive polls observe. The
    /// final state repeats once the sequence is exhausted.
    pub fn script_load(&self, path: &str, submit_ok: bool, states: Vec<&str>) {
        let progress = states
            .into_iter()
            .map(|s| json!({ "jobState": s }))
            .collect();
        self.script_load_raw_inner(path, submit_ok, progress);
    }

    /// Script the load-job API with raw progress payloads.
    pub fn script_load_raw(&self, path: &str, submit_ok: bool, progress: Vec<Value>) {
        self.script_load_raw_inner(path, submit_ok, progress.into_iter().collect());
    }

    fn script_load_raw_inner(&self, path: &str, submit_ok: bool, progress: VecDeque<Value>) {
        self.state.lock().load_scripts.insert(
            path.to_string(),
            LoadScript {
                submit_ok,
                progress,
            },
        );
    }

    /// Total number of requests received.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<Request> {
        self.state.lock().requests.last().cloned()
    }

    /// All recorded requests.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Page read requests seen so far, in arrival order, as
    /// `(page_index, Some((page_offset, page_length)))` for ranged reads and
    /// `(page_index, None)` for full-page reads.
    pub fn page_requests(&self) -> Vec<(u64, Option<(usize, usize)>)> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == Method::Get && r.url.contains("/page/"))
            .map(|r| {
                let index = page_index_of(&r.url);
                let range = match (query(r, "pageOffset"), query(r, "pageLength")) {
                    (Some(o), Some(l)) => Some((o.parse().unwrap(), l.parse().unwrap())),
                    _ => None,
                };
                (index, range)
            })
            .collect()
    }

    /// Page write requests seen so far, as `(page_index, body_length)`.
    pub fn page_writes(&self) -> Vec<(u64, usize)> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == Method::Post && r.url.contains("/page/"))
            .map(|r| {
                let len = match &r.body {
                    RequestBody::Full(b) => b.len(),
                    RequestBody::Chunked { data, .. } => data.len(),
                    RequestBody::Empty => 0,
                };
                (page_index_of(&r.url), len)
            })
            .collect()
    }

    fn status_of(&self, path: &str, content: &[u8]) -> PathStatus {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        PathStatus {
            kind: "file".to_string(),
            name,
            path: path.to_string(),
            ufs_path: path.to_string(),
            last_modification_time_ms: 0,
            human_readable_file_size: format!("{}B", content.len()),
            length: content.len() as u64,
            content_hash: None,
        }
    }

    fn handle(&self, request: &Request) -> Response {
        let path_part = route_of(&request.url);

        if path_part == "/v1/info" {
            let path = query(request, "path").unwrap_or_default();
            let state = self.state.lock();
            return match state.files.get(&path) {
                Some(content) => json_response(json!([self.status_of(&path, content)])),
                None => status_response(404),
            };
        }

        if path_part == "/v1/files" {
            let state = self.state.lock();
            let statuses: Vec<PathStatus> = state
                .files
                .iter()
                .map(|(path, content)| self.status_of(path, content))
                .collect();
            return json_response(serde_json::to_value(statuses).unwrap());
        }

        if path_part == "/v1/load" {
            return self.handle_load(request);
        }

        if path_part.contains("/page/") {
            return self.handle_page(request, &path_part);
        }

        if path_part.ends_with("/chunk") {
            return self.handle_chunk(request);
        }

        if let Some(op) = path_part.rsplit('/').next() {
            match op {
                "mkdir" | "touch" | "mv" | "rm" | "cp" => return status_response(200),
                "tail" | "head" => return self.handle_tail_head(request, op),
                _ => {}
            }
        }

        status_response(404)
    }

    fn handle_load(&self, request: &Request) -> Response {
        let path = query(request, "path").unwrap_or_default();
        let op = query(request, "opType").unwrap_or_default();
        let mut state = self.state.lock();
        let Some(script) = state.load_scripts.get_mut(&path) else {
            return status_response(404);
        };
        match op.as_str() {
            "submit" => json_response(json!({ "success": script.submit_ok })),
            "stop" => json_response(json!({ "success": true })),
            "progress" => {
                let payload = if script.progress.len() > 1 {
                    script.progress.pop_front().unwrap()
                } else {
                    script.progress.front().cloned().unwrap_or(json!({}))
                };
                json_response(payload)
            }
            _ => status_response(400),
        }
    }

    fn handle_page(&self, request: &Request, path_part: &str) -> Response {
        let page_index = page_index_of(path_part);
        let file_path = query(request, "filePath").unwrap_or_default();

        let mut state = self.state.lock();
        if state
            .failing_pages
            .contains(&(file_path.clone(), page_index))
        {
            return status_response(500);
        }

        match request.method {
            Method::Get => {
                let Some(content) = state.files.get(&file_path) else {
                    return status_response(404);
                };
                let offset: usize = query(request, "pageOffset")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                let length: usize = query(request, "pageLength")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(self.page_size);
                let start = (page_index as usize * self.page_size + offset).min(content.len());
                let end = (start + length).min(content.len());
                bytes_response(Bytes::copy_from_slice(&content[start..end]))
            }
            Method::Post => {
                let RequestBody::Full(data) = &request.body else {
                    return status_response(400);
                };
                let start = page_index as usize * self.page_size;
                let file = state.files.entry(file_path).or_default();
                if file.len() < start {
                    file.resize(start, 0);
                }
                file.truncate(start);
                file.extend_from_slice(data);
                status_response(200)
            }
        }
    }

    fn handle_chunk(&self, request: &Request) -> Response {
        let file_path = query(request, "filePath").unwrap_or_default();
        let mut state = self.state.lock();
        match request.method {
            Method::Get => match state.files.get(&file_path) {
                Some(content) => bytes_response(Bytes::copy_from_slice(content)),
                None => status_response(404),
            },
            Method::Post => {
                let data = match &request.body {
                    RequestBody::Full(b) => b.clone(),
                    RequestBody::Chunked { data, .. } => data.clone(),
                    RequestBody::Empty => Bytes::new(),
                };
                state.files.insert(file_path, data.to_vec());
                status_response(200)
            }
        }
    }

    fn handle_tail_head(&self, request: &Request, op: &str) -> Response {
        let file_path = query(request, "filePath").unwrap_or_default();
        let state = self.state.lock();
        let Some(content) = state.files.get(&file_path) else {
            return status_response(404);
        };
        let n = query(request, "numOfBytes")
            .or_else(|| query(request, "numBytes"))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(content.len())
            .min(content.len());
        let slice = if op == "tail" {
            &content[content.len() - n..]
        } else {
            &content[..n]
        };
        bytes_response(Bytes::copy_from_slice(slice))
    }
}

#[async_trait]
impl Transport for FakeWorkerTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        self.state.lock().requests.push(request.clone());
        Ok(self.handle(&request))
    }
}

/// Path component of a URL, without scheme, authority, or query.
fn route_of(url: &str) -> String {
    let after_scheme = url.split("://").nth(1).unwrap_or(url);
    match after_scheme.find('/') {
        Some(i) => after_scheme[i..].to_string(),
        None => "/".to_string(),
    }
}

fn page_index_of(url_or_path: &str) -> u64 {
    url_or_path
        .rsplit('/')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn query(request: &Request, key: &str) -> Option<String> {
    request
        .query
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.clone())
}

fn json_response(value: Value) -> Response {
    Response {
        status: 200,
        body: Bytes::from(serde_json::to_vec(&value).unwrap()),
    }
}

fn bytes_response(body: Bytes) -> Response {
    Response { status: 200, body }
}

fn status_response(status: u16) -> Response {
    Response {
        status,
        body: Bytes::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_of() {
        assert_eq!(route_of("http://w:28080/v1/info"), "/v1/info");
        assert_eq!(route_of("http://w:28080/v1/file/abc/page/3"), "/v1/file/abc/page/3");
        assert_eq!(route_of("http://w:28080"), "/");
    }

    #[test]
    fn test_page_index_of() {
        assert_eq!(page_index_of("/v1/file/abc/page/3"), 3);
        assert_eq!(page_index_of("/v1/file/abc/page/0"), 0);
    }

    #[tokio::test]
    async fn test_page_get_clamps_to_file_length() {
        let worker = FakeWorkerTransport::new(10);
        worker.put_file("s3://b/f", (0..17).collect());

        let request = Request::get("http://w:28080/v1/file/abc/page/1").query("filePath", "s3://b/f");
        let response = worker.send(request).await.unwrap();
        assert_eq!(response.body.len(), 7);
    }
}
