//! Core types used throughout the client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A physical storage worker node, identified by host and HTTP port.
///
/// Immutable once constructed; equality is by host + port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerNode {
    /// Hostname or IP address of the worker.
    pub host: String,
    /// Port of the worker's HTTP server.
    pub http_port: u16,
}

impl WorkerNode {
    /// Create a new worker node.
    pub fn new(host: impl Into<String>, http_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port,
        }
    }
}

impl fmt::Display for WorkerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.http_port)
    }
}

/// Snapshot of remote metadata for a path, as returned by a worker.
///
/// Field names follow the worker's JSON wire format (`mType`, `mName`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStatus {
    /// Either `"file"` or `"directory"`.
    #[serde(rename = "mType")]
    pub kind: String,

    /// Name of the file or directory.
    #[serde(rename = "mName")]
    pub name: String,

    /// Path of the file or directory within the cluster namespace.
    #[serde(rename = "mPath")]
    pub path: String,

    /// Path in the underlying storage system.
    #[serde(rename = "mUfsPath")]
    pub ufs_path: String,

    /// Last modification time in milliseconds.
    #[serde(rename = "mLastModificationTimeMs")]
    pub last_modification_time_ms: i64,

    /// Human-readable file size, e.g. `"75.72KB"`.
    #[serde(rename = "mHumanReadableFileSize")]
    pub human_readable_file_size: String,

    /// Length of the file in bytes, or 0 for a directory.
    #[serde(rename = "mLength")]
    pub length: u64,

    /// Hash of the file content, when the worker reports one.
    #[serde(rename = "mContentHash", default)]
    pub content_hash: Option<String>,
}

/// State of an asynchronous cache-warming (load) job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The load job is in progress.
    Running,
    /// The load job is verifying the loaded data.
    Verifying,
    /// The load job has been stopped.
    Stopped,
    /// The load job completed successfully.
    Succeeded,
    /// The load job failed.
    Failed,
}

impl LoadState {
    /// Whether this state is terminal (the job will make no further progress).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoadState::Stopped | LoadState::Succeeded | LoadState::Failed
        )
    }

    /// Parse a `jobState` string reported by a worker.
    ///
    /// Any value containing `FAILED` as a substring is normalized to
    /// [`LoadState::Failed`], even when it is not an exact enum match. The
    /// remote job API is not under our control and has been observed to
    /// report composite failure states.
    pub fn parse(state: &str) -> Option<LoadState> {
        if state.contains("FAILED") {
            return Some(LoadState::Failed);
        }
        match state {
            "RUNNING" => Some(LoadState::Running),
            "VERIFYING" => Some(LoadState::Verifying),
            "STOPPED" => Some(LoadState::Stopped),
            "SUCCEEDED" => Some(LoadState::Succeeded),
            _ => None,
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadState::Running => "RUNNING",
            LoadState::Verifying => "VERIFYING",
            LoadState::Stopped => "STOPPED",
            LoadState::Succeeded => "SUCCEEDED",
            LoadState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Load job operation selector, serialized into the `opType` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    /// Submit a new load job.
    Submit,
    /// Query the progress of a load job.
    Progress,
    /// Request cancellation of a load job.
    Stop,
}

impl OpType {
    /// Wire value for the `opType` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Submit => "submit",
            OpType::Progress => "progress",
            OpType::Stop => "stop",
        }
    }
}
