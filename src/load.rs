//! Load job control: submit, poll, and drive cache-warming jobs.
//!
//! A load job asynchronously prefetches an underlying-storage path onto the
//! worker responsible for it. Jobs move `RUNNING -> {VERIFYING, SUCCEEDED,
//! FAILED, STOPPED}` and `VERIFYING -> {SUCCEEDED, FAILED, STOPPED}`;
//! `SUCCEEDED`, `FAILED` and `STOPPED` are terminal. Load is best-effort:
//! the full lifecycle reports success or failure as a boolean and never
//! raises past submission-time validation.

use crate::client::{load_url, Client};
use crate::error::{Error, Result};
use crate::transport::Request;
use crate::types::{LoadState, OpType, WorkerNode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

impl Client {
    /// Submit a load job for `path`. Returns whether the worker accepted
    /// the submission.
    pub async fn submit_load(&self, path: &str, verbose: bool) -> Result<bool> {
        crate::uri::validate_path(path)?;
        let worker = self.router().preferred_worker(path)?;
        self.load_op_submit(&worker, path, verbose).await
    }

    /// Query the progress of the load job for `path`.
    ///
    /// Returns the parsed job state together with the raw response payload.
    pub async fn load_progress(&self, path: &str, verbose: bool) -> Result<(LoadState, Value)> {
        crate::uri::validate_path(path)?;
        let worker = self.router().preferred_worker(path)?;
        self.load_op_progress(&worker, path, verbose).await
    }

    /// Request cancellation of the load job for `path`.
    pub async fn stop_load(&self, path: &str) -> Result<bool> {
        crate::uri::validate_path(path)?;
        let worker = self.router().preferred_worker(path)?;
        let request = Request::get(load_url(&worker))
            .query("path", path)
            .query("opType", OpType::Stop.as_str());
        let response = self.send_checked(request).await?;
        parse_success_field(&response.body)
    }

    /// Load `path` onto its worker, polling until a terminal state.
    ///
    /// Polls every configured interval (10 s by default). With a timeout,
    /// the next sleep only happens when at least one full interval remains
    /// before the deadline; otherwise the load reports failure without a
    /// further poll. Without a timeout, polling continues until the job
    /// reaches a terminal state.
    ///
    /// Warm-up is best-effort: terminal failure states, timeouts, and any
    /// transport or protocol error all yield `Ok(false)` with a logged
    /// diagnostic. Only path validation and worker resolution can fail the
    /// call itself.
    pub async fn load(&self, path: &str, timeout: Option<Duration>, verbose: bool) -> Result<bool> {
        crate::uri::validate_path(path)?;
        let worker = self.router().preferred_worker(path)?;
        Ok(self.drive_load(&worker, path, timeout, verbose).await)
    }

    async fn drive_load(
        &self,
        worker: &WorkerNode,
        path: &str,
        timeout: Option<Duration>,
        verbose: bool,
    ) -> bool {
        let poll_interval = self.config().load_poll_interval;
        let deadline = timeout.map(|t| Instant::now() + t);

        match self.load_op_submit(worker, path, verbose).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(path, %worker, "load submission rejected");
                return false;
            }
            Err(e) => {
                tracing::warn!(path, %worker, error = %e, "load submission failed");
                return false;
            }
        }

        loop {
            let (state, content) = match self.load_op_progress(worker, path, verbose).await {
                Ok(progress) => progress,
                Err(e) => {
                    tracing::warn!(path, %worker, error = %e, "load progress poll failed");
                    return false;
                }
            };
            match state {
                LoadState::Succeeded => return true,
                LoadState::Failed => {
                    tracing::error!(path, response = %content, "load job failed");
                    return false;
                }
                LoadState::Stopped => {
                    tracing::warn!(path, response = %content, "load job was stopped");
                    return false;
                }
                LoadState::Running | LoadState::Verifying => {}
            }

            let can_sleep = match deadline {
                None => true,
                Some(deadline) => deadline.saturating_duration_since(Instant::now()) >= poll_interval,
            };
            if !can_sleep {
                tracing::debug!(path, "load did not finish within timeout");
                return false;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn load_op_submit(&self, worker: &WorkerNode, path: &str, verbose: bool) -> Result<bool> {
        let request = Request::get(load_url(worker))
            .query("path", path)
            .query("opType", OpType::Submit.as_str())
            .query("verbose", verbose);
        let response = self.send_checked(request).await?;
        parse_success_field(&response.body)
    }

    async fn load_op_progress(
        &self,
        worker: &WorkerNode,
        path: &str,
        verbose: bool,
    ) -> Result<(LoadState, Value)> {
        let request = Request::get(load_url(worker))
            .query("path", path)
            .query("opType", OpType::Progress.as_str())
            .query("verbose", verbose);
        let response = self.send_checked(request).await?;
        let content: Value = serde_json::from_slice(&response.body)?;
        let state = content
            .get("jobState")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Protocol(
                    "the field 'jobState' is missing from the load progress response".into(),
                )
            })?;
        let state = LoadState::parse(state)
            .ok_or_else(|| Error::Protocol(format!("unknown jobState value: {state}")))?;
        Ok((state, content))
    }
}

fn parse_success_field(body: &[u8]) -> Result<bool> {
    let content: Value = serde_json::from_slice(body)?;
    content
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| {
            Error::Protocol("the field 'success' is missing from the load response".into())
        })
}
