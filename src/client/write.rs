//! Paged and chunked write paths.
//!
//! Bulk writes split the input into page-sized slices and write them
//! sequentially in index order. Unlike the read path there is no partial
//! success: the first failing page aborts the whole write.

use super::{chunk_url, page_url, Client};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result};
use crate::transport::Request;
use crate::types::WorkerNode;
use bytes::Bytes;

impl Client {
    /// Write one page of the file at `path`.
    ///
    /// The buffer must be exactly one page, except possibly for the final
    /// page of a file. Succeeds only on a 2xx response.
    pub async fn write_page(&self, path: &str, page_index: u64, data: Bytes) -> Result<()> {
        if data.len() > self.config().page_size {
            return Err(Error::Validation(format!(
                "page {page_index} is {} bytes, page size is {}",
                data.len(),
                self.config().page_size
            )));
        }
        let (worker, path_id) = self.locate(path)?;
        self.write_page_to(&worker, &path_id, path, page_index, data)
            .await
    }

    /// Write the full content of the file at `path`.
    ///
    /// Pages are written sequentially in ascending index order; the first
    /// failing page fails the whole write.
    pub async fn write_all(&self, path: &str, data: Bytes) -> Result<()> {
        let (worker, path_id) = self.locate(path)?;
        let page_size = self.config().page_size;

        let mut page_index = 0u64;
        let mut offset = 0usize;
        loop {
            let end = (offset + page_size).min(data.len());
            let page = data.slice(offset..end);
            self.write_page_to(&worker, &path_id, path, page_index, page)
                .await
                .map_err(|e| {
                    e.context(format!(
                        "error writing page {page_index} of {path} to {worker}"
                    ))
                })?;
            page_index += 1;
            offset += page_size;
            if end >= data.len() {
                break;
            }
        }
        Ok(())
    }

    /// Write the full content of the file at `path` as one streaming request
    /// of `chunk_size`-sized increments, bypassing page addressing.
    pub async fn write_chunked(
        &self,
        path: &str,
        data: Bytes,
        chunk_size: Option<usize>,
    ) -> Result<()> {
        let chunk_size = chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(Error::Validation("chunk_size must be positive".into()));
        }
        let (worker, path_id) = self.locate(path)?;
        let request = Request::post(chunk_url(&worker, &path_id))
            .query("filePath", path)
            .query("chunkSize", chunk_size)
            .header("transfer-type", "chunked")
            .header("Content-Type", "application/octet-stream")
            .chunked_body(data, chunk_size);
        self.send_checked(request).await?;
        Ok(())
    }

    async fn write_page_to(
        &self,
        worker: &WorkerNode,
        path_id: &str,
        path: &str,
        page_index: u64,
        data: Bytes,
    ) -> Result<()> {
        let request = Request::post(page_url(worker, path_id, page_index))
            .query("filePath", path)
            .header("Content-Type", "application/octet-stream")
            .body(data);
        self.send_checked(request).await?;
        Ok(())
    }
}
