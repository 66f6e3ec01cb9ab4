//! Error types for the cluster client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cluster client.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed path or argument. Raised locally, before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The hash ring returned an unusable worker set.
    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    /// HTTP-level failure: connection error or non-2xx status.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Well-formed response missing an expected field or shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Attach operation context (path, worker, page) to a failure without
    /// changing its class. Transport failures stay `Error::Transport` so
    /// callers can still match on the taxonomy.
    pub(crate) fn context(self, context: impl Into<String>) -> Error {
        match self {
            Error::Transport(source) => Error::Transport(TransportError::Operation {
                context: context.into(),
                source: Box::new(source),
            }),
            Error::Protocol(msg) => Error::Protocol(format!("{}: {msg}", context.into())),
            Error::Internal(msg) => Error::Internal(format!("{}: {msg}", context.into())),
            other => other,
        }
    }
}

/// Worker routing errors. These indicate a topology inconsistency and are
/// never retried.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// No workers are registered on the ring.
    #[error("hash ring is empty, no workers available")]
    EmptyRing,

    /// The ring returned a different number of workers than requested.
    #[error("expected {expected} worker(s) for path {path}, ring returned {actual}")]
    UnexpectedWorkerCount {
        path: String,
        expected: usize,
        actual: usize,
    },
}

/// HTTP transport errors, wrapped with operation context by the caller.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The worker answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be decoded as the expected shape.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// A transport failure annotated with the operation it interrupted
    /// (path, worker, page index).
    #[error("{context}: {source}")]
    Operation {
        context: String,
        #[source]
        source: Box<TransportError>,
    },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Protocol(format!("invalid JSON payload: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_transport_class() {
        let err = Error::Transport(TransportError::Status {
            url: "http://worker-0:28080/v1/file/abc/page/0".into(),
            status: 500,
        });
        let wrapped = err.context("error reading page 0 of s3://bucket/file");
        assert!(matches!(
            wrapped,
            Error::Transport(TransportError::Operation { .. })
        ));
        let message = wrapped.to_string();
        assert!(message.contains("page 0"));
        assert!(message.contains("500"));
    }

    #[test]
    fn test_context_leaves_validation_untouched() {
        let err = Error::Validation("bad path".into());
        assert!(matches!(err.context("reading"), Error::Validation(_)));
    }
}
