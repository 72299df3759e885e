//! Error types for jetstream-publish.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from comparing and publishing artifacts.
#[derive(Debug, Error)]
pub enum PublishError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The freshly generated artifact could not be decoded.
    #[error("failed to decode generated artifact {name} as {format}: {message}")]
    CandidateDecode {
        name: String,
        format: String,
        message: String,
    },

    /// A remote store call failed (network, auth, throttling).
    #[error("storage backend error at {location}: {message}")]
    Backend { location: String, message: String },

    /// `s3://` address did not match `s3://bucket[/prefix]`.
    #[error("invalid bucket path {0}, must look like s3://bucket[/prefix]")]
    InvalidAddress(String),

    /// The async runtime used to drive AWS calls could not start.
    #[error("failed to start AWS runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Convenience constructor for [`PublishError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`PublishError::Backend`].
pub fn backend_err(location: impl Into<String>, message: impl ToString) -> PublishError {
    PublishError::Backend {
        location: location.into(),
        message: message.to_string(),
    }
}
