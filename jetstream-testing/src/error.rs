use std::path::PathBuf;

use thiserror::Error;

/// Error surface for dependency flattening, staging and stack validation.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("package error: {0}")]
    Package(#[from] jetstream_core::PackageError),

    #[error("render error: {0}")]
    Render(#[from] jetstream_renderer::RenderError),

    #[error("publish error: {0}")]
    Publish(#[from] jetstream_publish::PublishError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template '{0}' is not in the package")]
    UnknownTemplate(String),

    #[error("dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("staging bucket {0} does not exist after creation")]
    BucketMissing(String),

    #[error("stack {0} not found")]
    StackNotFound(String),

    #[error("cloudformation {operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("validation interrupted")]
    Interrupted,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TestError {
    TestError::Io {
        path: path.into(),
        source,
    }
}
