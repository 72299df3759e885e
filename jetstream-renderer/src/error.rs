//! Error types for jetstream-renderer.

use std::path::PathBuf;

use thiserror::Error;

use jetstream_core::PackageError;

/// All errors that can arise from rendering templates and documentation.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error (documentation).
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON encoding error.
    #[error("failed to build JSON for template {template}: {source}")]
    Json {
        template: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML encoding error.
    #[error("failed to build YAML for template {template}: {source}")]
    Yaml {
        template: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// `--metadata` was requested but the template's `Metadata` is not a mapping.
    #[error("template {template} has a non-mapping Metadata block")]
    InvalidMetadata { template: String },

    /// A lifecycle hook or template validation failed.
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Filesystem error while loading documentation template overrides.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
