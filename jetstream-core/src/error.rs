//! Error types for jetstream-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or preparing a template package.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// JSON parse error on load, with the offending file.
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The package root did not exist.
    #[error("template package not found at {path}")]
    PackageNotFound { path: PathBuf },

    /// Two definition files declared the same template name.
    #[error("duplicate template name '{name}' in {path}")]
    DuplicateTemplate { name: String, path: PathBuf },

    /// A required template attribute was missing or empty.
    #[error("missing required template attribute '{attribute}' on {template}")]
    MissingAttribute { template: String, attribute: &'static str },

    /// A test parameter referenced a template that is not in the package.
    #[error("template '{template}' depends on unknown template '{dependency}'")]
    UnknownDependency { template: String, dependency: String },

    /// `TestParameterGroups::remove` was called with an unknown group.
    #[error("no test parameter group named '{0}' found")]
    NoSuchGroup(String),

    /// A test parameter value failed tera expansion.
    #[error("failed to expand test parameter '{parameter}': {source}")]
    Expand {
        parameter: String,
        #[source]
        source: tera::Error,
    },
}

/// Convenience constructor for [`PackageError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PackageError {
    PackageError::Io {
        path: path.into(),
        source,
    }
}
