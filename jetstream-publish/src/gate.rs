//! The publish gate: decides whether a destination copy needs updating and
//! writes it when it does.
//!
//! ## `newer` decision table
//!
//! | Destination state                             | Result  |
//! |-----------------------------------------------|---------|
//! | absent                                        | `true`  |
//! | decodes, differs once volatile data stripped  | `true`  |
//! | decodes, identical once volatile data stripped| `false` |
//! | does not decode, raw bytes differ             | `true`  |
//! | does not decode, raw bytes identical          | `false` |
//! | backend error                                 | error   |
//! | candidate does not decode                     | error   |

use std::path::PathBuf;

use serde_json::Value;

use jetstream_renderer::OutputFormat;

use crate::aws::AwsContext;
use crate::compare::{objects_match, strip_volatile};
use crate::diff::unified_diff;
use crate::error::PublishError;
use crate::local::LocalStore;
use crate::s3::{CannedAcl, S3Address, S3Client, S3Store};

// ---------------------------------------------------------------------------
// StorageBackend
// ---------------------------------------------------------------------------

/// Byte storage addressed by artifact name.
pub trait StorageBackend {
    /// Human-readable location of `name`, used in logs and errors.
    fn location(&self, name: &str) -> String;

    /// Stored bytes, or `None` when nothing exists under `name`.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, PublishError>;

    fn write(&self, name: &str, contents: &[u8]) -> Result<(), PublishError>;
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// Where artifacts are published, chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Local(PathBuf),
    S3(S3Address),
}

impl Destination {
    /// Destination from an address: `s3://...` selects S3, anything else is
    /// a local directory.
    pub fn parse(address: &str) -> Result<Self, PublishError> {
        if address.starts_with("s3://") {
            Ok(Destination::S3(address.parse()?))
        } else {
            Ok(Destination::Local(PathBuf::from(address)))
        }
    }

    /// Open the backing store. `public` only affects S3 writes.
    pub fn open(&self, public: bool) -> Result<Box<dyn StorageBackend>, PublishError> {
        match self {
            Destination::Local(root) => Ok(Box::new(LocalStore::new(root)?)),
            Destination::S3(address) => {
                let client = S3Client::new(AwsContext::load()?);
                Ok(Box::new(S3Store::new(
                    client,
                    address.clone(),
                    CannedAcl::from_public(public),
                )))
            }
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Local(root) => write!(f, "{}", root.display()),
            Destination::S3(address) => write!(f, "{address}"),
        }
    }
}

// ---------------------------------------------------------------------------
// PublishGate
// ---------------------------------------------------------------------------

/// Change-aware publisher over a [`StorageBackend`].
pub struct PublishGate {
    backend: Box<dyn StorageBackend>,
    format: OutputFormat,
}

impl PublishGate {
    /// `format` is the structured encoding artifacts are decoded with.
    pub fn new(backend: Box<dyn StorageBackend>, format: OutputFormat) -> Self {
        Self { backend, format }
    }

    pub fn location(&self, name: &str) -> String {
        self.backend.location(name)
    }

    /// Whether anything is stored under `name`.
    pub fn exists(&self, name: &str) -> Result<bool, PublishError> {
        Ok(self.backend.read(name)?.is_some())
    }

    /// Whether `latest` differs meaningfully from what is stored under `name`.
    pub fn newer(&self, name: &str, latest: &str) -> Result<bool, PublishError> {
        let location = self.backend.location(name);
        let Some(existing_bytes) = self.backend.read(name)? else {
            tracing::debug!(location = %location, "no published copy");
            return Ok(true);
        };

        let mut existing = match decode(&existing_bytes, self.format) {
            Ok(value) => value,
            Err(reason) => {
                tracing::debug!(location = %location, reason = %reason, "published copy does not decode, comparing raw bytes");
                return Ok(latest.as_bytes() != existing_bytes.as_slice());
            }
        };
        let mut candidate =
            decode(latest.as_bytes(), self.format).map_err(|message| PublishError::CandidateDecode {
                name: name.to_owned(),
                format: self.format.to_string(),
                message,
            })?;

        strip_volatile(&mut existing, &mut candidate);
        Ok(!objects_match(&candidate, &existing))
    }

    /// Write `contents` when [`newer`](Self::newer) says so.
    ///
    /// Returns whether a write happened.
    pub fn publish_file(&self, name: &str, contents: &str) -> Result<bool, PublishError> {
        if !self.newer(name, contents)? {
            return Ok(false);
        }
        self.write(name, contents)?;
        Ok(true)
    }

    /// Raw byte comparison, for artifacts that are not structured documents.
    pub fn newer_text(&self, name: &str, latest: &str) -> Result<bool, PublishError> {
        Ok(match self.backend.read(name)? {
            Some(existing) => existing.as_slice() != latest.as_bytes(),
            None => true,
        })
    }

    pub fn publish_text(&self, name: &str, contents: &str) -> Result<bool, PublishError> {
        if !self.newer_text(name, contents)? {
            return Ok(false);
        }
        self.write(name, contents)?;
        Ok(true)
    }

    /// Unified diff of the stored copy against `latest`, or `None` when
    /// [`newer`](Self::newer) reports no meaningful change.
    pub fn diff(&self, name: &str, latest: &str) -> Result<Option<String>, PublishError> {
        if !self.newer(name, latest)? {
            return Ok(None);
        }
        let existing = self
            .backend
            .read(name)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        Ok(Some(unified_diff(name, &existing, latest)))
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), PublishError> {
        self.backend.write(name, contents.as_bytes())?;
        tracing::debug!(location = %self.backend.location(name), bytes = contents.len(), "published artifact");
        Ok(())
    }
}

fn decode(bytes: &[u8], format: OutputFormat) -> Result<Value, String> {
    match format {
        OutputFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::from_slice(bytes).map_err(|e| e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
