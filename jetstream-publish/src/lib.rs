//! # jetstream-publish
//!
//! Change-aware publishing of rendered templates.
//!
//! A [`PublishGate`] wraps a [`StorageBackend`] (a local directory or an S3
//! prefix) and only writes an artifact when it differs structurally from the
//! stored copy, ignoring mapping key order and the volatile
//! `Metadata.Jetstream` block.

pub mod aws;
pub mod compare;
pub mod diff;
pub mod error;
pub mod gate;
pub mod local;
pub mod s3;

pub use aws::AwsContext;
pub use compare::{objects_match, strip_volatile};
pub use error::PublishError;
pub use gate::{Destination, PublishGate, StorageBackend};
pub use local::LocalStore;
pub use s3::{CannedAcl, S3Address, S3Client, S3Store};
