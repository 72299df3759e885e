//! Validation of changed templates against a live CloudFormation account.
//!
//! Changed templates and their dependencies are staged in a transient S3
//! bucket, launched as nested stacks under one parent stack, polled until
//! they settle and then torn down.

pub mod cloudformation;
mod error;
pub mod flatten;
pub mod names;
pub mod parent;
pub mod service;
pub mod signal;
pub mod validation;

pub use cloudformation::{aws_target, CloudFormation};
pub use error::TestError;
pub use flatten::flatten;
pub use names::{region_from_env, StagingNames, PARENT_TEMPLATE};
pub use service::{StackEvent, StackInfo, StackService, StagingStore};
pub use signal::InterruptFlag;
pub use validation::{Target, Validation, ValidationOptions, ValidationState};
