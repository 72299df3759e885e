//! Jetstream core library: template model, package loading and lifecycle hooks.
//!
//! - [`types`]: template names, test parameters, [`Template`]
//! - [`package`]: load a template package from a root directory
//! - [`hooks`]: [`LifecycleHooks`] and the stock implementations
//! - [`error`]: [`PackageError`]

pub mod error;
pub mod hooks;
pub mod package;
pub mod types;

pub use error::PackageError;
pub use hooks::{DefaultHooks, LifecycleHooks, NoopHooks};
pub use package::{load_at, Package};
pub use types::{
    Template, TemplateName, TestParameter, TestParameterGroup, TestParameterGroups, DEFAULT_GROUP,
    METADATA_KEY, VOLATILE_METADATA_KEY,
};
