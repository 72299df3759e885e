//! Blocking bridge to the AWS SDK.
//!
//! The SDK is async; everything above it is synchronous. [`AwsContext`] owns
//! a current-thread tokio runtime and drives each call with `block_on`.

use std::future::Future;
use std::sync::Arc;

use aws_config::{BehaviorVersion, SdkConfig};
use tokio::runtime::Runtime;

use crate::error::PublishError;

/// Shared SDK configuration plus the runtime that executes SDK futures.
#[derive(Clone)]
pub struct AwsContext {
    runtime: Arc<Runtime>,
    config: SdkConfig,
}

impl AwsContext {
    /// Resolve credentials and region through the default provider chain.
    pub fn load() -> Result<Self, PublishError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(PublishError::Runtime)?;
        let config = runtime.block_on(aws_config::load_defaults(BehaviorVersion::latest()));
        tracing::debug!(
            region = ?config.region().map(|r| r.as_ref().to_owned()),
            "loaded AWS configuration"
        );
        Ok(Self {
            runtime: Arc::new(runtime),
            config,
        })
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Run `future` to completion on the private runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
