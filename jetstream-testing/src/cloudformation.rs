//! [`StackService`] backed by the CloudFormation API.

use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::Capability;

use jetstream_publish::{AwsContext, S3Client};

use crate::error::TestError;
use crate::service::{StackEvent, StackInfo, StackService};
use crate::validation::Target;

fn backend_err(operation: &'static str, err: impl std::error::Error) -> TestError {
    TestError::Backend {
        operation,
        message: DisplayErrorContext(err).to_string(),
    }
}

/// Blocking CloudFormation client sharing the runtime of an [`AwsContext`].
#[derive(Clone)]
pub struct CloudFormation {
    ctx: AwsContext,
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormation {
    pub fn new(ctx: AwsContext) -> Self {
        let client = aws_sdk_cloudformation::Client::new(ctx.config());
        Self { ctx, client }
    }
}

impl StackService for CloudFormation {
    fn create_stack(&self, name: &str, template_url: &str) -> Result<(), TestError> {
        self.ctx
            .block_on(
                self.client
                    .create_stack()
                    .stack_name(name)
                    .template_url(template_url)
                    .capabilities(Capability::CapabilityIam)
                    .capabilities(Capability::CapabilityNamedIam)
                    .send(),
            )
            .map_err(|e| backend_err("CreateStack", e))?;
        Ok(())
    }

    fn describe_stack(&self, name_or_id: &str) -> Result<StackInfo, TestError> {
        let output = self
            .ctx
            .block_on(self.client.describe_stacks().stack_name(name_or_id).send())
            .map_err(|e| backend_err("DescribeStacks", e))?;
        let stack = output
            .stacks()
            .first()
            .ok_or_else(|| TestError::StackNotFound(name_or_id.to_owned()))?;
        Ok(StackInfo {
            name: stack.stack_name().unwrap_or(name_or_id).to_owned(),
            status: stack
                .stack_status()
                .map(|s| s.as_str().to_owned())
                .unwrap_or_default(),
            reason: stack.stack_status_reason().map(str::to_owned),
        })
    }

    fn list_stack_ids(&self) -> Result<Vec<String>, TestError> {
        self.ctx.block_on(async {
            let mut ids = Vec::new();
            let mut pages = self.client.list_stacks().into_paginator().send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| backend_err("ListStacks", e))?;
                ids.extend(
                    page.stack_summaries()
                        .iter()
                        .filter_map(|s| s.stack_id().map(str::to_owned)),
                );
            }
            Ok(ids)
        })
    }

    fn failed_events(&self, name_or_id: &str) -> Result<Vec<StackEvent>, TestError> {
        let output = self
            .ctx
            .block_on(self.client.describe_stack_events().stack_name(name_or_id).send())
            .map_err(|e| backend_err("DescribeStackEvents", e))?;
        Ok(output
            .stack_events()
            .iter()
            .filter_map(|event| {
                let status = event.resource_status()?.as_str();
                status.contains("FAILED").then(|| StackEvent {
                    event_id: event.event_id().unwrap_or_default().to_owned(),
                    status: status.to_owned(),
                    reason: event.resource_status_reason().map(str::to_owned),
                })
            })
            .collect())
    }

    fn delete_stack(&self, name: &str) -> Result<(), TestError> {
        self.ctx
            .block_on(self.client.delete_stack().stack_name(name).send())
            .map_err(|e| backend_err("DeleteStack", e))?;
        tracing::info!(stack = name, "requested stack deletion");
        Ok(())
    }
}

/// Live target using the default AWS credential chain.
pub fn aws_target() -> Result<Target, TestError> {
    let ctx = AwsContext::load()?;
    Ok(Target::Live {
        stacks: Box::new(CloudFormation::new(ctx.clone())),
        staging: Box::new(S3Client::new(ctx)),
    })
}
