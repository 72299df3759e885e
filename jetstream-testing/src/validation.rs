//! Validation runs: stand up every changed template (and its dependencies)
//! as nested stacks, wait for a terminal status, then tear everything down.
//!
//! ```text
//! Init ─┬─ dry ──> Staging ──> Skipped
//!       └─ live ─> Staging ──> StackCreating ──> Polling ─┬─> Succeeded
//!                                                         ├─> Failed
//!                                                         └─> RollbackFailed
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use jetstream_core::{Package, Template, TemplateName};
use jetstream_publish::{LocalStore, PublishGate, StorageBackend};
use jetstream_renderer::{GenerateOptions, OutputFormat, Renderer};

use crate::error::TestError;
use crate::flatten::flatten;
use crate::names::{StagingNames, DEFAULT_POLL_INTERVAL, PARENT_TEMPLATE};
use crate::parent::parent_template;
use crate::service::{StackInfo, StackService, StagingStore};
use crate::signal::InterruptFlag;

/// Longest uninterrupted sleep between interrupt checks.
const INTERRUPT_CHECK: Duration = Duration::from_millis(200);

/// Where a validation run stages and executes.
pub enum Target {
    /// Write the staged templates under `<base>/<bucket name>`; nothing is
    /// provisioned.
    Dry { base: PathBuf },
    Live {
        stacks: Box<dyn StackService>,
        staging: Box<dyn StagingStore>,
    },
}

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Encoding of staged child templates.
    pub format: OutputFormat,
    pub poll_interval: Duration,
    /// Staging bucket location constraint; `None` for us-east-1.
    pub region: Option<String>,
    pub interrupt: Option<InterruptFlag>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            poll_interval: DEFAULT_POLL_INTERVAL,
            region: None,
            interrupt: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Init,
    Staging,
    StackCreating,
    Polling,
    /// Dry run finished staging.
    Skipped,
    Succeeded,
    Failed,
    /// Rollback itself failed; the stack needs manual attention.
    RollbackFailed,
}

/// One validation run over a flattened template set.
pub struct Validation<'r> {
    templates: Vec<Template>,
    renderer: &'r Renderer,
    names: StagingNames,
    target: Target,
    options: ValidationOptions,
    state: ValidationState,
    bucket_created: bool,
    stack_created: bool,
}

impl<'r> Validation<'r> {
    /// Flatten `roots` and their dependencies, running `prepare_test` on each.
    pub fn new(
        package: &Package,
        roots: &[TemplateName],
        renderer: &'r Renderer,
        target: Target,
        options: ValidationOptions,
    ) -> Result<Self, TestError> {
        let templates = flatten(package, roots, renderer.hooks())?;
        Ok(Self {
            templates,
            renderer,
            names: StagingNames::generate(),
            target,
            options,
            state: ValidationState::Init,
            bucket_created: false,
            stack_created: false,
        })
    }

    /// Replace the generated staging names.
    pub fn with_names(mut self, names: StagingNames) -> Self {
        self.names = names;
        self
    }

    pub fn names(&self) -> &StagingNames {
        &self.names
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// Staging directory of a dry run.
    pub fn dry_root(&self) -> Option<PathBuf> {
        match &self.target {
            Target::Dry { base } => Some(base.join(&self.names.bucket)),
            Target::Live { .. } => None,
        }
    }

    /// Parent template as JSON.
    pub fn parent_template(&self) -> Result<String, TestError> {
        Ok(serde_json::to_string_pretty(&parent_template(
            &self.templates,
            &self.names,
        ))?)
    }

    /// Stage and run. `Ok(true)` iff no rollback status was observed; dry
    /// runs return `Ok(true)` once staging succeeds.
    ///
    /// A raised interrupt flag is honoured before the bucket is created,
    /// between uploads, before the stack is created and while polling.
    pub fn run(&mut self) -> Result<bool, TestError> {
        self.check_interrupt()?;
        self.state = ValidationState::Staging;
        let backend = self.prepare_staging()?;
        self.upload(PublishGate::new(backend, self.options.format))?;

        let Target::Live { stacks, .. } = &self.target else {
            self.state = ValidationState::Skipped;
            tracing::info!(root = ?self.dry_root(), "dry run staged templates, skipping stack creation");
            return Ok(true);
        };

        self.check_interrupt()?;
        self.state = ValidationState::StackCreating;
        tracing::info!(stack = %self.names.stack_name, "creating stack");
        stacks.create_stack(
            &self.names.stack_name,
            &self.names.template_url(PARENT_TEMPLATE),
        )?;
        self.stack_created = true;

        self.state = ValidationState::Polling;
        let (passed, state) = self.wait_results()?;
        self.state = state;
        Ok(passed)
    }

    /// Delete staged objects, the bucket and the stack. No-op for dry runs.
    pub fn cleanup(&mut self) -> Result<(), TestError> {
        let Target::Live { stacks, staging } = &self.target else {
            return Ok(());
        };
        let bucket = &self.names.bucket;

        if self.bucket_created {
            let keys = staging.list_keys(bucket)?;
            tracing::info!(bucket = %bucket, objects = keys.len(), "deleting staging bucket");
            staging.delete_keys(bucket, &keys)?;
            staging.delete_bucket(bucket)?;
            self.bucket_created = false;
        }
        if self.stack_created {
            tracing::info!(stack = %self.names.stack_name, "deleting stack");
            stacks.delete_stack(&self.names.stack_name)?;
            self.stack_created = false;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    fn prepare_staging(&mut self) -> Result<Box<dyn StorageBackend>, TestError> {
        match &self.target {
            Target::Dry { base } => {
                let root = base.join(&self.names.bucket);
                Ok(Box::new(LocalStore::new(root)?))
            }
            Target::Live { staging, .. } => {
                let bucket = &self.names.bucket;
                tracing::info!(bucket = %bucket, region = ?self.options.region, "creating bucket");
                staging.create_bucket(bucket, self.options.region.as_deref())?;
                self.bucket_created = true;
                if !staging.bucket_exists(bucket)? {
                    return Err(TestError::BucketMissing(bucket.clone()));
                }
                Ok(staging.backend(bucket))
            }
        }
    }

    fn upload(&self, gate: PublishGate) -> Result<(), TestError> {
        tracing::info!(templates = self.templates.len(), "uploading files");
        self.check_interrupt()?;
        gate.publish_file(PARENT_TEMPLATE, &self.parent_template()?)?;

        let options = GenerateOptions::testing(self.options.format);
        for template in &self.templates {
            self.check_interrupt()?;
            tracing::info!(template = %template.name, "uploading file");
            let body = self.renderer.generate(template, &options)?;
            gate.publish_file(&template.name.0, &body)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    fn stacks(&self) -> Option<&dyn StackService> {
        match &self.target {
            Target::Live { stacks, .. } => Some(stacks.as_ref()),
            Target::Dry { .. } => None,
        }
    }

    fn wait_results(&self) -> Result<(bool, ValidationState), TestError> {
        let Some(stacks) = self.stacks() else {
            return Ok((true, ValidationState::Skipped));
        };
        let stack_name = &self.names.stack_name;
        let mut failed = false;

        loop {
            self.check_interrupt()?;
            let info = stacks.describe_stack(stack_name)?;
            let status = info.status.as_str();
            tracing::info!(stack = %stack_name, status = %status, "stack status");

            if status.contains("ROLLBACK") && !failed {
                failed = true;
                self.log_failed_stacks(stacks, &info)?;
            }
            if status.contains("ROLLBACK_FAILED") {
                tracing::error!(stack = %stack_name, "stack rollback failed, fix manually");
                return Ok((false, ValidationState::RollbackFailed));
            }
            if status.contains("COMPLETE") {
                break;
            }

            tracing::debug!(stack = %stack_name, "stack is not complete");
            self.sleep()?;
        }

        let state = if failed {
            ValidationState::Failed
        } else {
            ValidationState::Succeeded
        };
        Ok((!failed, state))
    }

    /// Log the parent's failure, then the FAILED events of every stack whose
    /// id carries the run's stack name.
    fn log_failed_stacks(&self, stacks: &dyn StackService, parent: &StackInfo) -> Result<(), TestError> {
        let stack_name = &self.names.stack_name;
        log_failed_stack(stacks, stack_name, parent)?;
        for id in stacks.list_stack_ids()? {
            if id.contains(stack_name.as_str()) {
                let info = stacks.describe_stack(&id)?;
                log_failed_stack(stacks, &id, &info)?;
            }
        }
        Ok(())
    }

    fn check_interrupt(&self) -> Result<(), TestError> {
        match &self.options.interrupt {
            Some(flag) if flag.is_raised() => Err(TestError::Interrupted),
            _ => Ok(()),
        }
    }

    fn sleep(&self) -> Result<(), TestError> {
        let deadline = Instant::now() + self.options.poll_interval;
        loop {
            self.check_interrupt()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(INTERRUPT_CHECK));
        }
    }
}

fn log_failed_stack(
    stacks: &dyn StackService,
    name_or_id: &str,
    info: &StackInfo,
) -> Result<(), TestError> {
    tracing::error!(
        stack = %info.name,
        status = %info.status,
        reason = info.reason.as_deref().unwrap_or("No reason found"),
        "stack failure"
    );
    for event in stacks.failed_events(name_or_id)? {
        tracing::error!(
            stack = name_or_id,
            event = %event.event_id,
            status = %event.status,
            reason = event.reason.as_deref().unwrap_or_default(),
            "failed stack event"
        );
    }
    Ok(())
}
