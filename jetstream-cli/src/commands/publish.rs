//! `jetstream publish`: render, optionally validate, then publish what changed.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use jetstream_core::{Package, Template, TemplateName};
use jetstream_publish::PublishGate;
use jetstream_renderer::Renderer;
use jetstream_testing::{
    aws_target, region_from_env, signal, InterruptFlag, Target, TestError, Validation,
    ValidationOptions,
};

use super::{render_templates, DestinationArgs, PackageArgs, Rendered};

/// When validation resources are torn down.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanOn {
    Never,
    Failure,
    Pass,
    Always,
}

impl CleanOn {
    pub fn should_clean(self, passed: bool) -> bool {
        match self {
            CleanOn::Never => false,
            CleanOn::Failure => !passed,
            CleanOn::Pass => passed,
            CleanOn::Always => true,
        }
    }
}

/// Arguments for `jetstream publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub source: PackageArgs,

    #[command(flatten)]
    pub destination: DestinationArgs,

    /// Make objects published to S3 publicly readable.
    #[arg(long)]
    pub public: bool,

    /// Launch changed templates as nested stacks before publishing.
    #[arg(long, short = 't')]
    pub test: bool,

    /// Stage the validation templates in the working directory without
    /// creating any stack.
    #[arg(long, short = 'T')]
    pub dry_test: bool,

    /// Keep validation resources regardless of `--clean-on`.
    #[arg(long, short = 'D')]
    pub debug: bool,

    /// Report changes and validate, but do not publish.
    #[arg(long, short = 'n')]
    pub no_publish: bool,

    /// Also publish markdown documentation.
    #[arg(long, short = 'd')]
    pub documentation: bool,

    /// Validation outcome on which resources are cleaned up.
    #[arg(long, value_enum, default_value = "always")]
    pub clean_on: CleanOn,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Passed,
    Failed,
    Interrupted,
}

impl PublishArgs {
    pub fn run(self) -> Result<ExitCode> {
        let package = self.source.load()?;
        let renderer = self.source.renderer()?;
        let gate = self.destination.open_gate(self.public)?;

        let updated_templates = changed_templates(&gate, &package, &renderer, &self.destination)?;
        let updated_documentation = if self.documentation {
            changed_documentation(&gate, &package, &renderer)?
        } else {
            Vec::new()
        };

        if !updated_templates.is_empty() {
            println!(
                "Updated Templates: {}",
                join_names(updated_templates.iter().map(|r| r.template))
            );
        }
        if !updated_documentation.is_empty() {
            println!(
                "Updated Documentation: {}",
                join_names(updated_documentation.iter().map(|(t, _)| *t))
            );
        }
        if updated_templates.is_empty() && updated_documentation.is_empty() {
            println!("No updated templates or documents found");
            return Ok(ExitCode::SUCCESS);
        }

        if (self.test || self.dry_test) && !updated_templates.is_empty() {
            let roots: Vec<TemplateName> =
                updated_templates.iter().map(|r| r.template.name.clone()).collect();
            match self.validate(&package, &renderer, &roots)? {
                Outcome::Passed => {}
                Outcome::Failed => {
                    eprintln!("Testing Failed :(");
                    return Ok(ExitCode::FAILURE);
                }
                Outcome::Interrupted => return Ok(ExitCode::FAILURE),
            }
        }

        if self.no_publish {
            println!("No publish set ... not publishing");
            return Ok(ExitCode::SUCCESS);
        }

        for rendered in &updated_templates {
            gate.publish_file(&rendered.artifact, &rendered.body)
                .with_context(|| format!("failed to publish {}", gate.location(&rendered.artifact)))?;
        }
        for (template, document) in &updated_documentation {
            let name = template.document_name();
            gate.publish_text(&name, document)
                .with_context(|| format!("failed to publish {}", gate.location(&name)))?;
        }
        tracing::info!(
            templates = updated_templates.len(),
            documents = updated_documentation.len(),
            "publish complete"
        );
        Ok(ExitCode::SUCCESS)
    }

    fn validate(
        &self,
        package: &Package,
        renderer: &Renderer,
        roots: &[TemplateName],
    ) -> Result<Outcome> {
        let (target, interrupt) = if self.dry_test {
            let base = std::env::current_dir().context("could not determine working directory")?;
            (Target::Dry { base }, None)
        } else {
            let target = aws_target().context("failed to load AWS configuration")?;
            let flag = signal::install().context("failed to install signal handler")?;
            (target, Some(flag))
        };
        let options = ValidationOptions {
            format: self.destination.format,
            region: region_from_env(),
            interrupt: interrupt.clone(),
            ..ValidationOptions::default()
        };
        let mut validation = Validation::new(package, roots, renderer, target, options)
            .context("failed to prepare validation")?;

        let outcome = drive(&mut validation, self.clean_on, self.debug);
        settle(interrupt.as_ref(), outcome)
    }
}

/// Run `validation` and clean up according to `clean_on`.
fn drive(validation: &mut Validation<'_>, clean_on: CleanOn, debug: bool) -> Result<Outcome> {
    let passed = match validation.run() {
        Ok(passed) => passed,
        Err(TestError::Interrupted) => {
            println!("Interrupt caught... cleaning up the test");
            validation.cleanup().context("cleanup after interrupt failed")?;
            return Ok(Outcome::Interrupted);
        }
        Err(err) => {
            if !debug {
                if let Err(cleanup_err) = validation.cleanup() {
                    tracing::error!(error = %cleanup_err, "cleanup after failed validation failed");
                }
            }
            return Err(err).context("validation run failed");
        }
    };

    if let Some(root) = validation.dry_root() {
        println!("Test templates staged in {}", root.display());
    } else if !debug && clean_on.should_clean(passed) {
        validation.cleanup().context("failed to clean up validation resources")?;
    } else {
        tracing::warn!(
            bucket = %validation.names().bucket,
            stack = %validation.names().stack_name,
            "leaving validation resources in place"
        );
    }

    Ok(if passed { Outcome::Passed } else { Outcome::Failed })
}

/// Disarm the signal watcher so later signals terminate the process. A
/// signal that arrived after polling ended still fails the run.
fn settle(interrupt: Option<&InterruptFlag>, outcome: Result<Outcome>) -> Result<Outcome> {
    let Some(flag) = interrupt else {
        return outcome;
    };
    flag.disarm();
    match outcome {
        Ok(Outcome::Passed | Outcome::Failed) if flag.is_raised() => {
            println!("Interrupt caught... not publishing");
            Ok(Outcome::Interrupted)
        }
        other => other,
    }
}

fn changed_templates<'p>(
    gate: &PublishGate,
    package: &'p Package,
    renderer: &Renderer,
    destination: &DestinationArgs,
) -> Result<Vec<Rendered<'p>>> {
    let mut changed = Vec::new();
    for rendered in render_templates(package, renderer, destination)? {
        let newer = gate
            .newer(&rendered.artifact, &rendered.body)
            .with_context(|| format!("failed to compare {}", gate.location(&rendered.artifact)))?;
        if newer {
            changed.push(rendered);
        }
    }
    Ok(changed)
}

fn changed_documentation<'p>(
    gate: &PublishGate,
    package: &'p Package,
    renderer: &Renderer,
) -> Result<Vec<(&'p Template, String)>> {
    let mut changed = Vec::new();
    for template in package.iter() {
        let document = renderer
            .document(template)
            .with_context(|| format!("failed to document '{}'", template.name))?;
        let name = template.document_name();
        let newer = gate
            .newer_text(&name, &document)
            .with_context(|| format!("failed to compare {}", gate.location(&name)))?;
        if newer {
            changed.push((template, document));
        }
    }
    Ok(changed)
}

fn join_names<'t>(templates: impl Iterator<Item = &'t Template>) -> String {
    templates
        .map(|t| t.name.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
