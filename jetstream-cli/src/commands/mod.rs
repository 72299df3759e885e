//! Subcommands and the argument groups they share.

pub mod diff;
pub mod publish;
pub mod status;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use jetstream_core::{load_at, DefaultHooks, Package, Template};
use jetstream_publish::{Destination, PublishGate};
use jetstream_renderer::{GenerateOptions, OutputFormat, Renderer};

// ---------------------------------------------------------------------------
// Package source
// ---------------------------------------------------------------------------

/// Where templates are loaded from and how documentation is rendered.
#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Template package directory.
    #[arg(long, short = 'm', env = "JETSTREAM_PACKAGE")]
    pub package: PathBuf,

    /// Directory of `.tera` files overriding the embedded documentation template.
    #[arg(long)]
    pub template_dir: Option<PathBuf>,
}

impl PackageArgs {
    pub fn load(&self) -> Result<Package> {
        load_at(&self.package).with_context(|| {
            format!("failed to load template package at {}", self.package.display())
        })
    }

    pub fn renderer(&self) -> Result<Renderer> {
        Renderer::with_hooks(self.template_dir.as_deref(), Box::new(DefaultHooks::new()))
            .context("failed to initialise renderer")
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publisher {
    Local,
    S3,
}

/// Where rendered templates are published and how they are encoded.
#[derive(Args, Debug)]
pub struct DestinationArgs {
    /// Storage backend; inferred from `--path` when omitted.
    #[arg(long, short = 'P', value_enum, env = "JETSTREAM_PUBLISHER")]
    pub publisher: Option<Publisher>,

    /// Local directory or `s3://bucket[/prefix]`.
    #[arg(long, short = 'p', default_value = "./artifacts", env = "JETSTREAM_PATH")]
    pub path: String,

    /// Template encoding: json or yaml.
    #[arg(long, short = 'f', default_value = "json")]
    pub format: OutputFormat,

    /// Append the format extension to published template names.
    #[arg(long, short = 'e')]
    pub extension: bool,

    /// Extra `Metadata.Jetstream` entries, ignored when comparing (`key=value`).
    #[arg(long = "metadata", short = 'M', value_name = "KEY=VALUE", value_parser = parse_metadata)]
    pub metadata: Vec<(String, String)>,
}

impl DestinationArgs {
    pub fn destination(&self) -> Result<Destination> {
        let is_s3 = self.path.starts_with("s3://");
        match (self.publisher, is_s3) {
            (Some(Publisher::S3), false) => {
                bail!("--publisher s3 needs an s3://bucket[/prefix] path, got '{}'", self.path)
            }
            (Some(Publisher::Local), true) => {
                bail!("--publisher local cannot publish to '{}'", self.path)
            }
            _ => Destination::parse(&self.path)
                .with_context(|| format!("invalid publish path '{}'", self.path)),
        }
    }

    pub fn open_gate(&self, public: bool) -> Result<PublishGate> {
        let destination = self.destination()?;
        let backend = destination
            .open(public)
            .with_context(|| format!("failed to open destination {destination}"))?;
        tracing::debug!(destination = %destination, format = %self.format, "opened destination");
        Ok(PublishGate::new(backend, self.format))
    }

    /// Published name of `template`, with the format extension when requested.
    pub fn artifact_name(&self, template: &Template) -> String {
        if self.extension {
            format!("{}.{}", template.name, self.format)
        } else {
            template.name.to_string()
        }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            format: self.format,
            testing: false,
            additional_metadata: self.metadata.clone(),
        }
    }
}

fn parse_metadata(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// A template rendered for publication.
pub struct Rendered<'p> {
    pub template: &'p Template,
    pub artifact: String,
    pub body: String,
}

/// Render every template in `package` for `destination`, in package order.
pub fn render_templates<'p>(
    package: &'p Package,
    renderer: &Renderer,
    destination: &DestinationArgs,
) -> Result<Vec<Rendered<'p>>> {
    let options = destination.generate_options();
    package
        .iter()
        .map(|template| {
            let body = renderer
                .generate(template, &options)
                .with_context(|| format!("failed to render '{}'", template.name))?;
            Ok(Rendered {
                template,
                artifact: destination.artifact_name(template),
                body,
            })
        })
        .collect()
}
