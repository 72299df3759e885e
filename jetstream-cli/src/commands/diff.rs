//! `jetstream diff`: unified diffs of the templates a publish would replace.

use anyhow::{Context, Result};
use clap::Args;

use super::{render_templates, DestinationArgs, PackageArgs};

/// Arguments for `jetstream diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub source: PackageArgs,

    #[command(flatten)]
    pub destination: DestinationArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let package = self.source.load()?;
        let renderer = self.source.renderer()?;
        let gate = self.destination.open_gate(false)?;

        let mut changed = 0;
        for rendered in render_templates(&package, &renderer, &self.destination)? {
            let diff = gate
                .diff(&rendered.artifact, &rendered.body)
                .with_context(|| format!("diff failed for '{}'", rendered.template.name))?;
            if let Some(diff) = diff {
                changed += 1;
                print!("{diff}");
                if !diff.ends_with('\n') {
                    println!();
                }
            }
        }

        if changed == 0 {
            println!("No differences for '{}'.", self.destination.path);
        }
        Ok(())
    }
}
