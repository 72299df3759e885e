//! `jetstream status`: which templates a publish would write.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use jetstream_publish::PublishGate;

use super::{render_templates, DestinationArgs, PackageArgs, Rendered};

/// Arguments for `jetstream status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub source: PackageArgs,

    #[command(flatten)]
    pub destination: DestinationArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let package = self.source.load()?;
        let renderer = self.source.renderer()?;
        let gate = self.destination.open_gate(false)?;

        let rendered = render_templates(&package, &renderer, &self.destination)?;
        let rows = rendered
            .iter()
            .map(|r| template_status(&gate, r))
            .collect::<Result<Vec<_>>>()?;

        if self.json {
            print_json(&self.destination.path, rows)
        } else {
            print_table(&self.destination.path, rows);
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactStatus {
    New,
    Changed,
    Unchanged,
}

impl ArtifactStatus {
    fn key(self) -> &'static str {
        match self {
            ArtifactStatus::New => "new",
            ArtifactStatus::Changed => "changed",
            ArtifactStatus::Unchanged => "unchanged",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ArtifactStatus::New => "NEW",
            ArtifactStatus::Changed => "CHANGED",
            ArtifactStatus::Unchanged => "UNCHANGED",
        }
    }

    fn indicator(self) -> String {
        match self {
            ArtifactStatus::New => "■".green().bold().to_string(),
            ArtifactStatus::Changed => "■".yellow().bold().to_string(),
            ArtifactStatus::Unchanged => "■".bright_black().bold().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct TemplateStatus {
    template: String,
    artifact: String,
    location: String,
    status: ArtifactStatus,
}

#[derive(Serialize)]
struct StatusReportJson {
    destination: String,
    summary: StatusSummaryJson,
    templates: Vec<TemplateStatusJson>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    templates: usize,
    new: usize,
    changed: usize,
    unchanged: usize,
}

#[derive(Serialize)]
struct TemplateStatusJson {
    template: String,
    artifact: String,
    location: String,
    status: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "template")]
    template: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "location")]
    location: String,
}

fn template_status(gate: &PublishGate, rendered: &Rendered<'_>) -> Result<TemplateStatus> {
    let location = gate.location(&rendered.artifact);
    let status = if !gate
        .exists(&rendered.artifact)
        .with_context(|| format!("failed to read {location}"))?
    {
        ArtifactStatus::New
    } else if gate
        .newer(&rendered.artifact, &rendered.body)
        .with_context(|| format!("failed to compare {location}"))?
    {
        ArtifactStatus::Changed
    } else {
        ArtifactStatus::Unchanged
    };
    Ok(TemplateStatus {
        template: rendered.template.name.to_string(),
        artifact: rendered.artifact.clone(),
        location,
        status,
    })
}

fn count(rows: &[TemplateStatus], status: ArtifactStatus) -> usize {
    rows.iter().filter(|r| r.status == status).count()
}

fn print_json(destination: &str, rows: Vec<TemplateStatus>) -> Result<()> {
    let payload = StatusReportJson {
        destination: destination.to_owned(),
        summary: StatusSummaryJson {
            templates: rows.len(),
            new: count(&rows, ArtifactStatus::New),
            changed: count(&rows, ArtifactStatus::Changed),
            unchanged: count(&rows, ArtifactStatus::Unchanged),
        },
        templates: rows
            .into_iter()
            .map(|row| TemplateStatusJson {
                template: row.template,
                artifact: row.artifact,
                location: row.location,
                status: row.status.key().to_string(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(destination: &str, rows: Vec<TemplateStatus>) {
    let pending = count(&rows, ArtifactStatus::New) + count(&rows, ArtifactStatus::Changed);
    println!(
        "Jetstream v{} | {} | {} templates | {} pending",
        env!("CARGO_PKG_VERSION"),
        destination,
        rows.len(),
        pending,
    );

    if rows.is_empty() {
        println!("No templates in package.");
        return;
    }

    println!(
        "Indicators: {} NEW  {} CHANGED  {} UNCHANGED",
        ArtifactStatus::New.indicator(),
        ArtifactStatus::Changed.indicator(),
        ArtifactStatus::Unchanged.indicator(),
    );
    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            template: row.template,
            status: format!("{} {}", row.status.indicator(), row.status.label()),
            location: row.location,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending > 0 {
        println!("Run 'jetstream publish' to publish new and changed templates.");
    }
}
