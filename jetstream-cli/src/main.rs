//! Jetstream: publish CloudFormation templates only when they change.
//!
//! # Usage
//!
//! ```text
//! jetstream publish --package <dir> [--publisher local|s3] [--path <dir|s3://bucket/prefix>]
//!                   [--format json|yaml] [--extension] [--metadata key=value]...
//!                   [--test | --dry-test] [--clean-on never|failure|pass|always]
//!                   [--debug] [--no-publish] [--documentation] [--public]
//! jetstream diff    --package <dir> [destination flags]
//! jetstream status  --package <dir> [destination flags] [--json]
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::{diff::DiffArgs, publish::PublishArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "jetstream",
    version,
    about = "Render, validate and publish CloudFormation template packages",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every template and publish the ones that changed.
    Publish(PublishArgs),

    /// Show unified diffs of the templates a publish would replace.
    Diff(DiffArgs),

    /// Show which templates are new, changed or unchanged at the destination.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Publish(args) => args.run(),
        Commands::Diff(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Status(args) => args.run().map(|()| ExitCode::SUCCESS),
    }
}
