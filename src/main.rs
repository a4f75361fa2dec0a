//! ScaleBench CLI - Scalability Benchmarks for HPC Clusters
//!
//! Generates benchmark scripts, imports their results and exports scaling
//! statistics.

use clap::Parser;
use scalebench::config::{CliArgs, Commands, GenerateArgs, OutputFormat};
use scalebench::error::{Result, ScaleBenchError};
use scalebench::import::{parse_timestamp, ImportOutcome};
use scalebench::progress::ProgressReporter;
use scalebench::system::{local_cluster, LocalTopology};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG takes precedence over -v/-q
    let default_level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    match &args.command {
        Commands::Generate(generate) => cmd_generate(generate, args.quiet),
        Commands::Import { workspace, epoch } => {
            cmd_import(workspace, epoch.as_deref(), args.quiet)
        }
        Commands::Export { workspace, output } => cmd_export(workspace, output, args.quiet),
        Commands::DetectCluster { name, format } => cmd_detect_cluster(name.clone(), *format),
    }
}

fn cmd_generate(args: &GenerateArgs, quiet: bool) -> Result<()> {
    let summary = scalebench::core::generate(args)?;

    if !quiet {
        summary.print();
    }

    Ok(())
}

fn cmd_import(workspace: &Path, epoch: Option<&str>, quiet: bool) -> Result<()> {
    let epoch = epoch.map(parse_timestamp).transpose()?;

    let progress = if quiet {
        ProgressReporter::disabled()
    } else {
        ProgressReporter::new()
    };

    match scalebench::core::import(workspace, epoch, progress.clone())? {
        ImportOutcome::Imported { nr_results } => {
            if progress.is_enabled() {
                println!("Imported {} results from {}", nr_results, workspace.display());
                progress.summary().print();
            }
        }
        ImportOutcome::AlreadyImported => {
            if progress.is_enabled() {
                println!("Results in {} were already imported", workspace.display());
            }
        }
    }

    Ok(())
}

fn cmd_export(workspace: &Path, output: &Path, quiet: bool) -> Result<()> {
    let nr_rows = scalebench::core::export(workspace, output)?;

    if !quiet {
        println!("Wrote {} rows to {}", nr_rows, output.display());
    }

    Ok(())
}

fn cmd_detect_cluster(name: Option<String>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => LocalTopology::detect().print_summary(),
        OutputFormat::Json => {
            let cluster = local_cluster(name);
            let json = serde_json::to_string_pretty(&cluster)
                .map_err(|e| ScaleBenchError::config(e.to_string()))?;
            println!("{}", json);
        }
    }

    Ok(())
}
