//! batchlimit - run a batch of jobs with bounded concurrency
//!
//! Entry point for the `batchlimit` binary.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::{debug, info};

use batchlimit::cli::{Cli, Commands, ConfigSubcommand};
use batchlimit::config::{self, OutputFormat, RunnerConfig};
use batchlimit::error::{Error, Result};
use batchlimit::executor::LimitedRun;
use batchlimit::jobs::{JobManifest, JobOutput};
use batchlimit::logging;
use batchlimit::version::BuildInfo;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Version => {
            print!("{}", BuildInfo::current());
            Ok(())
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)
        }
        Commands::Run {
            manifest,
            limit,
            format,
            config,
        } => {
            let mut cfg = RunnerConfig::load(config.as_deref())?;
            // CLI flags win; a zero limit is rejected when the run is built
            if let Some(limit) = limit {
                cfg.runner.limit = limit;
            }
            if let Some(format) = format {
                cfg.runner.output = format;
            }

            // Held until exit so the file writer flushes
            let _log_guards = logging::init_logging(&cfg.logging, cli.verbose, cli.quiet)?;

            let build = BuildInfo::current();
            debug!(version = %build.full_version(), target = %build.target, "Starting batchlimit");

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("batchlimit")
                .build()
                .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

            runtime.block_on(run_manifest(&manifest, &cfg))
        }
    }
}

/// Load a manifest, run its jobs and print the results
async fn run_manifest(manifest_path: &str, cfg: &RunnerConfig) -> Result<()> {
    let path = PathBuf::from(config::expand_path(manifest_path));
    let tasks = JobManifest::load(&path)?.into_tasks();

    let builder = LimitedRun::builder().tasks(tasks).limit(cfg.runner.limit);
    let builder = if cfg.runner.progress {
        builder.progress(|p| {
            info!(
                completed = p.completed,
                total = p.total,
                elapsed_ms = p.elapsed.as_millis() as u64,
                "{}",
                p
            )
        })
    } else {
        builder.progress(|_| {})
    };
    let run = builder.build()?;

    info!(
        run_id = %run.run_id(),
        manifest = %path.display(),
        jobs = run.len(),
        limit = run.limit(),
        "Running jobs"
    );

    let started = Instant::now();
    let results = run.await?;
    info!(
        jobs = results.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "All jobs completed"
    );

    print_results(&results, cfg.runner.output)
}

/// Print results in completion order
fn print_results(results: &[JobOutput], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "completed": results.len(),
                "results": results,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for r in results {
                println!("{}\t{}\t{}ms\t{}", r.position, r.name, r.duration_ms, r.output);
            }
        }
    }
    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = RunnerConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            RunnerConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
