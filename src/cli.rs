//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for batchlimit.

use clap::{Parser, Subcommand};

use crate::config::OutputFormat;

/// batchlimit - run a batch of jobs with bounded concurrency
///
/// Runs the jobs of a TOML manifest with at most N in flight, stops
/// dispatching on the first failure, and prints results in completion order.
#[derive(Parser, Debug)]
#[command(name = "batchlimit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the jobs in a manifest
    Run {
        /// Path to the job manifest (TOML, one [[job]] table per job)
        manifest: String,

        /// Maximum jobs in flight (overrides config and BATCHLIMIT_LIMIT)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Result output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Path to configuration file
        #[arg(short, long, env = "BATCHLIMIT_CONFIG")]
        config: Option<String>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["batchlimit", "run", "jobs.toml"]);
        match cli.command {
            Commands::Run { manifest, limit, format, config } => {
                assert_eq!(manifest, "jobs.toml");
                assert!(limit.is_none());
                assert!(format.is_none());
                assert!(config.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let cli = Cli::parse_from([
            "batchlimit",
            "run",
            "jobs.toml",
            "--limit",
            "3",
            "--format",
            "json",
        ]);
        match cli.command {
            Commands::Run { limit, format, .. } => {
                assert_eq!(limit, Some(3));
                assert_eq!(format, Some(OutputFormat::Json));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_rejects_non_numeric_limit() {
        let result = Cli::try_parse_from(["batchlimit", "run", "jobs.toml", "--limit", "many"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["batchlimit", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["batchlimit", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["batchlimit", "config", "init", "--force"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Init { path, force } } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
