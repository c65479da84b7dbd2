//! Command-line interface definitions.

pub mod check;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cross-venue maker/taker spread arbitrage.
#[derive(Parser, Debug)]
#[command(name = "crossarb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine against paper venues until Ctrl-C
    Run(RunArgs),

    /// Validate a configuration file and print the symbol table
    Check(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Trade only these symbols (repeatable)
    #[arg(short, long = "symbol")]
    pub symbols: Vec<String>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_symbols() {
        let cli = Cli::parse_from(["crossarb", "run", "-c", "a.toml", "-s", "btc", "--symbol", "eth"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("a.toml"));
                assert_eq!(args.symbols, ["btc", "eth"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn check_defaults_config_path() {
        let cli = Cli::parse_from(["crossarb", "check"]);
        assert!(matches!(cli.command, Commands::Check(ConfigPathArg { config }) if config == PathBuf::from("config.toml")));
    }
}
