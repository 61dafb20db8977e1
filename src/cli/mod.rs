//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for tablesnap using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// tablesnap - BigQuery table snapshot backup pipeline
#[derive(Parser, Debug)]
#[command(name = "tablesnap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tablesnap.toml", env = "TABLESNAP_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TABLESNAP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan source projects and enqueue one backup request per base table
    Scan(commands::scan::ScanArgs),

    /// Process one queued backup request (reads a push envelope)
    Trigger(commands::trigger::TriggerArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_scan() {
        let cli = Cli::parse_from(["tablesnap", "scan"]);
        assert_eq!(cli.config, "tablesnap.toml");
        assert!(matches!(cli.command, Commands::Scan(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["tablesnap", "--config", "custom.toml", "scan"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_trigger_with_message_file() {
        let cli = Cli::parse_from(["tablesnap", "trigger", "--message-file", "envelope.json"]);
        match cli.command {
            Commands::Trigger(args) => {
                assert_eq!(args.message_file.as_deref(), Some("envelope.json"));
            }
            _ => panic!("expected trigger command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["tablesnap", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["tablesnap", "--log-level", "debug", "scan"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }
}
