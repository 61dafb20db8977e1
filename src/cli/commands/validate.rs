//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the tablesnap configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Source Projects: {}", config.scan.source_projects.join(", "));
        println!("  Scan Region: {}", config.scan.region);
        println!("  Backup Project: {}", config.backup.project_id);
        println!("  Backup Location: {}", config.backup.location);
        println!("  Topic: {}", config.pubsub.topic_name());
        println!(
            "  Flow Control: {} message(s) / {} byte(s) in flight",
            config.scan.max_in_flight_messages, config.scan.max_in_flight_bytes
        );
        Ok(0)
    }
}
