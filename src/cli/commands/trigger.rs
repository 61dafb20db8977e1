//! Trigger command implementation
//!
//! Processes exactly one queued backup request per invocation. The push
//! envelope arrives on stdin (the queue-triggered runtime's delivery) or
//! from a file for local runs. Concurrency across messages is owned by the
//! invoking runtime, not by this process.

use crate::adapters::gcp::AccessTokenProvider;
use crate::adapters::queue::PushEnvelope;
use crate::adapters::warehouse::BigQueryClient;
use crate::config::load_config;
use crate::core::trigger::{TriggerHandler, TriggerOutcome};
use crate::domain::ProjectId;
use clap::Args;
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

/// Arguments for the trigger command
#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// Read the push envelope from this file instead of stdin
    #[arg(long)]
    pub message_file: Option<String>,
}

impl TriggerArgs {
    /// Execute the trigger command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;

        let raw = match &self.message_file {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
        };
        let envelope = PushEnvelope::from_json(&raw)?;

        let backup_project =
            ProjectId::from_str(&config.backup.project_id).map_err(anyhow::Error::msg)?;
        let auth = Arc::new(AccessTokenProvider::new());
        let client = Arc::new(BigQueryClient::new(
            config.bigquery.endpoint.clone(),
            backup_project,
            config.backup.location.clone(),
            config.scan.region.clone(),
            auth,
        ));

        let handler = TriggerHandler::new(client.clone(), client, config.backup.location.clone());

        match handler.handle(&envelope).await? {
            TriggerOutcome::Completed { source } => {
                println!("Backed up {source}");
            }
            TriggerOutcome::BenignNoop(kind) => {
                println!("Nothing to do ({kind:?})");
            }
        }
        Ok(0)
    }
}
