//! Scan command implementation
//!
//! Runs the scanner as a batch job: discover base tables across the
//! configured source projects and enqueue one backup request per table.

use crate::adapters::gcp::AccessTokenProvider;
use crate::adapters::queue::{BatchSettings, PubSubPublisher};
use crate::adapters::warehouse::BigQueryClient;
use crate::config::load_config;
use crate::core::scanner::{FlowControl, Scanner};
use crate::domain::ProjectId;
use clap::Args;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Override source project(s) to scan (comma-separated)
    #[arg(long)]
    pub source_projects: Option<String>,
}

impl ScanArgs {
    /// Execute the scan command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting scan command");

        let mut config = load_config(config_path)?;

        if let Some(projects) = &self.source_projects {
            let projects: Vec<String> = projects
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::info!(source_projects = ?projects, "Overriding source projects from CLI");
            config.scan.source_projects = projects;
        }

        let source_projects = config
            .scan
            .source_projects
            .iter()
            .map(|p| ProjectId::from_str(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(anyhow::Error::msg)?;
        let backup_project =
            ProjectId::from_str(&config.backup.project_id).map_err(anyhow::Error::msg)?;

        // Clients are built once here and injected; nothing is
        // process-global.
        let auth = Arc::new(AccessTokenProvider::new());
        let catalog = Arc::new(BigQueryClient::new(
            config.bigquery.endpoint.clone(),
            backup_project.clone(),
            config.backup.location.clone(),
            config.scan.region.clone(),
            auth.clone(),
        ));
        let publisher = Arc::new(PubSubPublisher::new(
            config.pubsub.endpoint.clone(),
            config.pubsub.topic_name(),
            BatchSettings {
                max_bytes: config.scan.max_batch_bytes,
                max_latency: Duration::from_millis(config.scan.max_batch_latency_ms),
            },
            auth,
        ));

        let scanner = Scanner::new(
            catalog,
            publisher,
            source_projects,
            backup_project,
            FlowControl {
                max_in_flight_messages: config.scan.max_in_flight_messages,
                max_in_flight_bytes: config.scan.max_in_flight_bytes,
            },
            config.scan.drain_timeout_seconds.map(Duration::from_secs),
        );

        let summary = scanner.scan_and_enqueue().await?;
        println!(
            "Scanned {} project(s): {} table(s) discovered, {} request(s) published",
            summary.projects_scanned, summary.tables_discovered, summary.messages_published
        );
        Ok(0)
    }
}
