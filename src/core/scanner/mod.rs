//! Scanner - discovers base tables and enqueues backup requests
//!
//! For each configured source project, in order, the scanner lists base
//! tables through the catalog seam, builds one [`BackupRequest`] per table,
//! and submits it to the flow-controlled publish pipeline. The run ends
//! with the pipeline's terminal barrier: every publish acknowledged, or the
//! first failure propagated.

pub mod pipeline;

pub use pipeline::{FlowControl, PublishPipeline};

use crate::adapters::queue::QueuePublisher;
use crate::adapters::warehouse::TableCatalog;
use crate::domain::{BackupError, BackupRequest, ProjectId, Result};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one scan run
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Source projects scanned
    pub projects_scanned: usize,

    /// Base tables discovered across all projects
    pub tables_discovered: usize,

    /// Publishes acknowledged by the broker
    pub messages_published: usize,
}

/// Scanner over a set of source projects
///
/// Clients are injected; the scanner owns no connections of its own and
/// holds no state between runs.
pub struct Scanner {
    catalog: Arc<dyn TableCatalog>,
    publisher: Arc<dyn QueuePublisher>,
    source_projects: Vec<ProjectId>,
    backup_project: ProjectId,
    flow: FlowControl,
    drain_timeout: Option<Duration>,
}

impl Scanner {
    /// Create a scanner
    pub fn new(
        catalog: Arc<dyn TableCatalog>,
        publisher: Arc<dyn QueuePublisher>,
        source_projects: Vec<ProjectId>,
        backup_project: ProjectId,
        flow: FlowControl,
        drain_timeout: Option<Duration>,
    ) -> Self {
        Self {
            catalog,
            publisher,
            source_projects,
            backup_project,
            flow,
            drain_timeout,
        }
    }

    /// Discover all base tables and enqueue one backup request per table
    ///
    /// Projects are scanned sequentially in configuration order. A catalog
    /// failure aborts the run, including projects not yet scanned. The
    /// terminal wait blocks until every publish across every project is
    /// acknowledged; the first publish failure is surfaced after all have
    /// resolved.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::CatalogQuery` if any catalog query fails,
    /// `BackupError::Validation` if a derived target dataset name is not a
    /// valid identifier, or `BackupError::Publish` if any publish fails or
    /// the drain times out.
    pub async fn scan_and_enqueue(&self) -> Result<ScanSummary> {
        let mut scan_pipeline = PublishPipeline::new(self.publisher.clone(), self.flow.clone());
        let mut tables_discovered = 0usize;

        for project in &self.source_projects {
            tracing::info!(project = %project, "Scanning project for base tables");

            let tables = self
                .catalog
                .list_base_tables(project)
                .await
                .map_err(|e| BackupError::CatalogQuery(format!("{project}: {e}")))?;
            tables_discovered += tables.len();

            for table in &tables {
                let request = BackupRequest::for_table(table, &self.backup_project)?;
                tracing::info!(
                    source = %table,
                    target_dataset = %request.target_dataset_id,
                    "Enqueueing backup request"
                );
                let payload = serde_json::to_vec(&request)?;
                scan_pipeline.submit(payload).await?;
            }
        }

        let messages_published = scan_pipeline.drain(self.drain_timeout).await?;

        let summary = ScanSummary {
            projects_scanned: self.source_projects.len(),
            tables_discovered,
            messages_published,
        };
        tracing::info!(
            projects = summary.projects_scanned,
            tables = summary.tables_discovered,
            published = summary.messages_published,
            "Scan complete"
        );
        Ok(summary)
    }
}
