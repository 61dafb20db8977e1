//! Trigger - processes one backup request per invocation
//!
//! One message moves through `Received -> DatasetEnsured ->
//! SnapshotRequested -> {Completed | BenignNoop | Fatal}`. Benign outcomes
//! (snapshot already exists today, or overwrite denied by permissions) are
//! logged and the invocation succeeds; everything else propagates to the
//! invoking runtime, which owns redelivery. No retries happen here.

pub mod snapshot;

pub use snapshot::{build_snapshot_query, snapshot_expiration, snapshot_table_id};

use crate::adapters::queue::PushEnvelope;
use crate::adapters::warehouse::{DatasetStore, QueryExecutor};
use crate::domain::{BackupError, BackupRequest, Result, WarehouseError};
use chrono::Utc;
use std::sync::Arc;

/// Classification of a bad-request failure from the snapshot query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadRequestKind {
    /// Today's snapshot already exists; the work is already done
    DuplicateSnapshot,

    /// Overwrite denied. Overwriting was never the defined behavior, so
    /// denial is benign.
    PermissionDenied,

    /// Anything else; fatal
    Other,
}

/// Classify a bad-request error
///
/// Structured reason codes are authoritative when present; unrecognized
/// codes are fatal. Substring matching on the human-readable message is
/// the fallback for responses without a code.
pub fn classify_bad_request(reason: Option<&str>, message: &str) -> BadRequestKind {
    match reason {
        Some("duplicate") => BadRequestKind::DuplicateSnapshot,
        Some("accessDenied") => BadRequestKind::PermissionDenied,
        Some(_) => BadRequestKind::Other,
        None => {
            if message.contains("Already Exists") {
                BadRequestKind::DuplicateSnapshot
            } else if message.contains("Access Denied") {
                BadRequestKind::PermissionDenied
            } else {
                BadRequestKind::Other
            }
        }
    }
}

/// Terminal state of one trigger invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new snapshot was created
    Completed {
        /// Fully-qualified source table that was backed up
        source: String,
    },

    /// Nothing to do; the request is already satisfied or intentionally
    /// tolerated
    BenignNoop(BadRequestKind),
}

/// Handler for backup-request messages
///
/// Holds no cross-invocation state; safety of concurrent invocations
/// against the same target dataset is delegated to the warehouse's
/// exists-ok create.
pub struct TriggerHandler {
    datasets: Arc<dyn DatasetStore>,
    queries: Arc<dyn QueryExecutor>,
    location: String,
}

impl TriggerHandler {
    /// Create a handler with injected warehouse clients
    pub fn new(
        datasets: Arc<dyn DatasetStore>,
        queries: Arc<dyn QueryExecutor>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            datasets,
            queries,
            location: location.into(),
        }
    }

    /// Process one message envelope
    ///
    /// # Errors
    ///
    /// Returns `BackupError::MalformedMessage` for undecodable payloads,
    /// `BackupError::DatasetCreate` if the destination cannot be ensured,
    /// `BackupError::Validation` if the dated snapshot name is not a valid
    /// identifier, and the underlying warehouse error for unclassified
    /// snapshot failures. Benign failures are not errors.
    pub async fn handle(&self, envelope: &PushEnvelope) -> Result<TriggerOutcome> {
        let request = envelope.decode_backup_request()?;
        tracing::info!(
            source = %request.source(),
            target_dataset = %request.target_dataset(),
            message_id = envelope.message_id().unwrap_or("-"),
            "Processing backup request"
        );

        self.ensure_target_dataset(&request).await?;

        let sql = build_snapshot_query(&request, Utc::now())?;
        match self.queries.execute(&sql).await {
            Ok(_) => {
                tracing::info!(
                    source = %request.source(),
                    target = %format!("{}.{}", request.target_project_id, request.target_dataset_id),
                    "Backed up table"
                );
                Ok(TriggerOutcome::Completed {
                    source: request.source().to_string(),
                })
            }
            Err(BackupError::Warehouse(WarehouseError::BadRequest { reason, message })) => {
                match classify_bad_request(reason.as_deref(), &message) {
                    BadRequestKind::DuplicateSnapshot => {
                        tracing::warn!(message = %message, "Snapshot already exists; nothing to do");
                        Ok(TriggerOutcome::BenignNoop(BadRequestKind::DuplicateSnapshot))
                    }
                    BadRequestKind::PermissionDenied => {
                        tracing::warn!(message = %message, "Snapshot overwrite denied; nothing to do");
                        Ok(TriggerOutcome::BenignNoop(BadRequestKind::PermissionDenied))
                    }
                    BadRequestKind::Other => {
                        Err(WarehouseError::BadRequest { reason, message }.into())
                    }
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Ensure the destination dataset exists
    ///
    /// The read and the conditional create are not atomic; concurrent
    /// invocations for tables sharing a target dataset may both observe
    /// "absent". The create is exists-ok, so losing that race is harmless.
    async fn ensure_target_dataset(&self, request: &BackupRequest) -> Result<()> {
        let dataset = request.target_dataset();
        if self.datasets.get_dataset(&dataset).await?.is_none() {
            self.datasets.create_dataset(&dataset, &self.location).await?;
            tracing::info!(dataset = %dataset, "Ensured target dataset");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_structured_codes() {
        assert_eq!(
            classify_bad_request(Some("duplicate"), "whatever"),
            BadRequestKind::DuplicateSnapshot
        );
        assert_eq!(
            classify_bad_request(Some("accessDenied"), "whatever"),
            BadRequestKind::PermissionDenied
        );
        // Unrecognized codes are conservatively fatal, even when the
        // message text would have matched.
        assert_eq!(
            classify_bad_request(Some("invalid"), "Already Exists: t"),
            BadRequestKind::Other
        );
    }

    #[test]
    fn test_classify_substring_fallback() {
        assert_eq!(
            classify_bad_request(None, "Already Exists: Table acme:ds.t_20240305"),
            BadRequestKind::DuplicateSnapshot
        );
        assert_eq!(
            classify_bad_request(None, "Access Denied: bigquery.tables.deleteSnapshot"),
            BadRequestKind::PermissionDenied
        );
        assert_eq!(
            classify_bad_request(None, "Invalid syntax at [1:1]"),
            BadRequestKind::Other
        );
    }
}
