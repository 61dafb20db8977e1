//! Warehouse abstraction traits
//!
//! This module defines the traits the scanner and trigger depend on for
//! warehouse access, so both can be exercised against fakes in tests.

use crate::domain::{DatasetRef, ProjectId, Result, TableRef};
use async_trait::async_trait;

/// Metadata for an existing dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetInfo {
    /// Dataset coordinates
    pub dataset: DatasetRef,

    /// Dataset location, when the warehouse reports one
    pub location: Option<String>,
}

/// Result of a completed query job
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    /// Server-side job identifier, when one was assigned
    pub job_id: Option<String>,

    /// Rows affected or returned, when the warehouse reports a count
    pub total_rows: Option<u64>,
}

/// Table catalog lookup
///
/// Consumed by the scanner to discover base tables in a source project.
#[async_trait]
pub trait TableCatalog: Send + Sync {
    /// List all base tables in a project, excluding views, snapshots and
    /// external tables
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog query fails; the scanner treats
    /// this as fatal for the whole run.
    async fn list_base_tables(&self, project: &ProjectId) -> Result<Vec<TableRef>>;
}

/// Dataset management
///
/// Consumed by the trigger to ensure the backup destination exists. The
/// check-then-create sequence across concurrent invocations is not atomic;
/// `create_dataset` must therefore succeed silently when the dataset
/// already exists (exists-ok semantics).
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Fetch dataset metadata, returning `None` if the dataset is absent
    async fn get_dataset(&self, dataset: &DatasetRef) -> Result<Option<DatasetInfo>>;

    /// Create a dataset, succeeding silently if it already exists
    ///
    /// Implementations use a short fixed timeout on this metadata call so
    /// a stuck create cannot hang the invocation.
    async fn create_dataset(&self, dataset: &DatasetRef, location: &str) -> Result<DatasetInfo>;
}

/// Query execution
///
/// Consumed by the trigger to run the snapshot DDL. Blocks until the
/// warehouse reports completion or error. Bad-request failures surface as
/// `WarehouseError::BadRequest` carrying the structured reason code when
/// the warehouse provides one; the trigger classifies on it.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a statement and wait for it to finish
    async fn execute(&self, sql: &str) -> Result<QueryOutcome>;
}
