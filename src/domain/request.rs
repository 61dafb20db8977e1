//! Backup request wire record and derivation rules
//!
//! A `BackupRequest` is the unit of work flowing from the scanner to the
//! trigger: one per (source project, dataset, table) triple. The target
//! coordinates are a pure function of the source coordinates and the backup
//! project, so re-scans always produce identical messages.

use crate::domain::errors::BackupError;
use crate::domain::ids::{DatasetId, ProjectId, TableId};
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinates of a table in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Project owning the table
    pub project_id: ProjectId,

    /// Dataset containing the table
    pub dataset_id: DatasetId,

    /// Table name
    pub table_id: TableId,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.project_id, self.dataset_id, self.table_id
        )
    }
}

/// Coordinates of a dataset in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    /// Project owning the dataset
    pub project_id: ProjectId,

    /// Dataset name
    pub dataset_id: DatasetId,
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_id, self.dataset_id)
    }
}

/// The message payload: one backup work item per discovered table
///
/// Serialized as JSON onto the queue by the scanner and decoded by the
/// trigger. Field names are the wire contract; do not rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRequest {
    /// Project the table to snapshot lives in
    pub source_project_id: ProjectId,

    /// Dataset the table to snapshot lives in
    pub source_dataset_id: DatasetId,

    /// Table to snapshot
    pub source_table_id: TableId,

    /// Fixed backup destination project
    pub target_project_id: ProjectId,

    /// Derived destination dataset, namespaced by source project
    pub target_dataset_id: DatasetId,

    /// Destination table name, equal to the source table name
    pub target_table_id: TableId,
}

impl BackupRequest {
    /// Builds a backup request for one discovered table
    ///
    /// The target dataset is `{source_project_id with '-' as '_'}_{source_dataset_id}`,
    /// which keeps datasets with the same name in different source projects
    /// from colliding in the backup project. The target table name equals
    /// the source table name.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Validation` if the derived target dataset name
    /// is not a valid dataset ID (the prefix can push a name near the
    /// length cap over it).
    pub fn for_table(source: &TableRef, backup_project: &ProjectId) -> Result<Self> {
        let target_dataset_id = derive_target_dataset_id(&source.project_id, &source.dataset_id)?;
        Ok(Self {
            source_project_id: source.project_id.clone(),
            source_dataset_id: source.dataset_id.clone(),
            source_table_id: source.table_id.clone(),
            target_project_id: backup_project.clone(),
            target_dataset_id,
            target_table_id: source.table_id.clone(),
        })
    }

    /// The source table coordinates
    pub fn source(&self) -> TableRef {
        TableRef {
            project_id: self.source_project_id.clone(),
            dataset_id: self.source_dataset_id.clone(),
            table_id: self.source_table_id.clone(),
        }
    }

    /// The destination dataset coordinates
    pub fn target_dataset(&self) -> DatasetRef {
        DatasetRef {
            project_id: self.target_project_id.clone(),
            dataset_id: self.target_dataset_id.clone(),
        }
    }
}

/// Derives the destination dataset for a source (project, dataset) pair
///
/// Pure function: every dash in the project ID becomes an underscore, and
/// the result is prefixed onto the dataset name with an underscore.
///
/// # Errors
///
/// Returns `BackupError::Validation` if the derived name exceeds the
/// dataset ID length limit; the prefix adds up to 31 characters, so a
/// source dataset near the cap can overflow it.
pub fn derive_target_dataset_id(
    source_project_id: &ProjectId,
    source_dataset_id: &DatasetId,
) -> Result<DatasetId> {
    let project_part = source_project_id.as_str().replace('-', "_");
    let derived = format!("{project_part}_{source_dataset_id}");
    DatasetId::new(derived).map_err(BackupError::Validation)
}
