//! Snapshot DDL construction
//!
//! Builds the `CREATE SNAPSHOT TABLE ... CLONE ...` statement for one
//! backup request. Snapshot names carry the creation date
//! (`{table}_{YYYYMMDD}`) and expire one day after creation, so daily runs
//! produce one snapshot per table per day and re-runs on the same day
//! collide benignly.
//!
//! Every identifier interpolated here is a validated newtype; raw strings
//! never reach this module.

use crate::domain::{BackupError, BackupRequest, Result, TableId};
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

/// Snapshots expire this long after creation.
const SNAPSHOT_TTL_DAYS: i64 = 1;

/// Snapshot table name for a backup of `table` taken on `date`
///
/// # Errors
///
/// Returns `BackupError::Validation` if the dated name exceeds the table
/// ID length limit; the suffix adds 9 characters, so a table near the cap
/// can overflow it.
pub fn snapshot_table_id(table: &TableId, date: NaiveDate) -> Result<TableId> {
    let name = format!("{}_{}", table, date.format("%Y%m%d"));
    TableId::new(name).map_err(BackupError::Validation)
}

/// Expiration timestamp for a snapshot created at `now`
pub fn snapshot_expiration(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(SNAPSHOT_TTL_DAYS)
}

/// Build the snapshot-creation DDL for one request
///
/// The statement clones the fully-qualified source table into
/// `{target_project}.{target_dataset}.{table}_{YYYYMMDD}` with an
/// expiration one day after `now`.
///
/// # Errors
///
/// Returns `BackupError::Validation` if the dated snapshot name is not a
/// valid table ID.
pub fn build_snapshot_query(request: &BackupRequest, now: DateTime<Utc>) -> Result<String> {
    let snapshot = snapshot_table_id(&request.target_table_id, now.date_naive())?;
    let expiration = snapshot_expiration(now).to_rfc3339_opts(SecondsFormat::Micros, true);

    Ok(format!(
        "CREATE SNAPSHOT TABLE `{target_project}.{target_dataset}.{snapshot}` \
         CLONE `{source_project}.{source_dataset}.{source_table}` \
         OPTIONS (expiration_timestamp = TIMESTAMP '{expiration}')",
        target_project = request.target_project_id,
        target_dataset = request.target_dataset_id,
        snapshot = snapshot,
        source_project = request.source_project_id,
        source_dataset = request.source_dataset_id,
        source_table = request.source_table_id,
    ))
}
