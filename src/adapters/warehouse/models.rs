//! Wire types for the BigQuery REST API
//!
//! Only the fields this crate reads are modeled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};

/// Request body for `jobs.query`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// How long the synchronous call waits before returning with
    /// `job_complete = false`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Response body for `jobs.query` and `jobs.getQueryResults`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub job_complete: Option<bool>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub total_rows: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
    #[serde(default)]
    pub page_token: Option<String>,
}

/// Job identity within a project
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// One result row; BigQuery encodes cells as `{"f": [{"v": ...}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

/// One result cell
#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Option<serde_json::Value>,
}

impl TableRow {
    /// The cell at `index` as a string, if present and scalar
    pub fn str_field(&self, index: usize) -> Option<&str> {
        self.f.get(index).and_then(|c| c.v.as_ref()).and_then(|v| v.as_str())
    }
}

/// Structured error entry as BigQuery reports it
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Top-level error envelope on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

/// Dataset resource for `datasets.get` / `datasets.insert`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResource {
    pub dataset_reference: DatasetReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Dataset identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference {
    pub project_id: String,
    pub dataset_id: String,
}
