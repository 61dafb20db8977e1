//! BigQuery REST client
//!
//! Implements the warehouse traits over the `jobs.query`,
//! `jobs.getQueryResults`, `datasets.get` and `datasets.insert` endpoints.
//! No SDK crate is used; requests carry bearer tokens from
//! [`AccessTokenProvider`].

use crate::adapters::gcp::AccessTokenProvider;
use crate::adapters::warehouse::models::{
    DatasetReference, DatasetResource, ErrorResponse, QueryRequest, QueryResponse, TableRow,
};
use crate::adapters::warehouse::traits::{
    DatasetInfo, DatasetStore, QueryExecutor, QueryOutcome, TableCatalog,
};
use crate::domain::{
    BackupError, DatasetId, DatasetRef, ProjectId, Result, TableId, TableRef, WarehouseError,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Timeout on dataset metadata calls; a stuck create must not hang the
/// trigger invocation.
const DATASET_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// How long one synchronous query call waits server-side before the client
/// falls back to polling.
const QUERY_WAIT_MS: u64 = 10_000;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// BigQuery REST client
///
/// Construct once per process and share via `Arc`; holds no per-request
/// state beyond the token cache.
pub struct BigQueryClient {
    http_client: reqwest::Client,
    base_url: String,
    auth: Arc<AccessTokenProvider>,
    billing_project: ProjectId,
    location: String,
    region: String,
}

impl BigQueryClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Endpoint override for emulators/tests; `None` uses
    ///   the public API
    /// * `billing_project` - Project that query jobs are billed to
    /// * `location` - Job and dataset location (e.g. "EU")
    /// * `region` - INFORMATION_SCHEMA region qualifier (e.g. "eu")
    /// * `auth` - Shared token provider
    pub fn new(
        endpoint: Option<String>,
        billing_project: ProjectId,
        location: impl Into<String>,
        region: impl Into<String>,
        auth: Arc<AccessTokenProvider>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            auth,
            billing_project,
            location: location.into(),
            region: region.into(),
        }
    }

    async fn bearer(&self) -> Result<String> {
        self.auth.token().await
    }

    /// Runs a query and collects all result rows, polling and paging until
    /// the job is done
    async fn run_query(&self, sql: &str) -> Result<(QueryResponse, Vec<TableRow>)> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.billing_project);
        let token = self.bearer().await?;
        let request = QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            location: Some(self.location.clone()),
            timeout_ms: Some(QUERY_WAIT_MS),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body).into());
        }

        let mut current: QueryResponse = response
            .json()
            .await
            .map_err(|e| WarehouseError::InvalidResponse(e.to_string()))?;

        let mut rows = std::mem::take(&mut current.rows);

        // Poll for completion, then follow result pages.
        loop {
            if let Some(error) = current.errors.first() {
                return Err(WarehouseError::BadRequest {
                    reason: error.reason.clone(),
                    message: error
                        .message
                        .clone()
                        .unwrap_or_else(|| "query failed".to_string()),
                }
                .into());
            }

            let complete = current.job_complete.unwrap_or(true);
            let page_token = current.page_token.clone();
            if complete && page_token.is_none() {
                return Ok((current, rows));
            }

            let job_id = current
                .job_reference
                .as_ref()
                .map(|r| r.job_id.clone())
                .ok_or_else(|| {
                    WarehouseError::InvalidResponse(
                        "incomplete query response without a job reference".to_string(),
                    )
                })?;

            if !complete {
                tokio::time::sleep(POLL_INTERVAL).await;
            }

            let mut next = self.get_query_results(&job_id, page_token.as_deref()).await?;
            rows.append(&mut next.rows);
            current = next;
        }
    }

    async fn get_query_results(
        &self,
        job_id: &str,
        page_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.base_url, self.billing_project, job_id
        );
        let token = self.bearer().await?;
        let mut query: Vec<(&str, String)> = vec![
            ("timeoutMs", QUERY_WAIT_MS.to_string()),
            ("location", self.location.clone()),
        ];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token.to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body).into());
        }

        response
            .json()
            .await
            .map_err(|e| WarehouseError::InvalidResponse(e.to_string()).into())
    }
}

#[async_trait]
impl TableCatalog for BigQueryClient {
    async fn list_base_tables(&self, project: &ProjectId) -> Result<Vec<TableRef>> {
        // Identifiers are validated newtypes, safe to interpolate.
        let sql = format!(
            "SELECT table_catalog, table_schema, table_name \
             FROM `{project}`.`region-{region}`.INFORMATION_SCHEMA.TABLES \
             WHERE table_type = 'BASE TABLE'",
            project = project,
            region = self.region,
        );

        let (_, rows) = self.run_query(&sql).await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let table = parse_catalog_row(row)?;
            tables.push(table);
        }

        tracing::info!(
            project = %project,
            table_count = tables.len(),
            "Listed base tables"
        );
        Ok(tables)
    }
}

#[async_trait]
impl DatasetStore for BigQueryClient {
    async fn get_dataset(&self, dataset: &DatasetRef) -> Result<Option<DatasetInfo>> {
        let url = format!(
            "{}/projects/{}/datasets/{}",
            self.base_url, dataset.project_id, dataset.dataset_id
        );
        let token = self.bearer().await?;

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .timeout(DATASET_CALL_TIMEOUT)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body).into());
        }

        let resource: DatasetResource = response
            .json()
            .await
            .map_err(|e| WarehouseError::InvalidResponse(e.to_string()))?;

        Ok(Some(DatasetInfo {
            dataset: dataset.clone(),
            location: resource.location,
        }))
    }

    async fn create_dataset(&self, dataset: &DatasetRef, location: &str) -> Result<DatasetInfo> {
        let url = format!("{}/projects/{}/datasets", self.base_url, dataset.project_id);
        let token = self.bearer().await?;
        let body = DatasetResource {
            dataset_reference: DatasetReference {
                project_id: dataset.project_id.to_string(),
                dataset_id: dataset.dataset_id.to_string(),
            },
            location: Some(location.to_string()),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .timeout(DATASET_CALL_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        // Lost the check-then-create race to a concurrent invocation;
        // the dataset now exists, which is all that was wanted.
        if status == StatusCode::CONFLICT {
            tracing::debug!(dataset = %dataset, "Dataset already exists");
            return Ok(DatasetInfo {
                dataset: dataset.clone(),
                location: Some(location.to_string()),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = map_http_error(status, &body);
            return Err(BackupError::DatasetCreate(format!("{dataset}: {err}")));
        }

        let resource: DatasetResource = response
            .json()
            .await
            .map_err(|e| WarehouseError::InvalidResponse(e.to_string()))?;

        tracing::info!(dataset = %dataset, "Created dataset");
        Ok(DatasetInfo {
            dataset: dataset.clone(),
            location: resource.location,
        })
    }
}

#[async_trait]
impl QueryExecutor for BigQueryClient {
    async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        let (response, _) = self.run_query(sql).await?;
        Ok(QueryOutcome {
            job_id: response.job_reference.map(|r| r.job_id),
            total_rows: response
                .total_rows
                .as_deref()
                .and_then(|v| v.parse().ok()),
        })
    }
}

fn parse_catalog_row(row: &TableRow) -> Result<TableRef> {
    let project = row.str_field(0).ok_or_else(|| {
        WarehouseError::InvalidResponse("catalog row missing table_catalog".to_string())
    })?;
    let dataset = row.str_field(1).ok_or_else(|| {
        WarehouseError::InvalidResponse("catalog row missing table_schema".to_string())
    })?;
    let table = row.str_field(2).ok_or_else(|| {
        WarehouseError::InvalidResponse("catalog row missing table_name".to_string())
    })?;

    Ok(TableRef {
        project_id: ProjectId::new(project)
            .map_err(|e| BackupError::Validation(format!("catalog row: {e}")))?,
        dataset_id: DatasetId::new(dataset)
            .map_err(|e| BackupError::Validation(format!("catalog row: {e}")))?,
        table_id: TableId::new(table)
            .map_err(|e| BackupError::Validation(format!("catalog row: {e}")))?,
    })
}

fn map_transport_error(err: reqwest::Error) -> BackupError {
    if err.is_timeout() {
        WarehouseError::Timeout(err.to_string()).into()
    } else if err.is_connect() {
        WarehouseError::ConnectionFailed(err.to_string()).into()
    } else {
        BackupError::Connection(err.to_string())
    }
}

/// Maps a non-2xx response into a warehouse error, preserving the
/// structured reason code for classification
fn map_http_error(status: StatusCode, body: &str) -> WarehouseError {
    let (reason, message) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => {
            let reason = parsed.error.errors.first().and_then(|e| e.reason.clone());
            let message = parsed
                .error
                .message
                .or_else(|| {
                    parsed
                        .error
                        .errors
                        .first()
                        .and_then(|e| e.message.clone())
                })
                .unwrap_or_else(|| format!("HTTP {status}"));
            (reason, message)
        }
        Err(_) => (None, format!("HTTP {status}: {body}")),
    };

    match status {
        StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN | StatusCode::CONFLICT => {
            WarehouseError::BadRequest { reason, message }
        }
        StatusCode::UNAUTHORIZED => WarehouseError::AuthenticationFailed(message),
        StatusCode::NOT_FOUND => WarehouseError::DatasetNotFound(message),
        s if s.is_server_error() => WarehouseError::ServerError {
            status: s.as_u16(),
            message,
        },
        _ => WarehouseError::QueryFailed(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::ENV_MUTEX;
    use std::str::FromStr;

    fn client(server_url: &str) -> BigQueryClient {
        std::env::set_var("GOOGLE_OAUTH_ACCESS_TOKEN", "test-token");
        BigQueryClient::new(
            Some(server_url.to_string()),
            ProjectId::from_str("acme-backup").unwrap(),
            "EU",
            "eu",
            Arc::new(AccessTokenProvider::new()),
        )
    }

    fn dataset_ref(project: &str, dataset: &str) -> DatasetRef {
        DatasetRef {
            project_id: ProjectId::from_str(project).unwrap(),
            dataset_id: DatasetId::from_str(dataset).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_list_base_tables() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/acme-backup/queries")
            .with_status(200)
            .with_body(
                r#"{
                    "jobReference": {"jobId": "job_1"},
                    "jobComplete": true,
                    "rows": [
                        {"f": [{"v": "acme-eu"}, {"v": "billing"}, {"v": "invoices"}]},
                        {"f": [{"v": "acme-eu"}, {"v": "billing"}, {"v": "customers"}]}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let tables = client
            .list_base_tables(&ProjectId::from_str("acme-eu").unwrap())
            .await
            .unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].to_string(), "acme-eu.billing.invoices");
        assert_eq!(tables[1].to_string(), "acme-eu.billing.customers");
    }

    #[tokio::test]
    async fn test_query_bad_request_preserves_reason() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/acme-backup/queries")
            .with_status(400)
            .with_body(
                r#"{"error": {"code": 400, "message": "Already Exists: Table t_20240305",
                    "errors": [{"reason": "duplicate", "message": "Already Exists: Table t_20240305"}]}}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let err = client.execute("CREATE SNAPSHOT TABLE x").await.unwrap_err();
        match err {
            BackupError::Warehouse(WarehouseError::BadRequest { reason, message }) => {
                assert_eq!(reason.as_deref(), Some("duplicate"));
                assert!(message.contains("Already Exists"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_inline_errors_become_bad_request() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/acme-backup/queries")
            .with_status(200)
            .with_body(
                r#"{"jobReference": {"jobId": "job_2"}, "jobComplete": true,
                    "errors": [{"reason": "invalid", "message": "Invalid syntax"}]}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let err = client.execute("NOT SQL").await.unwrap_err();
        assert!(matches!(
            err,
            BackupError::Warehouse(WarehouseError::BadRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_dataset_absent() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/projects/acme-backup/datasets/acme_eu_billing")
            .with_status(404)
            .with_body(r#"{"error": {"code": 404, "message": "Not found"}}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let result = client
            .get_dataset(&dataset_ref("acme-backup", "acme_eu_billing"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_dataset_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/projects/acme-backup/datasets/acme_eu_billing")
            .with_status(200)
            .with_body(
                r#"{"datasetReference": {"projectId": "acme-backup", "datasetId": "acme_eu_billing"}, "location": "EU"}"#,
            )
            .create_async()
            .await;

        let client = client(&server.url());
        let info = client
            .get_dataset(&dataset_ref("acme-backup", "acme_eu_billing"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.location.as_deref(), Some("EU"));
    }

    #[tokio::test]
    async fn test_create_dataset_conflict_is_exists_ok() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/acme-backup/datasets")
            .with_status(409)
            .with_body(r#"{"error": {"code": 409, "message": "Already Exists: Dataset"}}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let info = client
            .create_dataset(&dataset_ref("acme-backup", "acme_eu_billing"), "EU")
            .await
            .unwrap();
        assert_eq!(info.dataset.dataset_id.as_str(), "acme_eu_billing");
    }

    #[tokio::test]
    async fn test_create_dataset_other_error_is_fatal() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/acme-backup/datasets")
            .with_status(500)
            .with_body(r#"{"error": {"code": 500, "message": "backend error"}}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        let err = client
            .create_dataset(&dataset_ref("acme-backup", "acme_eu_billing"), "EU")
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::DatasetCreate(_)));
    }
}
