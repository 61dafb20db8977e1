//! Integration tests for the trigger handler
//!
//! Exercises the full envelope -> dataset -> snapshot path against
//! recording fakes, including the benign failure classifications.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tablesnap::adapters::queue::PushEnvelope;
use tablesnap::adapters::warehouse::{DatasetInfo, DatasetStore, QueryExecutor, QueryOutcome};
use tablesnap::core::trigger::{BadRequestKind, TriggerHandler, TriggerOutcome};
use tablesnap::domain::{
    BackupError, BackupRequest, DatasetId, DatasetRef, ProjectId, Result, TableId, TableRef,
    WarehouseError,
};
use test_case::test_case;

/// Warehouse fake recording every call in order
struct RecordingWarehouse {
    dataset_exists: bool,
    query_failure: Option<(Option<String>, String)>,
    calls: Mutex<Vec<String>>,
}

impl RecordingWarehouse {
    fn new(dataset_exists: bool, query_failure: Option<(Option<String>, String)>) -> Arc<Self> {
        Arc::new(Self {
            dataset_exists,
            query_failure,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DatasetStore for RecordingWarehouse {
    async fn get_dataset(&self, dataset: &DatasetRef) -> Result<Option<DatasetInfo>> {
        self.calls.lock().unwrap().push(format!("get {dataset}"));
        Ok(self.dataset_exists.then(|| DatasetInfo {
            dataset: dataset.clone(),
            location: Some("EU".to_string()),
        }))
    }

    async fn create_dataset(&self, dataset: &DatasetRef, location: &str) -> Result<DatasetInfo> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {dataset} in {location}"));
        Ok(DatasetInfo {
            dataset: dataset.clone(),
            location: Some(location.to_string()),
        })
    }
}

#[async_trait]
impl QueryExecutor for RecordingWarehouse {
    async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        self.calls.lock().unwrap().push(format!("query {sql}"));
        match &self.query_failure {
            Some((reason, message)) => Err(BackupError::Warehouse(WarehouseError::BadRequest {
                reason: reason.clone(),
                message: message.clone(),
            })),
            None => Ok(QueryOutcome {
                job_id: Some("job-1".to_string()),
                total_rows: Some(0),
            }),
        }
    }
}

fn invoices_request() -> BackupRequest {
    BackupRequest::for_table(
        &TableRef {
            project_id: ProjectId::from_str("acme-eu").unwrap(),
            dataset_id: DatasetId::from_str("billing").unwrap(),
            table_id: TableId::from_str("invoices").unwrap(),
        },
        &ProjectId::from_str("acme-backup").unwrap(),
    )
    .unwrap()
}

fn envelope_for(request: &BackupRequest) -> PushEnvelope {
    let encoded = BASE64.encode(serde_json::to_vec(request).unwrap());
    let raw = format!(r#"{{"message": {{"data": "{encoded}", "messageId": "42"}}}}"#);
    PushEnvelope::from_json(&raw).unwrap()
}

fn handler(warehouse: Arc<RecordingWarehouse>) -> TriggerHandler {
    TriggerHandler::new(warehouse.clone(), warehouse, "EU")
}

#[tokio::test]
async fn test_existing_dataset_is_not_recreated() {
    let warehouse = RecordingWarehouse::new(true, None);
    let outcome = handler(warehouse.clone())
        .handle(&envelope_for(&invoices_request()))
        .await
        .unwrap();

    assert!(matches!(outcome, TriggerOutcome::Completed { .. }));
    let calls = warehouse.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], "get acme-backup.acme_eu_billing");
    assert!(calls[1].starts_with("query "));
}

#[tokio::test]
async fn test_absent_dataset_is_created_exactly_once_before_query() {
    let warehouse = RecordingWarehouse::new(false, None);
    handler(warehouse.clone())
        .handle(&envelope_for(&invoices_request()))
        .await
        .unwrap();

    let calls = warehouse.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], "get acme-backup.acme_eu_billing");
    assert_eq!(calls[1], "create acme-backup.acme_eu_billing in EU");
    assert!(calls[2].starts_with("query "));
}

#[tokio::test]
async fn test_snapshot_query_names_source_and_target() {
    let warehouse = RecordingWarehouse::new(true, None);
    handler(warehouse.clone())
        .handle(&envelope_for(&invoices_request()))
        .await
        .unwrap();

    let calls = warehouse.calls();
    let sql = calls[1].strip_prefix("query ").unwrap();
    assert!(sql.starts_with("CREATE SNAPSHOT TABLE `acme-backup.acme_eu_billing.invoices_"));
    assert!(sql.contains("CLONE `acme-eu.billing.invoices`"));
    assert!(sql.contains("expiration_timestamp"));
}

#[test_case(None, "Already Exists: Table acme-backup:acme_eu_billing.invoices_20260827", BadRequestKind::DuplicateSnapshot; "duplicate by message")]
#[test_case(None, "Access Denied: bigquery.tables.deleteSnapshot", BadRequestKind::PermissionDenied; "denied by message")]
#[test_case(Some("duplicate"), "whatever the text says", BadRequestKind::DuplicateSnapshot; "duplicate by reason code")]
#[test_case(Some("accessDenied"), "whatever the text says", BadRequestKind::PermissionDenied; "denied by reason code")]
#[tokio::test]
async fn test_benign_bad_requests_complete_without_error(
    reason: Option<&str>,
    message: &str,
    expected: BadRequestKind,
) {
    let warehouse = RecordingWarehouse::new(
        true,
        Some((reason.map(String::from), message.to_string())),
    );
    let outcome = handler(warehouse)
        .handle(&envelope_for(&invoices_request()))
        .await
        .unwrap();

    assert_eq!(outcome, TriggerOutcome::BenignNoop(expected));
}

#[tokio::test]
async fn test_unclassified_bad_request_propagates() {
    let warehouse = RecordingWarehouse::new(
        true,
        Some((Some("invalidQuery".to_string()), "Syntax error at [1:8]".to_string())),
    );
    let err = handler(warehouse)
        .handle(&envelope_for(&invoices_request()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackupError::Warehouse(WarehouseError::BadRequest { .. })
    ));
    assert!(err.to_string().contains("Syntax error"));
}

#[tokio::test]
async fn test_malformed_envelope_fails_before_any_warehouse_call() {
    let warehouse = RecordingWarehouse::new(true, None);
    let envelope = PushEnvelope::from_json(r#"{"message": {"data": "!!not base64!!"}}"#).unwrap();

    let err = handler(warehouse.clone()).handle(&envelope).await.unwrap_err();
    assert!(matches!(err, BackupError::MalformedMessage(_)));
    assert!(warehouse.calls().is_empty());
}
