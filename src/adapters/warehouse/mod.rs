//! Warehouse integration
//!
//! Trait seams ([`TableCatalog`], [`DatasetStore`], [`QueryExecutor`]) and
//! the BigQuery REST implementation behind them.

pub mod bigquery;
pub mod models;
pub mod traits;

pub use bigquery::BigQueryClient;
pub use traits::{DatasetInfo, DatasetStore, QueryExecutor, QueryOutcome, TableCatalog};
