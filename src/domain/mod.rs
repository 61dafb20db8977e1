//! Domain models and types for tablesnap.
//!
//! This module contains the core domain models, types, and business rules.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ProjectId`], [`DatasetId`], [`TableId`])
//! - **The work item** ([`BackupRequest`]) and its derivation rules
//! - **Error types** ([`BackupError`], [`WarehouseError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern with validation, so anything that
//! reaches the snapshot DDL builder has already been checked against the GCP
//! identifier character rules:
//!
//! ```rust
//! use tablesnap::domain::{ProjectId, DatasetId};
//!
//! # fn example() -> Result<(), String> {
//! let project = ProjectId::new("acme-eu")?;
//! assert!(DatasetId::new("billing; DROP TABLE x").is_err());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod request;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{BackupError, WarehouseError};
pub use ids::{DatasetId, ProjectId, TableId};
pub use request::{derive_target_dataset_id, BackupRequest, DatasetRef, TableRef};
pub use result::Result;
