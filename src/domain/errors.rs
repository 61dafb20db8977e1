//! Domain error types
//!
//! This module defines the error hierarchy for tablesnap. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main tablesnap error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catalog query failed for a source project; aborts the scan
    #[error("Catalog query error: {0}")]
    CatalogQuery(String),

    /// Publish to the queue failed; surfaced when draining the pipeline
    #[error("Publish error: {0}")]
    Publish(String),

    /// Queue message had no payload or the payload did not decode
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Dataset creation failed despite exists-ok semantics
    #[error("Dataset create error: {0}")]
    DatasetCreate(String),

    /// Warehouse-level errors (query execution, metadata operations)
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Authentication/token acquisition errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Warehouse-specific errors
///
/// Errors that occur when interacting with the BigQuery REST surface.
/// These errors don't expose the underlying HTTP client types.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Failed to connect to the warehouse endpoint
    #[error("Failed to connect to warehouse: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Bad request from the warehouse; carries the structured reason code
    /// when the API provided one, plus the human-readable message
    #[error("Bad request{}: {message}", .reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    BadRequest {
        reason: Option<String>,
        message: String,
    },

    /// Dataset not found
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// Query execution failed for reasons other than a bad request
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Response could not be deserialized
    #[error("Invalid response from warehouse: {0}")]
    InvalidResponse(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        BackupError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        BackupError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for BackupError {
    fn from(err: toml::de::Error) -> Self {
        BackupError::Configuration(format!("TOML parse error: {err}"))
    }
}
