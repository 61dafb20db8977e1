//! Configuration schema types
//!
//! This module defines the configuration structure for tablesnap.

use serde::{Deserialize, Serialize};

/// Main tablesnap configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesnapConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Scanner settings (source projects, flow control, batching)
    pub scan: ScanConfig,

    /// Backup destination settings
    pub backup: BackupConfig,

    /// Pub/Sub topic settings
    pub pubsub: PubSubConfig,

    /// BigQuery endpoint settings
    #[serde(default)]
    pub bigquery: BigQueryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TablesnapConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.scan.validate()?;
        self.backup.validate()?;
        self.pubsub.validate()?;
        self.bigquery.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Source projects to scan for base tables, in scan order
    pub source_projects: Vec<String>,

    /// INFORMATION_SCHEMA region qualifier (e.g. "eu", "us")
    #[serde(default = "default_region")]
    pub region: String,

    /// Maximum unacknowledged publishes in flight.
    /// Tuned to the downstream concurrent snapshot-query quota.
    #[serde(default = "default_max_in_flight_messages")]
    pub max_in_flight_messages: usize,

    /// Maximum bytes of payload buffered in unacknowledged publishes
    #[serde(default = "default_max_in_flight_bytes")]
    pub max_in_flight_bytes: usize,

    /// Maximum bytes per publish batch before a flush is forced
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,

    /// Maximum time a message may wait in a partial batch
    #[serde(default = "default_max_batch_latency_ms")]
    pub max_batch_latency_ms: u64,

    /// Optional bound on the terminal wait for publish acknowledgements.
    /// Unset means wait forever, matching the block-until-acked contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain_timeout_seconds: Option<u64>,
}

impl ScanConfig {
    fn validate(&self) -> Result<(), String> {
        if self.source_projects.is_empty() {
            return Err("scan.source_projects cannot be empty".to_string());
        }
        for project in &self.source_projects {
            crate::domain::ProjectId::new(project.clone())
                .map_err(|e| format!("Invalid source project: {e}"))?;
        }
        if self.region.is_empty() {
            return Err("scan.region cannot be empty".to_string());
        }
        if !self
            .region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(format!("Invalid scan.region '{}'", self.region));
        }
        if self.max_in_flight_messages == 0 {
            return Err("scan.max_in_flight_messages must be at least 1".to_string());
        }
        if self.max_in_flight_bytes == 0 {
            return Err("scan.max_in_flight_bytes must be at least 1".to_string());
        }
        if self.max_batch_bytes == 0 {
            return Err("scan.max_batch_bytes must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Backup destination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Project that owns the backup datasets and snapshots
    pub project_id: String,

    /// Location for created datasets and query jobs (e.g. "EU", "US")
    #[serde(default = "default_location")]
    pub location: String,
}

impl BackupConfig {
    fn validate(&self) -> Result<(), String> {
        crate::domain::ProjectId::new(self.project_id.clone())
            .map_err(|e| format!("Invalid backup project: {e}"))?;
        if self.location.is_empty() {
            return Err("backup.location cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Pub/Sub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    /// Project that owns the topic
    pub project_id: String,

    /// Topic the scanner publishes backup requests to
    pub topic_id: String,

    /// Endpoint override for emulators and tests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl PubSubConfig {
    fn validate(&self) -> Result<(), String> {
        crate::domain::ProjectId::new(self.project_id.clone())
            .map_err(|e| format!("Invalid pubsub project: {e}"))?;
        if self.topic_id.is_empty() {
            return Err("pubsub.topic_id cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| format!("Invalid pubsub.endpoint '{endpoint}': {e}"))?;
        }
        Ok(())
    }

    /// Fully-qualified topic name as the publish API expects it
    pub fn topic_name(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.topic_id)
    }
}

/// BigQuery endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BigQueryConfig {
    /// Endpoint override for emulators and tests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl BigQueryConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| format!("Invalid bigquery.endpoint '{endpoint}': {e}"))?;
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable file logging in addition to console output
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Log rotation policy: "daily" or "hourly"
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path is required when local_enabled = true".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_region() -> String {
    "eu".to_string()
}

fn default_location() -> String {
    "EU".to_string()
}

// Matches the concurrent snapshot-query quota on the backup project.
fn default_max_in_flight_messages() -> usize {
    30
}

fn default_max_in_flight_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_max_batch_bytes() -> usize {
    2_048_000
}

fn default_max_batch_latency_ms() -> u64 {
    5_000
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}
