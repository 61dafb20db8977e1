//! Configuration management for tablesnap.
//!
//! TOML-based configuration loading, parsing, and validation with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `TABLESNAP_*` environment variable overrides
//! - Default values for optional settings
//! - Comprehensive validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [scan]
//! source_projects = ["acme-eu", "acme-us"]
//! region = "eu"
//! max_in_flight_messages = 30
//!
//! [backup]
//! project_id = "acme-backup"
//! location = "EU"
//!
//! [pubsub]
//! project_id = "acme-backup"
//! topic_id = "backup-requests"
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tablesnap::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tablesnap.toml")?;
//! println!("Backup project: {}", config.backup.project_id);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, BackupConfig, BigQueryConfig, LoggingConfig, PubSubConfig, ScanConfig,
    TablesnapConfig,
};
