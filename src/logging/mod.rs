//! Logging and observability
//!
//! Structured logging via the `tracing` stack: a console layer always, and
//! an optional rolling JSON file layer for batch-job runs.
//!
//! # Example
//!
//! ```no_run
//! use tablesnap::logging::init_logging;
//! use tablesnap::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};
