//! # tablesnap - BigQuery table snapshot backup pipeline
//!
//! tablesnap is a two-stage fan-out workflow that backs up every base
//! table across a set of BigQuery projects into a dedicated backup
//! project, one point-in-time snapshot per table per day.
//!
//! ## Overview
//!
//! - **Scanner**: enumerates base tables in each source project and
//!   publishes one backup request per table to a Pub/Sub topic, under a
//!   flow-control limit matched to the concurrent snapshot-query quota.
//! - **Trigger**: consumes one request per invocation, ensures the target
//!   dataset exists, and issues an idempotent snapshot-creation DDL with a
//!   one-day expiration. Duplicate and permission-denied outcomes are
//!   benign; everything else propagates to the invoking runtime.
//!
//! ## Architecture
//!
//! tablesnap follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (scanner pipeline, trigger state machine)
//! - [`adapters`] - External integrations (BigQuery, Pub/Sub, token auth)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tablesnap::adapters::queue::PubSubPublisher;
//! use tablesnap::core::scanner::Scanner;
//! use tablesnap::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tablesnap.toml")?;
//! // Build clients from config, then:
//! // let summary = scanner.scan_and_enqueue().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`] with
//! [`domain::BackupError`]; adapters never leak third-party error types.
//! Benign trigger outcomes (today's snapshot already exists, overwrite
//! denied) are modeled as successful [`core::trigger::TriggerOutcome`]
//! values, not errors.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
