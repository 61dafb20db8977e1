//! External system integrations for tablesnap.
//!
//! This module provides adapters for the systems the pipeline depends on:
//!
//! - [`warehouse`] - BigQuery catalog, dataset and query access (trait-based)
//! - [`queue`] - Pub/Sub publishing and push envelope decoding
//! - [`gcp`] - Shared token acquisition
//!
//! # Design Pattern
//!
//! Adapters follow the adapter pattern to isolate external dependencies and
//! enable testing with fake implementations. The scanner and trigger only
//! ever see the traits; the REST clients are wired in by the CLI commands.

pub mod gcp;
pub mod queue;
pub mod warehouse;
