//! Core business logic for tablesnap.
//!
//! # Modules
//!
//! - [`scanner`] - Table discovery and the flow-controlled publish pipeline
//! - [`trigger`] - Per-message backup processing and error classification
//!
//! # Pipeline
//!
//! Scanner -> queue -> Trigger -> warehouse. There is no feedback path:
//! trigger failures are either tolerated (known benign cases) or propagated
//! to the invoking runtime for redelivery.

pub mod scanner;
pub mod trigger;
