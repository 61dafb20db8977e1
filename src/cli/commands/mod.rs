//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod scan;
pub mod trigger;
pub mod validate;
