//! Result type alias for tablesnap
//!
//! This module provides a convenient Result type alias that uses BackupError
//! as the error type.

use super::errors::BackupError;

/// Result type alias for tablesnap operations
///
/// This is a convenience type alias that uses `BackupError` as the error type.
/// Use this throughout the codebase for fallible operations.
pub type Result<T> = std::result::Result<T, BackupError>;
