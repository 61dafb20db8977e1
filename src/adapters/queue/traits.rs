//! Queue abstraction trait

use crate::domain::Result;
use async_trait::async_trait;

/// Queue publish seam
///
/// One call publishes one payload and resolves with the server-assigned
/// message id once the publish is acknowledged. Implementations may batch
/// internally; callers only see per-message completion. Flow control is
/// layered on top by the scanner's publish pipeline.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// Publish a payload, waiting for acknowledgement
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Publish` if the broker rejects the message or
    /// is unreachable.
    async fn publish(&self, payload: Vec<u8>) -> Result<String>;
}
