//! Flow-controlled publish pipeline
//!
//! Bounds the number and byte volume of unacknowledged publishes. When a
//! limit is reached, `submit` blocks the producer until an outstanding
//! publish resolves (backpressure, never a drop). `drain` is the terminal
//! barrier: it waits for every outstanding publish and surfaces the first
//! failure to the caller.

use crate::adapters::queue::QueuePublisher;
use crate::domain::{BackupError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Flow-control limits for in-flight publishes
#[derive(Debug, Clone)]
pub struct FlowControl {
    /// Maximum unacknowledged publishes
    pub max_in_flight_messages: usize,

    /// Maximum bytes of unacknowledged payload
    pub max_in_flight_bytes: usize,
}

impl Default for FlowControl {
    fn default() -> Self {
        Self {
            max_in_flight_messages: 30,
            max_in_flight_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Pipeline of in-flight publishes with bounded-buffer backpressure
pub struct PublishPipeline {
    publisher: Arc<dyn QueuePublisher>,
    message_permits: Arc<Semaphore>,
    byte_permits: Arc<Semaphore>,
    byte_budget: usize,
    handles: Vec<JoinHandle<Result<String>>>,
}

impl PublishPipeline {
    /// Create a pipeline over a publisher
    pub fn new(publisher: Arc<dyn QueuePublisher>, flow: FlowControl) -> Self {
        Self {
            publisher,
            message_permits: Arc::new(Semaphore::new(flow.max_in_flight_messages)),
            byte_permits: Arc::new(Semaphore::new(flow.max_in_flight_bytes)),
            byte_budget: flow.max_in_flight_bytes,
            handles: Vec::new(),
        }
    }

    /// Number of publishes submitted so far
    pub fn submitted(&self) -> usize {
        self.handles.len()
    }

    /// Submit one payload for publishing
    ///
    /// Blocks while the in-flight message or byte limit is exhausted. The
    /// publish itself runs in a spawned task; its acknowledgement is
    /// collected by [`drain`](Self::drain).
    pub async fn submit(&mut self, payload: Vec<u8>) -> Result<()> {
        // A payload larger than the whole byte budget still has to fit;
        // clamp its weight so it can acquire the full budget instead of
        // deadlocking.
        let weight = payload.len().min(self.byte_budget).max(1) as u32;

        let message_permit = self
            .message_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BackupError::Publish("publish pipeline closed".to_string()))?;
        let byte_permit = self
            .byte_permits
            .clone()
            .acquire_many_owned(weight)
            .await
            .map_err(|_| BackupError::Publish("publish pipeline closed".to_string()))?;

        let publisher = self.publisher.clone();
        self.handles.push(tokio::spawn(async move {
            let result = publisher.publish(payload).await;
            drop(byte_permit);
            drop(message_permit);
            match &result {
                Ok(message_id) => {
                    tracing::info!(message_id = %message_id, "Publish acknowledged");
                }
                Err(error) => {
                    tracing::error!(error = %error, "Publish failed");
                }
            }
            result
        }));

        Ok(())
    }

    /// Wait for every outstanding publish to resolve
    ///
    /// Returns the number of acknowledged messages. If any publish failed,
    /// the first failure is returned after all have resolved, so no
    /// in-flight message is abandoned by an early exit.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Publish` on the first publish failure, or if
    /// `timeout` elapses before all publishes resolve.
    pub async fn drain(self, timeout: Option<Duration>) -> Result<usize> {
        let wait_all = futures::future::join_all(self.handles);
        let results = match timeout {
            Some(limit) => tokio::time::timeout(limit, wait_all).await.map_err(|_| {
                BackupError::Publish(format!(
                    "timed out after {}s waiting for publish acknowledgements",
                    limit.as_secs()
                ))
            })?,
            None => wait_all.await,
        };

        let mut acknowledged = 0usize;
        let mut first_failure: Option<BackupError> = None;
        for result in results {
            match result {
                Ok(Ok(_)) => acknowledged += 1,
                Ok(Err(error)) => {
                    if first_failure.is_none() {
                        first_failure = Some(error);
                    }
                }
                Err(join_error) => {
                    if first_failure.is_none() {
                        first_failure =
                            Some(BackupError::Publish(format!("publish task panicked: {join_error}")));
                    }
                }
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(acknowledged),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Publisher that tracks how many publishes are outstanding at once
    struct TrackingPublisher {
        outstanding: AtomicUsize,
        peak: AtomicUsize,
        fail_on: Option<usize>,
        published: AtomicUsize,
    }

    impl TrackingPublisher {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                outstanding: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                fail_on,
                published: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueuePublisher for TrackingPublisher {
        async fn publish(&self, _payload: Vec<u8>) -> Result<String> {
            let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.outstanding.fetch_sub(1, Ordering::SeqCst);

            let sequence = self.published.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(sequence) {
                return Err(BackupError::Publish("broker unavailable".to_string()));
            }
            Ok(format!("msg-{sequence}"))
        }
    }

    #[tokio::test]
    async fn test_outstanding_publishes_never_exceed_limit() {
        let publisher = Arc::new(TrackingPublisher::new(None));
        let mut pipeline = PublishPipeline::new(
            publisher.clone(),
            FlowControl {
                max_in_flight_messages: 3,
                max_in_flight_bytes: 1024 * 1024,
            },
        );

        for i in 0..20 {
            pipeline.submit(format!("payload-{i}").into_bytes()).await.unwrap();
        }
        let acknowledged = pipeline.drain(None).await.unwrap();

        assert_eq!(acknowledged, 20);
        assert!(publisher.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_byte_budget_limits_concurrency() {
        let publisher = Arc::new(TrackingPublisher::new(None));
        // 100-byte payloads against a 250-byte budget: at most 2 in flight.
        let mut pipeline = PublishPipeline::new(
            publisher.clone(),
            FlowControl {
                max_in_flight_messages: 100,
                max_in_flight_bytes: 250,
            },
        );

        for _ in 0..10 {
            pipeline.submit(vec![0u8; 100]).await.unwrap();
        }
        pipeline.drain(None).await.unwrap();

        assert!(publisher.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_oversized_payload_does_not_deadlock() {
        let publisher = Arc::new(TrackingPublisher::new(None));
        let mut pipeline = PublishPipeline::new(
            publisher.clone(),
            FlowControl {
                max_in_flight_messages: 4,
                max_in_flight_bytes: 64,
            },
        );

        pipeline.submit(vec![0u8; 1024]).await.unwrap();
        pipeline.submit(vec![0u8; 1024]).await.unwrap();
        assert_eq!(pipeline.drain(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_drain_surfaces_first_failure() {
        let publisher = Arc::new(TrackingPublisher::new(Some(2)));
        let mut pipeline = PublishPipeline::new(publisher, FlowControl::default());

        for i in 0..5 {
            pipeline.submit(format!("payload-{i}").into_bytes()).await.unwrap();
        }
        let err = pipeline.drain(None).await.unwrap_err();
        assert!(matches!(err, BackupError::Publish(_)));
        assert!(err.to_string().contains("broker unavailable"));
    }

    #[tokio::test]
    async fn test_drain_timeout() {
        struct HangingPublisher;

        #[async_trait]
        impl QueuePublisher for HangingPublisher {
            async fn publish(&self, _payload: Vec<u8>) -> Result<String> {
                futures::future::pending().await
            }
        }

        let mut pipeline = PublishPipeline::new(Arc::new(HangingPublisher), FlowControl::default());
        pipeline.submit(b"payload".to_vec()).await.unwrap();

        let err = pipeline
            .drain(Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
