//! Pub/Sub REST publisher with background batching
//!
//! Messages are accumulated by a background task and flushed as one
//! `topics.publish` call when the batch reaches `max_bytes` or has waited
//! `max_latency`, whichever comes first. Each caller gets back the
//! server-assigned id for its own message.

use crate::adapters::gcp::AccessTokenProvider;
use crate::adapters::queue::traits::QueuePublisher;
use crate::domain::{BackupError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

const DEFAULT_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// Batching knobs for the publisher
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Flush once the encoded batch reaches this many payload bytes
    pub max_bytes: usize,

    /// Flush once the oldest message has waited this long
    pub max_latency: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_bytes: 2_048_000,
            max_latency: Duration::from_secs(5),
        }
    }
}

struct PendingMessage {
    payload: Vec<u8>,
    done: oneshot::Sender<Result<String>>,
}

/// Pub/Sub publisher
///
/// Cheap to clone is not needed; share via `Arc`. Dropping the publisher
/// closes the channel; the batcher flushes what it holds and exits.
pub struct PubSubPublisher {
    tx: mpsc::Sender<PendingMessage>,
}

impl PubSubPublisher {
    /// Create a publisher and spawn its batcher task
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Endpoint override for emulators/tests
    /// * `topic_name` - Fully-qualified topic (`projects/{p}/topics/{t}`)
    /// * `batch` - Batch size/latency settings
    /// * `auth` - Shared token provider
    pub fn new(
        endpoint: Option<String>,
        topic_name: String,
        batch: BatchSettings,
        auth: Arc<AccessTokenProvider>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let worker = BatchWorker {
            http_client: reqwest::Client::new(),
            publish_url: format!(
                "{}/v1/{}:publish",
                endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                    .trim_end_matches('/'),
                topic_name
            ),
            batch,
            auth,
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }
}

#[async_trait]
impl QueuePublisher for PubSubPublisher {
    async fn publish(&self, payload: Vec<u8>) -> Result<String> {
        let (done, ack) = oneshot::channel();
        self.tx
            .send(PendingMessage { payload, done })
            .await
            .map_err(|_| BackupError::Publish("publisher is shut down".to_string()))?;

        ack.await
            .map_err(|_| BackupError::Publish("publish dropped before acknowledgement".to_string()))?
    }
}

struct BatchWorker {
    http_client: reqwest::Client,
    publish_url: String,
    batch: BatchSettings,
    auth: Arc<AccessTokenProvider>,
}

#[derive(Serialize)]
struct PublishRequest {
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct WireMessage {
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

impl BatchWorker {
    async fn run(self, mut rx: mpsc::Receiver<PendingMessage>) {
        let mut pending: Vec<PendingMessage> = Vec::new();
        let mut pending_bytes = 0usize;
        // Deadline of the oldest message in the current batch.
        let mut deadline: Option<Instant> = None;

        loop {
            let received = match deadline {
                None => rx.recv().await,
                Some(at) => match tokio::time::timeout_at(at, rx.recv()).await {
                    Ok(msg) => msg,
                    Err(_) => {
                        self.flush(&mut pending, &mut pending_bytes).await;
                        deadline = None;
                        continue;
                    }
                },
            };

            match received {
                Some(msg) => {
                    pending_bytes += msg.payload.len();
                    pending.push(msg);
                    if deadline.is_none() {
                        deadline = Some(Instant::now() + self.batch.max_latency);
                    }
                    if pending_bytes >= self.batch.max_bytes {
                        self.flush(&mut pending, &mut pending_bytes).await;
                        deadline = None;
                    }
                }
                None => {
                    self.flush(&mut pending, &mut pending_bytes).await;
                    return;
                }
            }
        }
    }

    async fn flush(&self, pending: &mut Vec<PendingMessage>, pending_bytes: &mut usize) {
        if pending.is_empty() {
            return;
        }
        let batch: Vec<PendingMessage> = std::mem::take(pending);
        *pending_bytes = 0;

        tracing::debug!(batch_size = batch.len(), "Flushing publish batch");

        match self.publish_batch(&batch).await {
            Ok(ids) if ids.len() == batch.len() => {
                for (msg, id) in batch.into_iter().zip(ids) {
                    let _ = msg.done.send(Ok(id));
                }
            }
            Ok(ids) => {
                let err = format!(
                    "broker acknowledged {} of {} messages",
                    ids.len(),
                    batch.len()
                );
                for msg in batch {
                    let _ = msg.done.send(Err(BackupError::Publish(err.clone())));
                }
            }
            Err(err) => {
                let err = err.to_string();
                for msg in batch {
                    let _ = msg.done.send(Err(BackupError::Publish(err.clone())));
                }
            }
        }
    }

    async fn publish_batch(&self, batch: &[PendingMessage]) -> Result<Vec<String>> {
        let token = self.auth.token().await?;
        let request = PublishRequest {
            messages: batch
                .iter()
                .map(|m| WireMessage {
                    data: BASE64.encode(&m.payload),
                })
                .collect(),
        };

        let response = self
            .http_client
            .post(&self.publish_url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackupError::Publish(format!("publish request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackupError::Publish(format!(
                "broker returned {status}: {body}"
            )));
        }

        let parsed: PublishResponse = response
            .json()
            .await
            .map_err(|e| BackupError::Publish(format!("invalid publish response: {e}")))?;
        Ok(parsed.message_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::ENV_MUTEX;

    fn publisher(server_url: &str, batch: BatchSettings) -> PubSubPublisher {
        std::env::set_var("GOOGLE_OAUTH_ACCESS_TOKEN", "test-token");
        PubSubPublisher::new(
            Some(server_url.to_string()),
            "projects/acme-backup/topics/backup-requests".to_string(),
            batch,
            Arc::new(AccessTokenProvider::new()),
        )
    }

    #[tokio::test]
    async fn test_publish_resolves_with_message_id() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1/projects/acme-backup/topics/backup-requests:publish",
            )
            .with_status(200)
            .with_body(r#"{"messageIds": ["101"]}"#)
            .create_async()
            .await;

        let publisher = publisher(
            &server.url(),
            BatchSettings {
                max_bytes: 1,
                max_latency: Duration::from_secs(5),
            },
        );
        let id = publisher.publish(b"payload".to_vec()).await.unwrap();
        assert_eq!(id, "101");
    }

    #[tokio::test]
    async fn test_latency_flush_batches_messages() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1/projects/acme-backup/topics/backup-requests:publish",
            )
            .with_status(200)
            .with_body(r#"{"messageIds": ["1", "2"]}"#)
            .expect(1)
            .create_async()
            .await;

        let publisher = Arc::new(publisher(
            &server.url(),
            BatchSettings {
                max_bytes: 1_000_000,
                max_latency: Duration::from_millis(100),
            },
        ));

        let first = {
            let publisher = publisher.clone();
            tokio::spawn(async move { publisher.publish(b"one".to_vec()).await })
        };
        let second = {
            let publisher = publisher.clone();
            tokio::spawn(async move { publisher.publish(b"two".to_vec()).await })
        };

        // Both land in one batch flushed by the latency timer.
        assert_eq!(first.await.unwrap().unwrap(), "1");
        assert_eq!(second.await.unwrap().unwrap(), "2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_broker_error_fails_all_in_batch() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1/projects/acme-backup/topics/backup-requests:publish",
            )
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let publisher = publisher(
            &server.url(),
            BatchSettings {
                max_bytes: 1,
                max_latency: Duration::from_secs(5),
            },
        );
        let err = publisher.publish(b"payload".to_vec()).await.unwrap_err();
        assert!(matches!(err, BackupError::Publish(_)));
    }
}
