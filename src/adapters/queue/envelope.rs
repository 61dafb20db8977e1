//! Pub/Sub push envelope decoding
//!
//! The trigger receives one envelope per invocation. Two shapes are
//! accepted: the push-subscription form (`{"message": {"data": ...},
//! "subscription": ...}`) and the bare event form (`{"data": ...}`) used
//! by queue-triggered function runtimes.

use crate::domain::{BackupError, BackupRequest, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

/// Incoming message envelope
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    /// Push-subscription form
    #[serde(default)]
    pub message: Option<EnvelopeMessage>,

    /// Subscription path, present in the push form
    #[serde(default)]
    pub subscription: Option<String>,

    /// Bare event form
    #[serde(default)]
    pub data: Option<String>,
}

/// The message within a push-form envelope
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeMessage {
    /// Base64-encoded payload
    #[serde(default)]
    pub data: Option<String>,

    /// Broker-assigned message id
    #[serde(default, rename = "messageId", alias = "message_id")]
    pub message_id: Option<String>,
}

impl PushEnvelope {
    /// Parse an envelope from raw JSON
    ///
    /// # Errors
    ///
    /// Returns `BackupError::MalformedMessage` if the input is not valid
    /// JSON of either accepted shape.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| BackupError::MalformedMessage(format!("invalid envelope JSON: {e}")))
    }

    /// Broker message id, when present
    pub fn message_id(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.message_id.as_deref())
    }

    /// Decode the payload into a backup request
    ///
    /// # Errors
    ///
    /// Returns `BackupError::MalformedMessage` if no payload is present,
    /// the base64 does not decode, or the JSON does not match the
    /// `BackupRequest` shape.
    pub fn decode_backup_request(&self) -> Result<BackupRequest> {
        let encoded = self
            .message
            .as_ref()
            .and_then(|m| m.data.as_deref())
            .or(self.data.as_deref())
            .ok_or_else(|| {
                BackupError::MalformedMessage("message contains no data".to_string())
            })?;

        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| BackupError::MalformedMessage(format!("invalid base64 payload: {e}")))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            BackupError::MalformedMessage(format!("payload is not a backup request: {e}"))
        })
    }
}
