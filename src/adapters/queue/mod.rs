//! Queue integration
//!
//! The publish seam ([`QueuePublisher`]), the Pub/Sub REST implementation
//! with background batching, and push envelope decoding for the trigger.

pub mod envelope;
pub mod pubsub;
pub mod traits;

pub use envelope::{EnvelopeMessage, PushEnvelope};
pub use pubsub::{BatchSettings, PubSubPublisher};
pub use traits::QueuePublisher;
