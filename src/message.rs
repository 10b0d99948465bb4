//! Inbound message envelope and message schema names

use serde::{Deserialize, Serialize};

/// A message type that can be routed to a saga.
///
/// The schema name is the fully-qualified payload type name carried on the wire
/// and is what filters and trigger lists are matched against.
pub trait Message: 'static {
    /// Fully-qualified schema name of this message type
    fn schema_name() -> &'static str;
}

/// Envelope for a message delivered by the bus
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Process-unique message identifier
    pub id: u64,
    /// Correlation id linking related messages, 0 when absent
    pub correlation_id: u64,
    /// Fully-qualified payload type name
    pub payload_fqn: Box<str>,
    /// Serialized payload
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Create an envelope for a payload of the given type name
    pub fn new(payload_fqn: impl Into<Box<str>>, payload: Vec<u8>) -> Self {
        Self {
            id: Self::next_id(),
            correlation_id: 0,
            payload_fqn: payload_fqn.into(),
            payload,
        }
    }

    /// Create an envelope for a payload of message type `M`
    pub fn of<M: Message>(payload: Vec<u8>) -> Self {
        Self::new(M::schema_name(), payload)
    }

    /// Set the correlation id
    pub fn with_correlation_id(self, correlation_id: u64) -> Self {
        Self {
            correlation_id,
            ..self
        }
    }

    fn next_id() -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for BusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusMessage")
            .field("id", &self.id)
            .field("correlation_id", &self.correlation_id)
            .field("payload_fqn", &self.payload_fqn)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
