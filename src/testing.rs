//! Test doubles for wiring sagas without a live bus

use crate::{Registrar, RegistrarError};
use parking_lot::Mutex;

/// A subscription requested through [`RecordingRegistrar`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Subscription {
    /// Point-to-point message on the service queue
    Message {
        /// Message schema name
        msg_name: Box<str>,
    },
    /// Event on an exchange and topic
    Event {
        /// Exchange name
        exchange: Box<str>,
        /// Topic or routing key
        topic: Box<str>,
        /// Message schema name, empty for topic-wide subscriptions
        msg_name: Box<str>,
    },
}

/// In-memory registrar that records every subscription
pub struct RecordingRegistrar {
    service_name: Box<str>,
    subscriptions: Mutex<Vec<Subscription>>,
    reject: Mutex<Option<Box<str>>>,
}

impl RecordingRegistrar {
    /// Registrar for a service queue named `service_name`
    pub fn new(service_name: impl Into<Box<str>>) -> Self {
        Self {
            service_name: service_name.into(),
            subscriptions: Mutex::new(Vec::new()),
            reject: Mutex::new(None),
        }
    }

    /// Reject any subscription for `msg_name` from now on
    pub fn reject(&self, msg_name: impl Into<Box<str>>) {
        *self.reject.lock() = Some(msg_name.into());
    }

    /// Subscriptions accepted so far, in call order
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.lock().clone()
    }

    fn record(&self, msg_name: &str, subscription: Subscription) -> Result<(), RegistrarError> {
        if self.reject.lock().as_deref() == Some(msg_name) {
            return Err(RegistrarError::Rejected {
                name: msg_name.into(),
                reason: "rejected by test registrar".into(),
            });
        }
        self.subscriptions.lock().push(subscription);
        Ok(())
    }
}

impl Registrar for RecordingRegistrar {
    fn service_name(&self) -> &str {
        &self.service_name
    }

    fn register_message(&self, msg_name: &str) -> Result<(), RegistrarError> {
        self.record(
            msg_name,
            Subscription::Message {
                msg_name: msg_name.into(),
            },
        )
    }

    fn register_event(
        &self,
        exchange: &str,
        topic: &str,
        msg_name: &str,
    ) -> Result<(), RegistrarError> {
        self.record(
            msg_name,
            Subscription::Event {
                exchange: exchange.into(),
                topic: topic.into(),
                msg_name: msg_name.into(),
            },
        )
    }
}

/// Install a fmt subscriber honoring `RUST_LOG`; safe to call from every test
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
