//! Bus-level registrar that subscribes the transport for a saga

use crate::RegistrarError;

/// Subscribes the transport layer to the messages and events a saga handles.
///
/// Called synchronously once per binding while a definition is open. Errors are
/// returned to the caller of the registration method unmodified.
pub trait Registrar: Send + Sync + 'static {
    /// Name of the service; point-to-point messages arrive on this queue
    fn service_name(&self) -> &str;

    /// Subscribe to a point-to-point message
    fn register_message(&self, msg_name: &str) -> Result<(), RegistrarError>;

    /// Subscribe to an event published on an exchange and topic.
    ///
    /// An empty `msg_name` subscribes to every event on the topic.
    fn register_event(
        &self,
        exchange: &str,
        topic: &str,
        msg_name: &str,
    ) -> Result<(), RegistrarError>;
}
