//! Capability trait implemented by saga types

use crate::{OpenDefinition, RegistrarError};

/// A long-running process driven by bus messages.
///
/// # Example
///
/// ```rust,ignore
/// impl Saga for OrderSaga {
///     fn started_by() -> Vec<&'static str> {
///         vec![OrderCreated::schema_name()]
///     }
///
///     fn register_all_handlers(def: &OpenDefinition<Self>) -> Result<(), RegistrarError> {
///         def.handle_message::<OrderCreated>(handler!(OrderSaga::on_created))?;
///         def.handle_event::<ShipRequested>("logistics", "shipping", handler!(OrderSaga::on_ship))
///     }
/// }
/// ```
pub trait Saga: Default + Send + 'static {
    /// Message names allowed to create a new instance
    fn started_by() -> Vec<&'static str>;

    /// Register a handler for every message this saga reacts to
    fn register_all_handlers(def: &OpenDefinition<Self>) -> Result<(), RegistrarError>;

    /// Fully-qualified type name, used to identify the saga type
    fn type_fqn() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether the process has finished
    fn is_complete(&self) -> bool {
        false
    }
}
