//! Saga Definitions and Message Routing
//!
//! Declares, for one saga type, which inbound messages and events map to which
//! handler, which messages may create a new instance, and how a fresh instance
//! is configured. A dispatcher consults the sealed definition to decide which
//! saga, which instance and which handler a message belongs to.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! // 1. Describe the saga
//! impl Saga for OrderSaga {
//!     fn started_by() -> Vec<&'static str> { vec![OrderCreated::schema_name()] }
//!     fn register_all_handlers(def: &OpenDefinition<Self>) -> Result<(), RegistrarError> {
//!         def.handle_message::<OrderCreated>(handler!(OrderSaga::on_created))
//!     }
//! }
//!
//! // 2. Register it with the bus and freeze it
//! let def = OpenDefinition::<OrderSaga>::register(registrar, DefinitionOptions::default())?
//!     .with_configuration(|saga| saga.with_repo(repo.clone()))
//!     .seal()?;
//!
//! // 3. Route inbound messages
//! if def.should_start_new_saga(&msg) {
//!     let mut instance = def.new_instance();
//!     instance.invoke(exchange, routing_key, &msg)?;
//! }
//! ```

#![warn(missing_docs)]

// === Core Types ===
mod errors;
mod filter;
mod handler;
mod instance;
mod message;

// === Traits ===
mod registrar;
mod saga;

// === Definition ===
mod definition;

// === Observability ===
mod stats;

// === Test Support ===
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// === Re-exports ===

// Types
pub use filter::Filter;
pub use handler::{resolve_handler_name, Handler, HandlerBinding, HandlerFn};
pub use instance::{SagaId, SagaInstance};
pub use message::{BusMessage, Message};

// Definition (typestate)
pub use definition::{
    ConfFn, DefinitionOptions, DefinitionPhase, Open, OpenDefinition, SagaDefinition, Sealed,
    SealedDefinition,
};

// Errors
pub use errors::{DefinitionError, HandlerError, RegistrarError, SetupError};

// Traits
pub use registrar::Registrar;
pub use saga::Saga;

// Observability
pub use stats::{DefinitionStats, DefinitionStatsSnapshot};
