//! Error types for registration, sealing and handler invocation

use serde::{Deserialize, Serialize};

/// Error returned by the bus registrar when subscribing a saga
///
/// Passed back to the caller of `handle_message`/`handle_event` unmodified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RegistrarError {
    /// The bus refused the subscription
    #[error("subscription for {name} rejected: {reason}")]
    Rejected {
        /// Message or topic that was being subscribed
        name: Box<str>,
        /// Error description
        reason: Box<str>,
    },
    /// The transport could not be reached
    #[error("registrar unavailable: {0}")]
    Unavailable(Box<str>),
}

/// Error raised while building or sealing a saga definition
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// A trigger names a message no binding handles
    #[error("saga {saga_type} is started by {trigger} but has no handler bound to it")]
    UnboundTrigger {
        /// Saga type FQN
        saga_type: Box<str>,
        /// The trigger message name
        trigger: Box<str>,
    },
    /// A handler name could not be recovered from the callable
    #[error("cannot resolve a method name from {symbol}")]
    UnresolvableHandler {
        /// The symbol that was inspected
        symbol: Box<str>,
    },
}

/// Error from wiring a saga type end to end
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// The registrar refused a subscription
    #[error(transparent)]
    Registrar(#[from] RegistrarError),
    /// The definition could not be sealed
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Error from a saga handler
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum HandlerError {
    /// Temporary error - the dispatcher may redeliver
    #[error("retriable failure in {handler}: {reason}")]
    Retriable {
        /// Handler name
        handler: Box<str>,
        /// Error description
        reason: Box<str>,
    },
    /// Permanent error - do not redeliver
    #[error("terminal failure in {handler}: {reason}")]
    Terminal {
        /// Handler name
        handler: Box<str>,
        /// Error description
        reason: Box<str>,
    },
}

impl HandlerError {
    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Retriable { .. })
    }

    /// Name of the handler that failed
    pub fn handler(&self) -> &str {
        match self {
            Self::Retriable { handler, .. } | Self::Terminal { handler, .. } => handler,
        }
    }
}
