//! Saga instances

use crate::{BusMessage, HandlerBinding, HandlerError, Saga};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of one saga instance.
///
/// Allocated from a process-wide counter when the instance is created; a
/// persistence layer that reloads instances restores ids through [`SagaId::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SagaId(pub u64);

impl SagaId {
    /// Wrap a raw id, e.g. one restored from storage
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub(crate) fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SagaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "saga-{}", self.0)
    }
}

/// A live saga: its state plus the binding table used to dispatch to it.
///
/// The binding table is shared with the definition and fixed at creation time;
/// bindings registered afterwards never show up here.
pub struct SagaInstance<S> {
    id: SagaId,
    state: S,
    bindings: Arc<[HandlerBinding<S>]>,
}

impl<S> SagaInstance<S> {
    pub(crate) fn new(state: S, bindings: Arc<[HandlerBinding<S>]>) -> Self {
        Self {
            id: SagaId::next(),
            state,
            bindings,
        }
    }

    /// Replace the state with `f(state)`
    pub(crate) fn map_state(self, f: impl FnOnce(S) -> S) -> Self {
        Self {
            id: self.id,
            state: f(self.state),
            bindings: self.bindings,
        }
    }

    /// Instance identity
    pub fn id(&self) -> SagaId {
        self.id
    }

    /// Current saga state
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Mutable access to the saga state
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Consume the instance, keeping only its state
    pub fn into_state(self) -> S {
        self.state
    }

    /// Binding table captured when the instance was created
    pub fn bindings(&self) -> &[HandlerBinding<S>] {
        &self.bindings
    }

    /// Handler names in binding order
    pub fn handler_names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.handler_name()).collect()
    }

    /// Invoke every handler whose filter accepts the delivery, in binding order.
    ///
    /// Returns the number of handlers run. Stops at the first handler error.
    pub fn invoke(
        &mut self,
        exchange: &str,
        routing_key: &str,
        message: &BusMessage,
    ) -> Result<usize, HandlerError> {
        let mut invoked = 0;
        for binding in self.bindings.iter() {
            if !binding
                .filter()
                .accepts(exchange, routing_key, &message.payload_fqn)
            {
                continue;
            }
            tracing::trace!(
                saga_id = %self.id,
                handler = %binding.handler_name(),
                payload_fqn = %message.payload_fqn,
                "Invoking saga handler"
            );
            binding.handler().call(&mut self.state, message)?;
            invoked += 1;
        }
        Ok(invoked)
    }
}

impl<S: Saga> SagaInstance<S> {
    /// Whether the saga has finished
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }
}

impl<S> std::fmt::Debug for SagaInstance<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaInstance")
            .field("id", &self.id)
            .field("handlers", &self.handler_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Filter, Handler};

    #[derive(Default)]
    struct Counter {
        seen: Vec<&'static str>,
    }

    fn bindings() -> Arc<[HandlerBinding<Counter>]> {
        vec![
            HandlerBinding::new(
                Filter::new("", "orders", "OrderCreated"),
                Handler::named("on_created", |c: &mut Counter, _m: &BusMessage| {
                    c.seen.push("on_created");
                    Ok(())
                }),
            ),
            HandlerBinding::new(
                Filter::new("ex", "audit", ""),
                Handler::named("on_any_audit", |c: &mut Counter, _m: &BusMessage| {
                    c.seen.push("on_any_audit");
                    Ok(())
                }),
            ),
            HandlerBinding::new(
                Filter::new("ex", "audit", "Failing"),
                Handler::named("on_failing", |_c: &mut Counter, _m: &BusMessage| {
                    Err(HandlerError::Terminal {
                        handler: "on_failing".into(),
                        reason: "boom".into(),
                    })
                }),
            ),
        ]
        .into()
    }

    #[test]
    fn test_invoke_matching_handler() {
        let mut instance = SagaInstance::new(Counter::default(), bindings());
        let msg = BusMessage::new("OrderCreated", vec![]);

        assert_eq!(instance.invoke("", "orders", &msg).unwrap(), 1);
        assert_eq!(instance.invoke("", "other", &msg).unwrap(), 0);
        assert_eq!(instance.state().seen, vec!["on_created"]);
    }

    #[test]
    fn test_invoke_topic_wide_binding() {
        let mut instance = SagaInstance::new(Counter::default(), bindings());
        let msg = BusMessage::new("SomethingAudited", vec![]);

        assert_eq!(instance.invoke("ex", "audit", &msg).unwrap(), 1);
        assert_eq!(instance.state().seen, vec!["on_any_audit"]);
    }

    #[test]
    fn test_invoke_stops_on_error() {
        let mut instance = SagaInstance::new(Counter::default(), bindings());
        let msg = BusMessage::new("Failing", vec![]);

        let err = instance.invoke("ex", "audit", &msg).unwrap_err();
        assert_eq!(err.handler(), "on_failing");
        // topic-wide binding precedes the failing one
        assert_eq!(instance.state().seen, vec!["on_any_audit"]);
    }

    #[test]
    fn test_instances_get_distinct_ids() {
        let a = SagaInstance::new(Counter::default(), bindings());
        let b = SagaInstance::new(Counter::default(), bindings());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().to_string(), format!("saga-{}", a.id().get()));
        assert_eq!(a.handler_names(), vec!["on_created", "on_any_audit", "on_failing"]);
    }
}
