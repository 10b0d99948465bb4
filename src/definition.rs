//! Saga definitions
//!
//! A definition moves through two phases. While [`Open`] it accepts handler
//! registrations, guarded by a lock so several threads may wire it up. Once
//! [`sealed`](SagaDefinition::seal) its binding table is frozen behind an `Arc`
//! and it can be shared with dispatchers without any locking.

use crate::stats::DefinitionStats;
use crate::{
    BusMessage, DefinitionError, Filter, Handler, HandlerBinding, Message, Registrar,
    RegistrarError, Saga, SagaInstance, SetupError,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Instance configuration function, applied to every fresh saga state
pub type ConfFn<S> = Arc<dyn Fn(S) -> S + Send + Sync>;

/// Definition accepting registrations
pub type OpenDefinition<S> = SagaDefinition<S, Open<S>>;

/// Frozen definition, safe to share across threads
pub type SealedDefinition<S> = SagaDefinition<S, Sealed<S>>;

/// Options controlling how a definition is validated
#[derive(Clone, Debug)]
pub struct DefinitionOptions {
    /// Fail [`SagaDefinition::seal`] when a trigger has no handler bound to it.
    /// When false the mismatch is only logged.
    pub strict_triggers: bool,
}

impl Default for DefinitionOptions {
    fn default() -> Self {
        Self {
            strict_triggers: true,
        }
    }
}

/// Access to the binding table of a definition phase
pub trait DefinitionPhase<S> {
    /// Current binding table
    fn bindings(&self) -> Arc<[HandlerBinding<S>]>;

    /// Run `f` over the binding table without copying it
    fn with_bindings<R>(&self, f: impl FnOnce(&[HandlerBinding<S>]) -> R) -> R;
}

/// Registration phase
pub struct Open<S> {
    registrar: Arc<dyn Registrar>,
    bindings: Mutex<Vec<HandlerBinding<S>>>,
}

/// Frozen phase
pub struct Sealed<S> {
    bindings: Arc<[HandlerBinding<S>]>,
}

impl<S> DefinitionPhase<S> for Open<S> {
    fn bindings(&self) -> Arc<[HandlerBinding<S>]> {
        Arc::from(self.bindings.lock().as_slice())
    }

    fn with_bindings<R>(&self, f: impl FnOnce(&[HandlerBinding<S>]) -> R) -> R {
        f(&self.bindings.lock())
    }
}

impl<S> DefinitionPhase<S> for Sealed<S> {
    fn bindings(&self) -> Arc<[HandlerBinding<S>]> {
        Arc::clone(&self.bindings)
    }

    fn with_bindings<R>(&self, f: impl FnOnce(&[HandlerBinding<S>]) -> R) -> R {
        f(&self.bindings)
    }
}

/// Routing metadata for one saga type: which messages go to which handler,
/// which messages start a new instance, and how new instances are configured.
pub struct SagaDefinition<S, P> {
    saga_type: &'static str,
    started_by: Vec<Box<str>>,
    conf_fns: Vec<ConfFn<S>>,
    options: DefinitionOptions,
    stats: Arc<DefinitionStats>,
    phase: P,
}

impl<S: Saga> SagaDefinition<S, Open<S>> {
    /// Open a definition for `S`, seeding the trigger list from `S::started_by`
    pub fn open(registrar: Arc<dyn Registrar>, options: DefinitionOptions) -> Self {
        Self {
            saga_type: S::type_fqn(),
            started_by: S::started_by().into_iter().map(Into::into).collect(),
            conf_fns: Vec::new(),
            options,
            stats: Arc::new(DefinitionStats::new()),
            phase: Open {
                registrar,
                bindings: Mutex::new(Vec::new()),
            },
        }
    }

    /// Open a definition and let `S` register all of its handlers
    pub fn register(
        registrar: Arc<dyn Registrar>,
        options: DefinitionOptions,
    ) -> Result<Self, RegistrarError> {
        let def = Self::open(registrar, options);
        S::register_all_handlers(&def)?;
        Ok(def)
    }

    /// Open, register and seal a definition for `S` in one step.
    ///
    /// Use [`register`](Self::register) instead when instance configuration
    /// functions must be added before sealing.
    pub fn for_saga(
        registrar: Arc<dyn Registrar>,
        options: DefinitionOptions,
    ) -> Result<SealedDefinition<S>, SetupError> {
        Ok(Self::register(registrar, options)?.seal()?)
    }

    /// Replace the trigger list
    pub fn started_by<I, T>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Box<str>>,
    {
        self.started_by = triggers.into_iter().map(Into::into).collect();
        self
    }

    /// Append an instance configuration function
    pub fn with_configuration<F>(mut self, conf: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        self.conf_fns.push(Arc::new(conf));
        self
    }

    /// Handle a point-to-point message of type `M` arriving on this service's queue
    pub fn handle_message<M: Message>(&self, handler: Handler<S>) -> Result<(), RegistrarError> {
        self.handle_message_named(M::schema_name(), handler)
    }

    /// Handle a point-to-point message by schema name
    pub fn handle_message_named(
        &self,
        msg_name: &str,
        handler: Handler<S>,
    ) -> Result<(), RegistrarError> {
        let registrar = &self.phase.registrar;
        self.add_binding("", registrar.service_name(), msg_name, handler);
        registrar
            .register_message(msg_name)
            .inspect_err(|err| self.registrar_failed(msg_name, err))
    }

    /// Handle an event of type `M` published on `exchange` with `topic`
    pub fn handle_event<M: Message>(
        &self,
        exchange: &str,
        topic: &str,
        handler: Handler<S>,
    ) -> Result<(), RegistrarError> {
        self.handle_event_named(exchange, topic, M::schema_name(), handler)
    }

    /// Handle an event by schema name
    pub fn handle_event_named(
        &self,
        exchange: &str,
        topic: &str,
        msg_name: &str,
        handler: Handler<S>,
    ) -> Result<(), RegistrarError> {
        self.add_binding(exchange, topic, msg_name, handler);
        self.phase
            .registrar
            .register_event(exchange, topic, msg_name)
            .inspect_err(|err| self.registrar_failed(msg_name, err))
    }

    /// Handle every event published on `exchange` with `topic`
    pub fn handle_topic(
        &self,
        exchange: &str,
        topic: &str,
        handler: Handler<S>,
    ) -> Result<(), RegistrarError> {
        self.handle_event_named(exchange, topic, "", handler)
    }

    /// Freeze the binding table.
    ///
    /// Every trigger must name a bound message unless
    /// [`DefinitionOptions::strict_triggers`] is off.
    pub fn seal(self) -> Result<SealedDefinition<S>, DefinitionError> {
        let bindings = self.phase.bindings.into_inner();

        for trigger in &self.started_by {
            if bindings
                .iter()
                .any(|b| b.filter().msg_name() == trigger.as_ref())
            {
                continue;
            }
            if self.options.strict_triggers {
                return Err(DefinitionError::UnboundTrigger {
                    saga_type: self.saga_type.into(),
                    trigger: trigger.clone(),
                });
            }
            tracing::warn!(
                saga_type = %self.saga_type,
                trigger = %trigger,
                "Saga trigger has no handler bound to it"
            );
        }

        tracing::info!(
            saga_type = %self.saga_type,
            bindings = bindings.len(),
            triggers = self.started_by.len(),
            "Saga definition sealed"
        );

        Ok(SagaDefinition {
            saga_type: self.saga_type,
            started_by: self.started_by,
            conf_fns: self.conf_fns,
            options: self.options,
            stats: self.stats,
            phase: Sealed {
                bindings: bindings.into(),
            },
        })
    }

    fn add_binding(&self, exchange: &str, routing_key: &str, msg_name: &str, handler: Handler<S>) {
        tracing::debug!(
            saga_type = %self.saga_type,
            exchange,
            routing_key,
            msg_name,
            handler = %handler.name(),
            "Saga handler bound"
        );
        self.phase.bindings.lock().push(HandlerBinding::new(
            Filter::new(exchange, routing_key, msg_name),
            handler,
        ));
        DefinitionStats::incr(&self.stats.bindings_registered);
    }

    fn registrar_failed(&self, msg_name: &str, err: &RegistrarError) {
        DefinitionStats::incr(&self.stats.registrar_failures);
        tracing::error!(
            saga_type = %self.saga_type,
            msg_name,
            error = %err,
            "Registrar rejected saga subscription"
        );
    }
}

impl<S: Saga, P: DefinitionPhase<S>> SagaDefinition<S, P> {
    /// Fully-qualified saga type name
    pub fn saga_type(&self) -> &'static str {
        self.saga_type
    }

    /// Message names that may start a new instance
    pub fn triggers(&self) -> &[Box<str>] {
        &self.started_by
    }

    /// Validation options this definition was opened with
    pub fn options(&self) -> &DefinitionOptions {
        &self.options
    }

    /// Counters shared by both phases
    pub fn stats(&self) -> &Arc<DefinitionStats> {
        &self.stats
    }

    /// Snapshot of the binding table
    pub fn bindings(&self) -> Arc<[HandlerBinding<S>]> {
        self.phase.bindings()
    }

    /// Names of every bound message type, in registration order.
    ///
    /// Topic-wide bindings carry no message name and are left out.
    pub fn handled_messages(&self) -> Vec<Box<str>> {
        self.phase.with_bindings(|bindings| {
            bindings
                .iter()
                .filter(|b| b.filter().is_named())
                .map(|b| b.filter().msg_name().into())
                .collect()
        })
    }

    /// Whether `message` may create a new instance of this saga
    pub fn should_start_new_saga(&self, message: &BusMessage) -> bool {
        let fqn = message.payload_fqn.as_ref();
        let starts = self.started_by.iter().any(|t| t.as_ref() == fqn);

        if starts {
            DefinitionStats::incr(&self.stats.trigger_hits);
        } else {
            DefinitionStats::incr(&self.stats.trigger_misses);
        }
        tracing::trace!(
            saga_type = %self.saga_type,
            payload_fqn = %fqn,
            starts,
            "Checked saga trigger"
        );
        starts
    }

    /// Create a configured instance bound to the current binding table
    pub fn new_instance(&self) -> SagaInstance<S> {
        let instance = SagaInstance::new(S::default(), self.phase.bindings());
        DefinitionStats::incr(&self.stats.instances_created);
        tracing::debug!(
            saga_type = %self.saga_type,
            saga_id = %instance.id(),
            "Saga instance created"
        );
        self.configure_saga(instance)
    }

    /// Apply the configuration functions in registration order.
    ///
    /// With `[f1, f2]` the resulting state is `f2(f1(state))`.
    pub fn configure_saga(&self, instance: SagaInstance<S>) -> SagaInstance<S> {
        instance.map_state(|state| self.conf_fns.iter().fold(state, |state, conf| conf(state)))
    }
}

impl<S, P> std::fmt::Display for SagaDefinition<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.saga_type)
    }
}

impl<S, P> std::fmt::Debug for SagaDefinition<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaDefinition")
            .field("saga_type", &self.saga_type)
            .field("started_by", &self.started_by)
            .field("conf_fns", &self.conf_fns.len())
            .finish()
    }
}
