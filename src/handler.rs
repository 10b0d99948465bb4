//! Saga handlers and handler bindings

use crate::{BusMessage, DefinitionError, Filter, HandlerError};
use std::sync::Arc;

/// Callable invoked on a saga state when a matching message arrives
pub type HandlerFn<S> = Arc<dyn Fn(&mut S, &BusMessage) -> Result<(), HandlerError> + Send + Sync>;

/// A named saga handler.
///
/// The name is the dispatch key: a fresh instance looks its handlers up by the
/// name recorded at registration, never by the identity of the callable.
///
/// # Example
///
/// ```rust,ignore
/// // explicit tag
/// let h = Handler::named("on_created", OrderSaga::on_created);
/// // name taken from the method path
/// let h = handler!(OrderSaga::on_created);
/// ```
pub struct Handler<S> {
    name: Box<str>,
    func: HandlerFn<S>,
}

impl<S: 'static> Handler<S> {
    /// Create a handler with an explicit name
    pub fn named<F>(name: impl Into<Box<str>>, func: F) -> Self
    where
        F: Fn(&mut S, &BusMessage) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Create a handler named after the method it refers to.
    ///
    /// The name is recovered from the callable's type path. Closures have no
    /// method name and are rejected.
    pub fn from_method<F>(func: F) -> Result<Self, DefinitionError>
    where
        F: Fn(&mut S, &BusMessage) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let symbol = std::any::type_name::<F>();
        let name = resolve_handler_name(symbol).ok_or_else(|| {
            DefinitionError::UnresolvableHandler {
                symbol: symbol.into(),
            }
        })?;
        Ok(Self::named(name, func))
    }
}

impl<S> Handler<S> {
    /// Handler name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the handler on a saga state
    pub fn call(&self, saga: &mut S, message: &BusMessage) -> Result<(), HandlerError> {
        (self.func)(saga, message)
    }
}

impl<S> Clone for Handler<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<S> std::fmt::Debug for Handler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}

/// Recover a method name from a symbol path.
///
/// Takes the last `::` or `.` delimited segment after dropping trailing generic
/// arguments, and strips the `-fm` marker bound-method values carry. Returns
/// `None` when the symbol does not name an item (fn pointers, trait objects,
/// references) or when that segment is not a plain identifier, which is the
/// case for closures (`{{closure}}`) and empty input.
pub fn resolve_handler_name(symbol: &str) -> Option<&str> {
    let symbol = symbol.trim();
    if symbol.contains("->")
        || symbol.contains("dyn ")
        || UNNAMED_TYPE_PREFIXES.iter().any(|p| symbol.starts_with(p))
    {
        return None;
    }

    let symbol = strip_generic_args(symbol);
    let last = symbol.rsplit("::").next()?.rsplit('.').next()?.trim();
    let last = last.strip_suffix(BOUND_METHOD_SUFFIX).unwrap_or(last);

    let mut chars = last.chars();
    let first = chars.next()?;
    if !(first.is_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(last)
}

const BOUND_METHOD_SUFFIX: &str = "-fm";

const UNNAMED_TYPE_PREFIXES: &[&str] = &["fn(", "unsafe ", "extern ", "&", "*", "(", "["];

fn strip_generic_args(symbol: &str) -> &str {
    if !symbol.ends_with('>') {
        return symbol;
    }
    let mut depth = 0usize;
    for (idx, ch) in symbol.char_indices().rev() {
        match ch {
            '>' => depth += 1,
            '<' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &symbol[..idx];
                }
            }
            _ => {}
        }
    }
    symbol
}

/// Build a [`Handler`] named after the last segment of a method path.
///
/// ```rust,ignore
/// def.handle_message::<OrderCreated>(handler!(OrderSaga::on_created))?;
/// ```
#[macro_export]
macro_rules! handler {
    ($($seg:ident)::+) => {
        $crate::Handler::named(
            $crate::resolve_handler_name(stringify!($($seg)::+))
                .unwrap_or(stringify!($($seg)::+)),
            $($seg)::+,
        )
    };
}

/// Associates a filter with the handler invoked for matching messages
pub struct HandlerBinding<S> {
    filter: Filter,
    handler: Handler<S>,
}

impl<S> HandlerBinding<S> {
    /// Bind a handler to a filter
    pub fn new(filter: Filter, handler: Handler<S>) -> Self {
        Self { filter, handler }
    }

    /// The filter
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// The handler
    pub fn handler(&self) -> &Handler<S> {
        &self.handler
    }

    /// Name of the saga method handling matches
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }
}

impl<S> Clone for HandlerBinding<S> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<S> std::fmt::Debug for HandlerBinding<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("filter", &self.filter)
            .field("handler", &self.handler.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct OrderSaga {
        created: u32,
    }

    impl OrderSaga {
        fn on_created(&mut self, _msg: &BusMessage) -> Result<(), HandlerError> {
            self.created += 1;
            Ok(())
        }
    }

    #[test]
    fn test_resolve_handler_name() {
        assert_eq!(resolve_handler_name("orders::OrderSaga::on_created"), Some("on_created"));
        assert_eq!(resolve_handler_name("orders.(*OrderSaga).H1"), Some("H1"));
        assert_eq!(resolve_handler_name("H2"), Some("H2"));
        assert_eq!(resolve_handler_name("a::b::apply<u32, Vec<u8>>"), Some("apply"));
        assert_eq!(resolve_handler_name("<a::Saga as a::Handles>::on_event"), Some("on_event"));
    }

    #[test]
    fn test_resolve_rejects_closures() {
        assert_eq!(resolve_handler_name("orders::tests::setup::{{closure}}"), None);
        assert_eq!(resolve_handler_name(""), None);
        assert_eq!(resolve_handler_name("orders::"), None);
    }

    #[test]
    fn test_resolve_strips_bound_method_suffix() {
        assert_eq!(resolve_handler_name("orders.(*OrderSaga).H1-fm"), Some("H1"));
        assert_eq!(resolve_handler_name("orders.OrderSaga.H2-fm"), Some("H2"));
        assert_eq!(resolve_handler_name("orders.(*OrderSaga).-fm"), None);
    }

    #[test]
    fn test_resolve_rejects_unnamed_types() {
        assert_eq!(
            resolve_handler_name(
                "fn(&mut orders::OrderSaga, &saga_registry::BusMessage) -> core::result::Result<(), saga_registry::HandlerError>"
            ),
            None
        );
        assert_eq!(resolve_handler_name("dyn core::ops::Fn(&mut u32)"), None);
        assert_eq!(resolve_handler_name("&orders::OrderSaga::on_created"), None);
        assert_eq!(
            resolve_handler_name("alloc::boxed::Box<dyn core::ops::Fn(&mut u32) -> ()>"),
            None
        );
        assert_eq!(
            resolve_handler_name("alloc::boxed::Box<dyn core::ops::Fn(&mut u32)>"),
            None
        );
    }

    #[test]
    fn test_from_method_uses_method_name() {
        let handler: Handler<OrderSaga> = Handler::from_method(OrderSaga::on_created).unwrap();
        assert_eq!(handler.name(), "on_created");

        let mut saga = OrderSaga::default();
        handler.call(&mut saga, &BusMessage::new("OrderCreated", vec![])).unwrap();
        assert_eq!(saga.created, 1);
    }

    #[test]
    fn test_from_method_rejects_closure() {
        let result = Handler::<OrderSaga>::from_method(|_saga: &mut OrderSaga, _msg: &BusMessage| Ok(()));
        assert!(matches!(result, Err(DefinitionError::UnresolvableHandler { .. })));
    }

    fn free_handler(saga: &mut OrderSaga, _msg: &BusMessage) -> Result<(), HandlerError> {
        saga.created += 1;
        Ok(())
    }

    #[test]
    fn test_from_method_rejects_fn_pointer() {
        let ptr: fn(&mut OrderSaga, &BusMessage) -> Result<(), HandlerError> = free_handler;
        let result = Handler::<OrderSaga>::from_method(ptr);
        assert!(matches!(result, Err(DefinitionError::UnresolvableHandler { .. })));

        let handler = Handler::<OrderSaga>::from_method(free_handler).unwrap();
        assert_eq!(handler.name(), "free_handler");
    }

    #[test]
    fn test_handler_macro() {
        let handler: Handler<OrderSaga> = crate::handler!(OrderSaga::on_created);
        assert_eq!(handler.name(), "on_created");
    }
}
