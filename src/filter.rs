//! Message filters

use serde::{Deserialize, Serialize};

/// Describes how an inbound message is matched to a binding.
///
/// An empty exchange means the default (direct) exchange. An empty message
/// name matches any message arriving on the channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    exchange: Box<str>,
    routing_key: Box<str>,
    msg_name: Box<str>,
}

impl Filter {
    /// Create a filter
    pub fn new(
        exchange: impl Into<Box<str>>,
        routing_key: impl Into<Box<str>>,
        msg_name: impl Into<Box<str>>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            msg_name: msg_name.into(),
        }
    }

    /// Exchange the message is published on
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Routing key or topic
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Message type name, empty for topic-wide bindings
    pub fn msg_name(&self) -> &str {
        &self.msg_name
    }

    /// Whether this filter names a specific message type
    pub fn is_named(&self) -> bool {
        !self.msg_name.is_empty()
    }

    /// Exact, case-sensitive match on all three fields
    pub fn matches(&self, exchange: &str, routing_key: &str, msg_name: &str) -> bool {
        self.exchange.as_ref() == exchange
            && self.routing_key.as_ref() == routing_key
            && self.msg_name.as_ref() == msg_name
    }

    /// Like [`Filter::matches`], but a filter without a message name accepts
    /// any message on its exchange and routing key
    pub fn accepts(&self, exchange: &str, routing_key: &str, msg_name: &str) -> bool {
        if self.is_named() {
            return self.matches(exchange, routing_key, msg_name);
        }
        self.exchange.as_ref() == exchange && self.routing_key.as_ref() == routing_key
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.exchange, self.routing_key, self.msg_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_equality() {
        let a = Filter::new("ex", "t", "ShipRequested");
        assert_eq!(a, Filter::new("ex", "t", "ShipRequested"));
        assert_ne!(a, Filter::new("ex", "t2", "ShipRequested"));
        assert_ne!(a, Filter::new("", "t", "ShipRequested"));
    }

    #[test]
    fn test_filter_matches_exactly() {
        let filter = Filter::new("", "orders", "OrderCreated");
        assert!(filter.matches("", "orders", "OrderCreated"));
        assert!(!filter.matches("", "orders", "ordercreated"));
        assert!(!filter.matches("", "orders", "OrderCreated2"));
        assert!(filter.is_named());
        assert!(!Filter::new("ex", "t", "").is_named());
    }

    #[test]
    fn test_unnamed_filter_accepts_topic() {
        let filter = Filter::new("ex", "t", "");
        assert!(filter.accepts("ex", "t", "Anything"));
        assert!(!filter.accepts("ex", "other", "Anything"));
        assert!(!filter.matches("ex", "t", "Anything"));
    }
}
