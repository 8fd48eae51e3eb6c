//! Events delivered to bound handlers and the handler calling convention.
//!
//! A handler receives the event mutably and returns a JSON value. `Null`
//! plays the part of "no result"; only an explicit `false` asks for the
//! default action to be suppressed. A handler that fails returns
//! `Err(HandlerFailure)`, which the dispatch path isolates.

use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;

use crate::renderer::EventTarget;

/// Failure raised by user handler code during dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerFailure {
    pub message: String,
}

impl HandlerFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type HandlerResult = std::result::Result<Value, HandlerFailure>;

/// User supplied event handler.
pub type Handler = Rc<dyn Fn(&mut Event) -> HandlerResult>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Event) -> HandlerResult + 'static,
{
    Rc::new(f)
}

/// An event flowing from a native target or a directive output.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub payload: Value,
    /// Where the native layer fired the event; `None` for directive outputs.
    pub target: Option<EventTarget>,
    default_prevented: bool,
    return_value: bool,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Value::Null,
            target: None,
            default_prevented: false,
            return_value: true,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Cancel the default action, also clearing the legacy `return_value`.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
        self.return_value = false;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Legacy cancellation flag; `false` once the default action is suppressed.
    pub fn return_value(&self) -> bool {
        self.return_value
    }
}

/// True only for a literal boolean `false`.
pub fn is_explicit_false(value: &Value) -> bool {
    matches!(value, Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_boolean_false_counts_as_false() {
        assert!(is_explicit_false(&json!(false)));
        assert!(!is_explicit_false(&Value::Null));
        assert!(!is_explicit_false(&json!(0)));
        assert!(!is_explicit_false(&json!("")));
        assert!(!is_explicit_false(&json!(true)));
    }

    #[test]
    fn builders_fill_payload_and_target() {
        use crate::renderer::NativeNode;

        let event = Event::new("input")
            .with_payload(json!({"value": "a"}))
            .with_target(EventTarget::Node(NativeNode(5)));
        assert_eq!(event.payload["value"], json!("a"));
        assert_eq!(event.target, Some(EventTarget::Node(NativeNode(5))));
    }

    #[test]
    fn prevent_default_flips_legacy_return_value() {
        let mut event = Event::new("click");
        assert!(event.return_value());
        event.prevent_default();
        assert!(event.default_prevented());
        assert!(!event.return_value());
    }
}
