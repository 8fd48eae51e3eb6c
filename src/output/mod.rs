//! Directive outputs: push-style event streams bound like native events.
//!
//! Outputs are only observed here. A directive declares which public event
//! names map onto which of its properties; the property must expose an
//! [`OutputStream`] or installation fails fast.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::event::{Event, Handler, HandlerFailure};

/// Static description of a directive type.
#[derive(Debug, Clone, Default)]
pub struct DirectiveDef {
    pub type_name: String,
    /// `(public event name, property name)` pairs.
    pub outputs: Vec<(String, String)>,
}

impl DirectiveDef {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            outputs: Vec::new(),
        }
    }

    pub fn with_output(mut self, public_name: impl Into<String>, property: impl Into<String>) -> Self {
        self.outputs.push((public_name.into(), property.into()));
        self
    }
}

/// A live directive instance stored in a view.
pub trait Directive {
    fn def(&self) -> &DirectiveDef;

    /// Resolve an output property. `None` means the property is not a stream.
    fn output(&self, property: &str) -> Option<&dyn OutputStream>;
}

pub trait OutputStream {
    fn subscribe(&self, handler: Handler) -> Box<dyn OutputSubscription>;
}

pub trait OutputSubscription {
    /// Stop delivery. Calling it again is a no-op.
    fn unsubscribe(&mut self);

    fn is_closed(&self) -> bool;
}

/// Output property reference resolved for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputAlias {
    pub directive: usize,
    pub property: String,
}

/// Public event name to every directive property bound under it.
pub type OutputAliases = HashMap<String, Vec<OutputAlias>>;

/// Build the alias table for the directives sitting on one node.
pub fn collect_output_aliases<'a>(
    directives: impl IntoIterator<Item = (usize, &'a DirectiveDef)>,
) -> OutputAliases {
    let mut aliases = OutputAliases::new();
    for (index, def) in directives {
        for (public_name, property) in &def.outputs {
            aliases
                .entry(public_name.clone())
                .or_default()
                .push(OutputAlias {
                    directive: index,
                    property: property.clone(),
                });
        }
    }
    aliases
}

type SubscriberList = RefCell<Vec<(u64, Handler)>>;

/// Stock output stream.
///
/// Subscribers run in registration order. Subscriptions hold a weak
/// reference, so a dropped emitter simply stops delivering.
pub struct EventEmitter {
    name: String,
    subscribers: Rc<SubscriberList>,
    next_id: Cell<u64>,
}

impl EventEmitter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Deliver `payload` to every current subscriber.
    ///
    /// All subscribers run even if one fails; the first failure is returned.
    pub fn emit(&self, payload: Value) -> Result<(), HandlerFailure> {
        let snapshot: Vec<Handler> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();

        let mut first_failure = None;
        for handler in snapshot {
            let mut event = Event::new(self.name.clone()).with_payload(payload.clone());
            if let Err(err) = handler(&mut event) {
                first_failure.get_or_insert(err);
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl OutputStream for EventEmitter {
    fn subscribe(&self, handler: Handler) -> Box<dyn OutputSubscription> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push((id, handler));
        Box::new(EmitterSubscription {
            id,
            subscribers: Rc::downgrade(&self.subscribers),
            closed: false,
        })
    }
}

struct EmitterSubscription {
    id: u64,
    subscribers: Weak<SubscriberList>,
    closed: bool,
}

impl OutputSubscription for EmitterSubscription {
    fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::handler;
    use serde_json::json;

    #[test]
    fn emit_reaches_subscribers_in_order() {
        let emitter = EventEmitter::new("valueChange");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&seen);
        let _a = emitter.subscribe(handler(move |event| {
            first.borrow_mut().push(format!("a:{}", event.payload));
            Ok(Value::Null)
        }));
        let second = Rc::clone(&seen);
        let _b = emitter.subscribe(handler(move |event| {
            second.borrow_mut().push(format!("b:{}", event.payload));
            Ok(Value::Null)
        }));

        emitter.emit(json!(3)).unwrap();
        assert_eq!(*seen.borrow(), vec!["a:3".to_string(), "b:3".to_string()]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let emitter = EventEmitter::new("change");
        let mut sub = emitter.subscribe(handler(|_| Ok(Value::Null)));
        assert_eq!(emitter.subscriber_count(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(sub.is_closed());
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[test]
    fn failing_subscriber_does_not_starve_the_rest() {
        let emitter = EventEmitter::new("change");
        let reached = Rc::new(Cell::new(false));
        let _a = emitter.subscribe(handler(|_| Err(HandlerFailure::new("boom"))));
        let flag = Rc::clone(&reached);
        let _b = emitter.subscribe(handler(move |_| {
            flag.set(true);
            Ok(Value::Null)
        }));

        let err = emitter.emit(Value::Null).unwrap_err();
        assert_eq!(err.message, "boom");
        assert!(reached.get());
    }

    #[test]
    fn aliases_group_by_public_name() {
        let a = DirectiveDef::new("Slider").with_output("change", "valueChange");
        let b = DirectiveDef::new("Tracker").with_output("change", "changed");
        let aliases = collect_output_aliases([(0, &a), (3, &b)]);

        let change = &aliases["change"];
        assert_eq!(change.len(), 2);
        assert_eq!(change[0].directive, 0);
        assert_eq!(change[1].property, "changed");
    }
}
