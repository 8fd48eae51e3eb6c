use std::cell::Cell;
use std::rc::Rc;

use serde_json::{Value, json};

use crate::event::{Event, Handler, is_explicit_false};
use crate::logging::{LogLevel, json_kv};
use crate::renderer::NativeCallback;
use crate::view::{ViewFlags, ViewHost, ViewId};

use super::coalesce::CoalescedListener;
use super::config::ListenerConfig;

/// Run one handler, routing a failure to the host.
///
/// A failed handler counts as having returned `false`.
pub fn invoke_with_isolation(
    host: &dyn ViewHost,
    view: ViewId,
    handler: &Handler,
    event: &mut Event,
    config: &ListenerConfig,
) -> Value {
    match handler(event) {
        Ok(value) => value,
        Err(failure) => {
            config.record(|metrics| metrics.record_handler_failure());
            config.log(
                LogLevel::Warn,
                "handler_failed",
                [
                    json_kv("view", json!(view.0)),
                    json_kv("event", json!(event.name)),
                    json_kv("error", json!(failure.message)),
                ],
            );
            host.handle_error(view, &failure);
            Value::Bool(false)
        }
    }
}

/// The single native callback behind a coalesced chain.
pub struct ListenerWrapper {
    chain: Rc<CoalescedListener>,
    dirty_view: ViewId,
    enclosing_view: ViewId,
    enclosing_flags: Rc<Cell<ViewFlags>>,
    host: Rc<dyn ViewHost>,
    suppress_default: bool,
    config: ListenerConfig,
}

impl ListenerWrapper {
    /// `dirty_view` is the component's own view for component hosts and the
    /// enclosing view otherwise.
    pub fn new(
        chain: Rc<CoalescedListener>,
        dirty_view: ViewId,
        enclosing_view: ViewId,
        enclosing_flags: Rc<Cell<ViewFlags>>,
        host: Rc<dyn ViewHost>,
        suppress_default: bool,
        config: ListenerConfig,
    ) -> Self {
        Self {
            chain,
            dirty_view,
            enclosing_view,
            enclosing_flags,
            host,
            suppress_default,
            config,
        }
    }

    pub fn dispatch(&self, event: &mut Event) -> Value {
        if !self
            .enclosing_flags
            .get()
            .contains(ViewFlags::MANUAL_CHANGE_DETECTION)
        {
            self.host.mark_view_dirty(self.dirty_view);
        }

        let mut result = Value::Null;
        for handler in self.chain.handlers() {
            result = invoke_with_isolation(
                self.host.as_ref(),
                self.enclosing_view,
                &handler,
                event,
                &self.config,
            );
        }

        let suppressed = self.suppress_default && is_explicit_false(&result);
        if suppressed {
            event.prevent_default();
            self.config.record(|metrics| metrics.record_suppressed_default());
        }

        self.config.record(|metrics| metrics.record_dispatch());
        if self.config.log_dispatch {
            self.config.log(
                LogLevel::Trace,
                "event_dispatched",
                [
                    json_kv("view", json!(self.enclosing_view.0)),
                    json_kv("event", json!(event.name)),
                    json_kv("handlers", json!(self.chain.len())),
                    json_kv("default_prevented", json!(suppressed)),
                ],
            );
        }
        result
    }

    pub fn into_callback(self) -> NativeCallback {
        let wrapper = Rc::new(self);
        Rc::new(move |event: &mut Event| wrapper.dispatch(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{HandlerFailure, handler};
    use crate::harness::RecordingHost;

    fn wrapper_for(
        chain: CoalescedListener,
        host: &Rc<RecordingHost>,
        flags: ViewFlags,
        suppress: bool,
    ) -> ListenerWrapper {
        let host: Rc<dyn ViewHost> = host.clone();
        ListenerWrapper::new(
            Rc::new(chain),
            ViewId(7),
            ViewId(1),
            Rc::new(Cell::new(flags)),
            host,
            suppress,
            ListenerConfig::default(),
        )
    }

    #[test]
    fn isolated_failure_reports_and_yields_false() {
        let host = RecordingHost::new();
        let failing = handler(|_| Err(HandlerFailure::new("nope")));
        let mut event = Event::new("click");

        let value = invoke_with_isolation(
            host.as_ref(),
            ViewId(3),
            &failing,
            &mut event,
            &ListenerConfig::default(),
        );
        assert_eq!(value, Value::Bool(false));
        assert_eq!(host.errors(), vec![(ViewId(3), "nope".to_string())]);
    }

    #[test]
    fn marks_dirty_before_handlers_run() {
        let host = RecordingHost::new();
        let journal = host.journal();
        let chain = CoalescedListener::new(handler(move |_| {
            journal.borrow_mut().push("handler".to_string());
            Ok(Value::Null)
        }));
        let wrapper = wrapper_for(chain, &host, ViewFlags::empty(), false);

        wrapper.dispatch(&mut Event::new("click"));
        assert_eq!(
            *host.journal().borrow(),
            vec!["dirty:view#7".to_string(), "handler".to_string()]
        );
    }

    #[test]
    fn manual_change_detection_skips_dirty_mark() {
        let host = RecordingHost::new();
        let chain = CoalescedListener::new(handler(|_| Ok(Value::Null)));
        let wrapper = wrapper_for(chain, &host, ViewFlags::MANUAL_CHANGE_DETECTION, false);

        wrapper.dispatch(&mut Event::new("click"));
        assert!(host.dirty_marks().is_empty());
    }

    #[test]
    fn last_result_wins() {
        let host = RecordingHost::new();
        let chain = CoalescedListener::new(handler(|_| Ok(Value::Bool(false))));
        chain.prepend(handler(|_| Ok(json!(1))));
        let wrapper = wrapper_for(chain, &host, ViewFlags::empty(), true);

        // Newest (1) runs first, the first-bound `false` last.
        let mut event = Event::new("submit");
        assert_eq!(wrapper.dispatch(&mut event), Value::Bool(false));
        assert!(event.default_prevented());
    }

    #[test]
    fn suppression_only_when_requested() {
        let host = RecordingHost::new();
        let chain = CoalescedListener::new(handler(|_| Ok(Value::Bool(false))));
        let wrapper = wrapper_for(chain, &host, ViewFlags::empty(), false);

        let mut event = Event::new("submit");
        wrapper.dispatch(&mut event);
        assert!(!event.default_prevented());
        assert!(event.return_value());
    }
}
