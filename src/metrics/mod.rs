use crate::logging::{LogEvent, LogFields, LogLevel};
use serde::Serialize;
use serde_json::json;

/// Counters describing listener installation, dispatch and teardown.
#[derive(Debug, Default, Clone)]
pub struct ListenerMetrics {
    native_subscriptions: u64,
    coalesced_handlers: u64,
    output_subscriptions: u64,
    dispatches: u64,
    handler_failures: u64,
    suppressed_defaults: u64,
    disposals: u64,
}

impl ListenerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_native_subscription(&mut self) {
        self.native_subscriptions = self.native_subscriptions.saturating_add(1);
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced_handlers = self.coalesced_handlers.saturating_add(1);
    }

    pub fn record_output_subscription(&mut self) {
        self.output_subscriptions = self.output_subscriptions.saturating_add(1);
    }

    pub fn record_dispatch(&mut self) {
        self.dispatches = self.dispatches.saturating_add(1);
    }

    pub fn record_handler_failure(&mut self) {
        self.handler_failures = self.handler_failures.saturating_add(1);
    }

    pub fn record_suppressed_default(&mut self) {
        self.suppressed_defaults = self.suppressed_defaults.saturating_add(1);
    }

    pub fn record_disposals(&mut self, count: usize) {
        if count > 0 {
            self.disposals = self.disposals.saturating_add(count as u64);
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            native_subscriptions: self.native_subscriptions,
            coalesced_handlers: self.coalesced_handlers,
            output_subscriptions: self.output_subscriptions,
            dispatches: self.dispatches,
            handler_failures: self.handler_failures,
            suppressed_defaults: self.suppressed_defaults,
            disposals: self.disposals,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub native_subscriptions: u64,
    pub coalesced_handlers: u64,
    pub output_subscriptions: u64,
    pub dispatches: u64,
    pub handler_failures: u64,
    pub suppressed_defaults: u64,
    pub disposals: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "listener_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert(
            "native_subscriptions".to_string(),
            json!(self.native_subscriptions),
        );
        map.insert("coalesced_handlers".to_string(), json!(self.coalesced_handlers));
        map.insert(
            "output_subscriptions".to_string(),
            json!(self.output_subscriptions),
        );
        map.insert("dispatches".to_string(), json!(self.dispatches));
        map.insert("handler_failures".to_string(), json!(self.handler_failures));
        map.insert(
            "suppressed_defaults".to_string(),
            json!(self.suppressed_defaults),
        );
        map.insert("disposals".to_string(), json!(self.disposals));
        map
    }
}
