use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::logging::{LogLevel, Logger, event_with_fields};
use crate::metrics::ListenerMetrics;

pub const DEFAULT_LOG_TARGET: &str = "room::listen";

/// Observability knobs shared by every listener a view installs.
#[derive(Clone)]
pub struct ListenerConfig {
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Counters updated on install, dispatch and teardown.
    pub metrics: Option<Arc<Mutex<ListenerMetrics>>>,
    /// Target field attached to emitted log events.
    pub log_target: String,
    /// Emit a trace event for every native dispatch.
    pub log_dispatch: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            log_target: DEFAULT_LOG_TARGET.to_string(),
            log_dispatch: false,
        }
    }
}

impl ListenerConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(ListenerMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<ListenerMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }

    pub(crate) fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.logger.as_ref() {
            if !logger.enabled(level) {
                return;
            }
            let event = event_with_fields(level, &self.log_target, message, fields);
            let _ = logger.log_event(event);
        }
    }

    pub(crate) fn record(&self, update: impl FnOnce(&mut ListenerMetrics)) {
        if let Some(metrics) = self.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut guard);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_metrics_is_idempotent() {
        let mut config = ListenerConfig::default();
        assert!(config.metrics_handle().is_none());

        config.enable_metrics();
        let first = config.metrics_handle().unwrap();
        config.enable_metrics();
        let second = config.metrics_handle().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        config.record(|m| m.record_dispatch());
        assert_eq!(first.lock().unwrap().snapshot().dispatches, 1);

        config.disable_metrics();
        assert!(config.metrics_handle().is_none());
    }
}
