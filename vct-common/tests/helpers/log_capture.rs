//! Log Capture Utilities for Testing
//!
//! Collects tracing events so tests can assert on what was logged

use std::sync::{Arc, Mutex};
use tracing::Level;

/// Captured log record
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
}

/// Log capture layer for testing
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured log records
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Messages logged at exactly `level`
    pub fn at_level(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }
}

impl<S> tracing_subscriber::Layer<S> for LogCapture
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        use tracing::field::Visit;

        struct MessageVisitor {
            message: String,
        }

        impl Visit for MessageVisitor {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        self.records.lock().unwrap().push(LogRecord {
            level: *event.metadata().level(),
            message: visitor.message,
        });
    }
}
