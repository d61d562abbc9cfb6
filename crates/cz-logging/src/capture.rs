//! ---
//! cz_section: "03-logging"
//! cz_subsection: "module"
//! cz_type: "source"
//! cz_scope: "code"
//! cz_description: "In-memory record capture for asserting on emitted logs."
//! cz_version: "v0.0.0-prealpha"
//! cz_owner: "tbd"
//! ---
//! A layer that keeps every event's level and fields, for tests that assert on
//! what the host logged.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;

/// One captured event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Level the event was emitted at.
    pub level: Level,
    /// Field values rendered to strings, `message` included.
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// Value of a field, if the event carried it.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The formatted message.
    pub fn message(&self) -> &str {
        self.field("message").unwrap_or("")
    }

    /// Value of the `tag` field.
    pub fn tag(&self) -> &str {
        self.field("tag").unwrap_or("")
    }
}

#[derive(Default)]
struct FieldVisitor(BTreeMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}

/// Layer appending every event it sees to a shared list.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    /// Events captured so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0,
        });
    }
}

/// Run `f` with a capturing subscriber as the thread's default and return
/// its result with every event emitted on this thread meanwhile.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let layer = CaptureLayer::default();
    let subscriber = Registry::default().with(layer.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, layer.events())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogContext;

    #[test]
    fn records_level_and_context_fields() {
        let ((), events) = capture(|| {
            crate::cz_warn!(
                context = LogContext::tagged("service").with_service("console"),
                "callback returned code {}",
                3
            );
        });
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
        assert_eq!(events[0].tag(), "service");
        assert_eq!(events[0].field("service"), Some("console"));
        assert_eq!(events[0].message(), "callback returned code 3");
    }

    #[test]
    fn fatal_records_are_errors_marked_fatal() {
        let ((), events) = capture(|| {
            crate::cz_fatal!(context = LogContext::tagged("guest"), "failed to wire {}", "stdout");
        });
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::ERROR);
        assert_eq!(events[0].field("severity"), Some("fatal"));
        assert_eq!(events[0].message(), "failed to wire stdout");
    }
}
