use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

/// Leveled severity for engine events, mirroring
/// `autotransform.event.type.EventLevel`: error is the loudest, debug the
/// quietest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Verbose,
    Info,
    Warning,
    Error,
}

/// A single structured event. `component` names the emitting subsystem
/// (e.g. `"pipeline"`, `"manager"`, `"scheduler"`) so a sink can route or
/// filter without string-parsing `message`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub level: EventLevel,
    pub component: &'static str,
    pub message: String,
}

impl Event {
    pub fn new(level: EventLevel, component: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            component,
            message: message.into(),
        }
    }
}

/// The abstract collaborator components emit events to. The engine talks to
/// exactly one, process-wide (see spec.md §5 "Shared resources").
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &Event);
}

/// Forwards every event to `tracing`, at the matching level. This is the
/// engine's default sink and the one installed unless a caller replaces it.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn handle(&self, event: &Event) {
        match event.level {
            EventLevel::Error => {
                tracing::error!(component = event.component, "{}", event.message)
            }
            EventLevel::Warning => {
                tracing::warn!(component = event.component, "{}", event.message)
            }
            EventLevel::Info => tracing::info!(component = event.component, "{}", event.message),
            EventLevel::Verbose | EventLevel::Debug => {
                tracing::debug!(component = event.component, "{}", event.message)
            }
        }
    }
}

static SINK: OnceLock<Mutex<Box<dyn EventSink>>> = OnceLock::new();

fn sink_cell() -> &'static Mutex<Box<dyn EventSink>> {
    SINK.get_or_init(|| Mutex::new(Box::new(TracingEventSink)))
}

/// Installs a new process-wide sink, replacing whatever was there before
/// (last-writer-wins, per spec.md §5).
pub fn set_sink(sink: Box<dyn EventSink>) {
    *sink_cell().lock().expect("event sink lock poisoned") = sink;
}

/// Dispatches an event to the current process-wide sink.
pub fn emit(event: Event) {
    sink_cell()
        .lock()
        .expect("event sink lock poisoned")
        .handle(&event);
}

pub fn emit_info(component: &'static str, message: impl Into<String>) {
    emit(Event::new(EventLevel::Info, component, message));
}

pub fn emit_warning(component: &'static str, message: impl Into<String>) {
    emit(Event::new(EventLevel::Warning, component, message));
}

pub fn emit_error(component: &'static str, message: impl Into<String>) {
    emit(Event::new(EventLevel::Error, component, message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink(Arc<AtomicUsize>);

    impl EventSink for CountingSink {
        fn handle(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn installed_sink_receives_events() {
        let count = Arc::new(AtomicUsize::new(0));
        set_sink(Box::new(CountingSink(count.clone())));
        emit_info("test", "hello");
        emit_warning("test", "world");
        assert_eq!(count.load(Ordering::SeqCst), 2);
        // restore default so other tests in this process aren't affected
        set_sink(Box::new(TracingEventSink));
    }
}
