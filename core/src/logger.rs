//! Pluggable logging taps.
//!
//! A process-wide logger singleton with a replaceable sink. Idiomatic Rust
//! structured logging reaches for the `tracing` crate: most events are
//! emitted as `tracing` spans/events directly, and `SqlLogger` only exists
//! for the handful of call sites (bind/fetch/timing events) treated as a
//! dedicated extension point a caller can intercept without configuring a
//! full subscriber.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::dialect::Backend;
use crate::error::Error;

/// A bind/fetch/timing/warning event handed to a [`SqlLogger`].
#[derive(Debug, Clone)]
pub enum LogEvent {
    Warning(String),
    Error(String),
    /// A parameter was bound at the given 1-based index; `inspected` is the
    /// binder's short human-readable rendering of the value.
    Bind { index: usize, hint: Option<String>, inspected: String },
    Fetch { row: u64 },
    Timing { label: &'static str, micros: u64 },
    /// Dialing out; `target` has already had its password elided.
    Connecting { target: String },
    Connected { backend: Backend },
}

pub trait SqlLogger: Send + Sync {
    fn log(&self, event: LogEvent);
}

/// Discards everything.
pub struct NullLogger;
impl SqlLogger for NullLogger {
    fn log(&self, _event: LogEvent) {}
}

/// Forwards to `tracing`.
pub struct TracingLogger;
impl SqlLogger for TracingLogger {
    fn log(&self, event: LogEvent) {
        match event {
            LogEvent::Warning(msg) => tracing::warn!(%msg, "sql warning"),
            LogEvent::Error(msg) => tracing::error!(%msg, "sql error"),
            LogEvent::Bind { index, hint, inspected } => {
                tracing::debug!(index, hint, %inspected, "bind parameter")
            }
            LogEvent::Fetch { row } => tracing::trace!(row, "fetch row"),
            LogEvent::Timing { label, micros } => tracing::debug!(label, micros, "timing"),
            LogEvent::Connecting { target } => tracing::info!(%target, "connecting"),
            LogEvent::Connected { backend } => tracing::info!(?backend, "connected"),
        }
    }
}

/// Collects events in memory; used by tests that assert on bind/fetch order.
#[derive(Default)]
pub struct TraceLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl TraceLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SqlLogger for TraceLogger {
    fn log(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

static LOGGER: once_cell::sync::OnceCell<Box<dyn SqlLogger>> = once_cell::sync::OnceCell::new();
static LOGGER_SET: AtomicBool = AtomicBool::new(false);

/// Installs the process-wide logger. Must be called at most once; subsequent
/// calls are ignored (lazy-init default wins the race, matching the original's
/// "lazy-init default with replaceable sink" as a best-effort in a
/// multi-threaded process).
pub fn set_logger(logger: Box<dyn SqlLogger>) {
    if LOGGER.set(logger).is_ok() {
        LOGGER_SET.store(true, Ordering::Release);
    }
}

pub fn logger() -> &'static dyn SqlLogger {
    LOGGER.get_or_init(|| Box::new(TracingLogger)).as_ref()
}

pub(crate) fn log(event: LogEvent) {
    logger().log(event);
}

pub(crate) fn log_error(err: &Error) {
    logger().log(LogEvent::Error(err.to_string()));
}
