//! Diagnostics boundary.
//!
//! Engine code MUST NOT log or panic for expected failure modes; every
//! recoverable failure flows through [`Diagnostics`] exactly once. Hosts
//! inject their own sink; the default routes to `tracing`.

use std::{cell::RefCell, rc::Rc};

///
/// Severity
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

///
/// DiagnosticsSink
///
/// Receiver for the three independent reporting channels.
///

pub trait DiagnosticsSink {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
}

///
/// TracingSink
///
/// Default sink; emits structured `tracing` events under the crate target.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn error(&self, message: &str) {
        tracing::error!(target: "tether", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "tether", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "tether", "{message}");
    }
}

///
/// CallbackSink
///
/// Per-channel callbacks with the tracing sink as fallback for any channel
/// left unset.
///

#[derive(Default)]
pub struct CallbackSink {
    on_error: Option<Box<dyn Fn(&str)>>,
    on_warn: Option<Box<dyn Fn(&str)>>,
    on_info: Option<Box<dyn Fn(&str)>>,
    fallback: TracingSink,
}

impl CallbackSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_warn(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.on_warn = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_info(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.on_info = Some(Box::new(f));
        self
    }
}

impl DiagnosticsSink for CallbackSink {
    fn error(&self, message: &str) {
        match &self.on_error {
            Some(f) => f(message),
            None => self.fallback.error(message),
        }
    }

    fn warn(&self, message: &str) {
        match &self.on_warn {
            Some(f) => f(message),
            None => self.fallback.warn(message),
        }
    }

    fn info(&self, message: &str) {
        match &self.on_info {
            Some(f) => f(message),
            None => self.fallback.info(message),
        }
    }
}

///
/// CaptureSink
///
/// Records every report in order; intended for assertions in tests and
/// host-side debugging.
///

#[derive(Default)]
pub struct CaptureSink {
    entries: RefCell<Vec<(Severity, String)>>,
}

impl CaptureSink {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.borrow().clone()
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl DiagnosticsSink for CaptureSink {
    fn error(&self, message: &str) {
        self.entries
            .borrow_mut()
            .push((Severity::Error, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.entries
            .borrow_mut()
            .push((Severity::Warning, message.to_string()));
    }

    fn info(&self, message: &str) {
        self.entries
            .borrow_mut()
            .push((Severity::Info, message.to_string()));
    }
}

///
/// Diagnostics
///
/// Cheaply cloneable handle shared by every component of one engine
/// instance.
///

#[derive(Clone)]
pub struct Diagnostics {
    sink: Rc<dyn DiagnosticsSink>,
}

impl Diagnostics {
    #[must_use]
    pub fn new(sink: Rc<dyn DiagnosticsSink>) -> Self {
        Self { sink }
    }

    #[must_use]
    pub fn capture() -> (Self, Rc<CaptureSink>) {
        let sink = CaptureSink::new();

        (Self::new(sink.clone()), sink)
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.sink.error(message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.sink.warn(message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.sink.info(message.as_ref());
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Rc::new(TracingSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_sink_records_in_order() {
        let (diagnostics, sink) = Diagnostics::capture();

        diagnostics.warn("first");
        diagnostics.error("second");
        diagnostics.info("third");

        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], (Severity::Warning, "first".to_string()));
        assert_eq!(entries[1], (Severity::Error, "second".to_string()));
        assert_eq!(sink.count(Severity::Info), 1);
    }

    #[test]
    fn callback_sink_routes_per_channel() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = seen.clone();
        let sink = CallbackSink::new().on_error(move |m| seen_cb.borrow_mut().push(m.to_string()));
        let diagnostics = Diagnostics::new(Rc::new(sink));

        diagnostics.error("boom");
        diagnostics.info("falls back to tracing");

        assert_eq!(seen.borrow().as_slice(), ["boom".to_string()]);
    }
}
