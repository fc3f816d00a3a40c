//! Lifecycle hook bus.
//!
//! Named, typed events with cancellable `Before*` hooks. A cancelled before
//! hook aborts the triggering operation before any executor I/O, so a
//! cancelled operation has no partial side effects. Handler failures are
//! reported through diagnostics and never stop remaining handlers or the
//! emitting operation.

use std::{cell::{Cell, RefCell}, rc::Rc};
use tether_core::prelude::{Diagnostics, Row, Value};
use thiserror::Error as ThisError;

///
/// HookKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HookKind {
    BeforeLoad,
    AfterLoad,
    BeforeRefresh,
    AfterRefresh,
    BeforeInsert,
    AfterInsert,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    FieldChanged,
    CurrentChanged,
}

impl HookKind {
    /// Only `Before*` hooks carry the cancellation capability.
    #[must_use]
    pub const fn cancellable(self) -> bool {
        matches!(
            self,
            Self::BeforeLoad
                | Self::BeforeRefresh
                | Self::BeforeInsert
                | Self::BeforeUpdate
                | Self::BeforeDelete
        )
    }
}

///
/// HookError
///
/// Failure returned by a hook handler; logged and contained.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// HookEvent
///
/// Payload handed to handlers. `row`, `id`, and `field` are populated per
/// event kind; cancellation is honored only for cancellable kinds.
///

pub struct HookEvent<'a> {
    pub kind: HookKind,
    pub row: Option<&'a Row>,
    pub id: Option<&'a Value>,
    pub field: Option<&'a str>,
    cancelled: Cell<bool>,
}

impl<'a> HookEvent<'a> {
    #[must_use]
    pub(crate) const fn new(kind: HookKind) -> Self {
        Self {
            kind,
            row: None,
            id: None,
            field: None,
            cancelled: Cell::new(false),
        }
    }

    #[must_use]
    pub(crate) const fn with_row(mut self, row: &'a Row) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub(crate) const fn with_id(mut self, id: &'a Value) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub(crate) const fn with_field(mut self, field: &'a str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn cancel(&self) {
        if self.kind.cancellable() {
            self.cancelled.set(true);
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

///
/// HookId
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HookId(u64);

type Handler = Rc<dyn Fn(&HookEvent<'_>) -> Result<(), HookError>>;

///
/// Hooks
///
/// Per-controller handler registry.
///

pub(crate) struct Hooks {
    handlers: RefCell<Vec<(HookId, HookKind, Handler)>>,
    next_id: Cell<u64>,
    diagnostics: Diagnostics,
}

impl Hooks {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            diagnostics,
        }
    }

    pub fn on(
        &self,
        kind: HookKind,
        handler: impl Fn(&HookEvent<'_>) -> Result<(), HookError> + 'static,
    ) -> HookId {
        let id = HookId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        self.handlers
            .borrow_mut()
            .push((id, kind, Rc::new(handler)));

        id
    }

    pub fn off(&self, id: HookId) {
        self.handlers.borrow_mut().retain(|(hid, _, _)| *hid != id);
    }

    /// Run every handler registered for the event's kind.
    ///
    /// Returns `false` when a cancellable event was cancelled. Handlers are
    /// snapshotted first so one may re-register or detach hooks mid-emit.
    pub fn emit(&self, event: &HookEvent<'_>) -> bool {
        let snapshot: Vec<Handler> = self
            .handlers
            .borrow()
            .iter()
            .filter(|(_, kind, _)| *kind == event.kind)
            .map(|(_, _, handler)| handler.clone())
            .collect();

        for handler in snapshot {
            if let Err(err) = handler(event) {
                self.diagnostics
                    .warn(format!("{:?} hook handler failed: {err}", event.kind));
            }
        }

        !event.is_cancelled()
    }

    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::prelude::Severity;

    #[test]
    fn cancellation_only_applies_to_before_hooks() {
        let before = HookEvent::new(HookKind::BeforeRefresh);
        before.cancel();
        assert!(before.is_cancelled());

        let after = HookEvent::new(HookKind::AfterRefresh);
        after.cancel();
        assert!(!after.is_cancelled());
    }

    #[test]
    fn failed_handler_does_not_stop_remaining_handlers() {
        let (diagnostics, sink) = Diagnostics::capture();
        let hooks = Hooks::new(diagnostics);
        let reached = Rc::new(Cell::new(false));

        hooks.on(HookKind::AfterRefresh, |_| Err(HookError::new("boom")));
        let reached_cb = reached.clone();
        hooks.on(HookKind::AfterRefresh, move |_| {
            reached_cb.set(true);
            Ok(())
        });

        assert!(hooks.emit(&HookEvent::new(HookKind::AfterRefresh)));
        assert!(reached.get());
        assert_eq!(sink.count(Severity::Warning), 1);
    }

    #[test]
    fn detached_handler_no_longer_fires() {
        let (diagnostics, _sink) = Diagnostics::capture();
        let hooks = Hooks::new(diagnostics);
        let count = Rc::new(Cell::new(0u32));

        let count_cb = count.clone();
        let id = hooks.on(HookKind::CurrentChanged, move |_| {
            count_cb.set(count_cb.get() + 1);
            Ok(())
        });

        hooks.emit(&HookEvent::new(HookKind::CurrentChanged));
        hooks.off(id);
        hooks.emit(&HookEvent::new(HookKind::CurrentChanged));

        assert_eq!(count.get(), 1);
    }
}
