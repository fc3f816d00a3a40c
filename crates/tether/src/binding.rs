//! Master→child cascading-filter coordinator.
//!
//! A binding resolves its master controller by name through the injected
//! registry, validates the bound fields against both field lists, and once
//! bound maintains an equality filter clause derived from the master's
//! current record. Every failure mode degrades to `Unbound` with a warning;
//! the owning child then loads unfiltered, never errors.

use crate::{
    dataset::DataSetInner,
    events::{HookId, HookKind},
};
use serde::{Deserialize, Serialize};
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};
use tether_core::prelude::{BindingFailure, FilterClause};

///
/// MasterBindingDef
///
/// Static configuration: which master, and which field pair carries the
/// relation.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MasterBindingDef {
    pub master: String,
    pub child_field: String,
    pub master_field: String,
}

impl MasterBindingDef {
    #[must_use]
    pub fn new(
        master: impl Into<String>,
        child_field: impl Into<String>,
        master_field: impl Into<String>,
    ) -> Self {
        Self {
            master: master.into(),
            child_field: child_field.into(),
            master_field: master_field.into(),
        }
    }
}

///
/// BindingState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BindingState {
    Unresolved,
    Resolving,
    Validating,
    Bound,
    /// Terminal on resolution/validation failure; the child proceeds with
    /// no master-derived filter.
    Unbound,
    Disposed,
}

///
/// DerivedFilter
///
/// The clause a bound binding contributes to the child's next load.
/// `Withheld` means the master currently has no usable value for the bound
/// field: the child must short-circuit to an empty result rather than issue
/// an unfiltered query.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum DerivedFilter {
    Inactive,
    Withheld,
    Clause(FilterClause),
}

///
/// MasterBinding
///

pub(crate) struct MasterBinding {
    def: MasterBindingDef,
    state: Cell<BindingState>,
    master: RefCell<Option<Weak<DataSetInner>>>,
    derived: RefCell<DerivedFilter>,
    listener: Cell<Option<HookId>>,
}

impl MasterBinding {
    pub fn new(def: MasterBindingDef) -> Self {
        Self {
            def,
            state: Cell::new(BindingState::Unresolved),
            master: RefCell::new(None),
            derived: RefCell::new(DerivedFilter::Inactive),
            listener: Cell::new(None),
        }
    }

    pub fn state(&self) -> BindingState {
        self.state.get()
    }

    pub fn derived(&self) -> DerivedFilter {
        self.derived.borrow().clone()
    }

    pub fn master_handle(&self) -> Option<Rc<DataSetInner>> {
        self.master.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Resolve, validate, and bind against the child's master.
    ///
    /// Binding success registers the child in the master's fan-out list;
    /// that registration is removed by the child controller's own disposal
    /// path, not by [`Self::dispose`].
    pub fn initialize(&self, child: &Rc<DataSetInner>) {
        self.state.set(BindingState::Resolving);

        let Some(registry) = child.registry.clone() else {
            return self.degrade(
                child,
                BindingFailure::NoRegistry {
                    master: self.def.master.clone(),
                },
            );
        };

        let Some(master) = registry.resolve(&self.def.master) else {
            return self.degrade(
                child,
                BindingFailure::MasterNotFound {
                    master: self.def.master.clone(),
                },
            );
        };

        self.state.set(BindingState::Validating);

        let child_has_field = child
            .schema
            .borrow()
            .as_ref()
            .is_some_and(|schema| schema.contains(&self.def.child_field));
        if !child_has_field {
            return self.degrade(
                child,
                BindingFailure::MissingChildField {
                    field: self.def.child_field.clone(),
                },
            );
        }

        let master_has_field = master
            .inner()
            .schema
            .borrow()
            .as_ref()
            .is_some_and(|schema| schema.contains(&self.def.master_field));
        if !master_has_field {
            return self.degrade(
                child,
                BindingFailure::MissingMasterField {
                    master: self.def.master.clone(),
                    field: self.def.master_field.clone(),
                },
            );
        }

        self.state.set(BindingState::Bound);
        *self.master.borrow_mut() = Some(Rc::downgrade(master.inner()));

        // re-derive whenever the master's current record changes (which
        // includes master refresh completion)
        let child_weak = Rc::downgrade(child);
        let listener = master.inner().hooks.on(HookKind::CurrentChanged, move |_| {
            if let Some(child) = child_weak.upgrade() {
                if let Some(binding) = child.binding.borrow().as_ref() {
                    binding.recompute();
                }
            }

            Ok(())
        });
        self.listener.set(Some(listener));

        master.inner().register_child(child);
        self.recompute();
    }

    /// Recompute the derived clause from the master's current record.
    pub fn recompute(&self) {
        if self.state.get() != BindingState::Bound {
            *self.derived.borrow_mut() = DerivedFilter::Inactive;
            return;
        }

        let Some(master) = self.master_handle() else {
            *self.derived.borrow_mut() = DerivedFilter::Withheld;
            return;
        };

        let value = master
            .current_record()
            .map(|record| record.get(&self.def.master_field));

        *self.derived.borrow_mut() = match value {
            Some(value) if !value.is_null() => {
                DerivedFilter::Clause(FilterClause::eq(self.def.child_field.clone(), value))
            }
            // value genuinely absent, not zero or empty: the child
            // short-circuits its next load to an empty result
            _ => DerivedFilter::Withheld,
        };
    }

    /// Detach the master listener and clear the derived clause.
    ///
    /// Does not unregister the child from the master's fan-out list; the
    /// child controller owns that registration.
    pub fn dispose(&self) {
        if let (Some(master), Some(listener)) = (self.master_handle(), self.listener.take()) {
            master.hooks.off(listener);
        }

        *self.derived.borrow_mut() = DerivedFilter::Inactive;
        self.state.set(BindingState::Disposed);
    }

    fn degrade(&self, child: &Rc<DataSetInner>, failure: BindingFailure) {
        self.state.set(BindingState::Unbound);
        *self.derived.borrow_mut() = DerivedFilter::Inactive;

        child
            .diagnostics
            .warn(format!("master binding degraded to unbound: {failure}"));
    }
}
