//! Collection controller.
//!
//! A `DataSet` owns one mirrored record collection: it composes declarative
//! load specs (declared clauses plus any master-derived clause), hands them
//! to the executor, wraps returned rows as change-tracked records, runs
//! grouping, maintains the current record, and fans out lifecycle events,
//! change notifications, and cascading child refreshes.

use crate::{
    binding::{BindingState, DerivedFilter, MasterBinding, MasterBindingDef},
    events::{HookError, HookEvent, HookId, HookKind, Hooks},
    executor::Executor,
    group::{GroupRow, GroupSpec, compute_groups},
    notify::{ChangeNotifier, SubscriptionId},
    record::Record,
    registry::Registry,
    state::Flag,
};
use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};
use tether_core::prelude::{
    CapabilityReason, Diagnostics, EngineError, FieldSchema, FilterClause, ID_FIELD, LoadSpec,
    Mutation, Row, SortExpr, Value,
};

///
/// DataSetConfig
///
/// Declarative controller configuration. Mutations stay denied until a
/// mutation target is configured and the matching capability flag enabled.
///

#[derive(Clone)]
pub struct DataSetConfig {
    pub(crate) source: String,
    pub(crate) update_source: Option<String>,
    pub(crate) fields: Option<FieldSchema>,
    pub(crate) filter: Vec<FilterClause>,
    pub(crate) sort: Option<SortExpr>,
    pub(crate) limit: Option<u32>,
    pub(crate) group_by: Option<GroupSpec>,
    pub(crate) master: Option<MasterBindingDef>,
    pub(crate) allow_insert: bool,
    pub(crate) allow_update: bool,
    pub(crate) allow_delete: bool,
    pub(crate) auto_refresh: bool,
}

impl DataSetConfig {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            update_source: None,
            fields: None,
            filter: Vec::new(),
            sort: None,
            limit: None,
            group_by: None,
            master: None,
            allow_insert: false,
            allow_update: false,
            allow_delete: false,
            auto_refresh: true,
        }
    }

    /// Target for insert/update/delete; mutations are denied without one.
    #[must_use]
    pub fn update_source(mut self, target: impl Into<String>) -> Self {
        self.update_source = Some(target.into());
        self
    }

    /// Declare the field list up front instead of sampling one row.
    #[must_use]
    pub fn fields(mut self, schema: FieldSchema) -> Self {
        self.fields = Some(schema);
        self
    }

    #[must_use]
    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.filter.push(clause);
        self
    }

    #[must_use]
    pub fn order_by(mut self, sort: SortExpr) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn group_by(mut self, spec: GroupSpec) -> Self {
        self.group_by = Some(spec);
        self
    }

    #[must_use]
    pub fn master(mut self, def: MasterBindingDef) -> Self {
        self.master = Some(def);
        self
    }

    #[must_use]
    pub fn allow_insert(mut self) -> Self {
        self.allow_insert = true;
        self
    }

    #[must_use]
    pub fn allow_update(mut self) -> Self {
        self.allow_update = true;
        self
    }

    #[must_use]
    pub fn allow_delete(mut self) -> Self {
        self.allow_delete = true;
        self
    }

    #[must_use]
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }
}

///
/// DataSetInner
///
/// Shared controller state. Handles (`DataSet`), records, bindings, and
/// child registrations all reference this allocation; records and child
/// registrations hold weak back-references, never ownership.
///

pub(crate) struct DataSetInner {
    pub(crate) name: String,
    pub(crate) config: DataSetConfig,
    pub(crate) executor: Rc<dyn Executor>,
    pub(crate) registry: Option<Rc<dyn Registry>>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) schema: RefCell<Option<FieldSchema>>,
    pub(crate) records: RefCell<Vec<Rc<Record>>>,
    pub(crate) current_id: RefCell<Option<Value>>,
    pub(crate) group_spec: RefCell<Option<GroupSpec>>,
    pub(crate) groups: RefCell<Vec<GroupRow>>,
    pub(crate) binding: RefCell<Option<MasterBinding>>,
    pub(crate) children: RefCell<Vec<Weak<DataSetInner>>>,
    pub(crate) hooks: Hooks,
    pub(crate) notifier: ChangeNotifier,
    refreshing: Flag,
    updating: Flag,
    saving: Flag,
    destroyed: Cell<bool>,
    ready: Cell<bool>,
    ready_queue: RefCell<Vec<Box<dyn FnOnce(&DataSet)>>>,
    mute_notify: Cell<bool>,
}

impl DataSetInner {
    pub(crate) fn current_record(&self) -> Option<Rc<Record>> {
        let id = self.current_id.borrow().clone()?;

        self.records
            .borrow()
            .iter()
            .find(|record| *record.id() == id)
            .cloned()
    }

    pub(crate) fn register_child(&self, child: &Rc<Self>) {
        let weak = Rc::downgrade(child);
        let mut children = self.children.borrow_mut();

        if !children.iter().any(|existing| existing.ptr_eq(&weak)) {
            children.push(weak);
        }
    }
}

#[derive(Clone, Copy)]
enum LoadKind {
    Initial,
    Refresh,
}

///
/// DataSet
///
/// Cheaply cloneable controller handle.
///

#[derive(Clone)]
pub struct DataSet {
    inner: Rc<DataSetInner>,
}

impl DataSet {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        config: DataSetConfig,
        executor: Rc<dyn Executor>,
        registry: Option<Rc<dyn Registry>>,
        diagnostics: Diagnostics,
    ) -> Self {
        let group_spec = config.group_by.clone();

        Self {
            inner: Rc::new(DataSetInner {
                name: name.into(),
                config,
                executor,
                registry,
                diagnostics: diagnostics.clone(),
                schema: RefCell::new(None),
                records: RefCell::new(Vec::new()),
                current_id: RefCell::new(None),
                group_spec: RefCell::new(group_spec),
                groups: RefCell::new(Vec::new()),
                binding: RefCell::new(None),
                children: RefCell::new(Vec::new()),
                hooks: Hooks::new(diagnostics),
                notifier: ChangeNotifier::default(),
                refreshing: Flag::default(),
                updating: Flag::default(),
                saving: Flag::default(),
                destroyed: Cell::new(false),
                ready: Cell::new(false),
                ready_queue: RefCell::new(Vec::new()),
                mute_notify: Cell::new(false),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<DataSetInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<DataSetInner> {
        &self.inner
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.config.source
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.is_set()
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.inner.saving.is_set()
    }

    #[must_use]
    pub fn schema(&self) -> Option<FieldSchema> {
        self.inner.schema.borrow().clone()
    }

    #[must_use]
    pub fn records(&self) -> Vec<Rc<Record>> {
        self.inner.records.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.records.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.records.borrow().is_empty()
    }

    #[must_use]
    pub fn current(&self) -> Option<Rc<Record>> {
        self.inner.current_record()
    }

    #[must_use]
    pub fn groups(&self) -> Vec<GroupRow> {
        self.inner.groups.borrow().clone()
    }

    #[must_use]
    pub fn binding_state(&self) -> Option<BindingState> {
        self.inner.binding.borrow().as_ref().map(MasterBinding::state)
    }

    // ------------------------------------------------------------------
    // Hooks, notifications, readiness
    // ------------------------------------------------------------------

    pub fn on(
        &self,
        kind: HookKind,
        handler: impl Fn(&HookEvent<'_>) -> Result<(), HookError> + 'static,
    ) -> HookId {
        self.inner.hooks.on(kind, handler)
    }

    pub fn off(&self, id: HookId) {
        self.inner.hooks.off(id);
    }

    pub fn subscribe(&self, subscriber: impl Fn(&[Rc<Record>]) + 'static) -> SubscriptionId {
        self.inner.notifier.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.notifier.unsubscribe(id);
    }

    /// Run `callback` once the controller is ready; immediately when it
    /// already is.
    pub fn on_ready(&self, callback: impl FnOnce(&Self) + 'static) {
        if self.inner.destroyed.get() {
            return;
        }

        if self.inner.ready.get() {
            callback(self);
        } else {
            self.inner.ready_queue.borrow_mut().push(Box::new(callback));
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Resolve the field schema, bind to the master if configured, and,
    /// with auto-refresh enabled, perform the initial load.
    ///
    /// Readiness is set in a finally step: load errors never block it.
    pub fn initialize(&self) {
        if self.inner.destroyed.get() || self.inner.ready.get() {
            return;
        }

        let schema = match &self.inner.config.fields {
            Some(declared) => Some(declared.clone()),
            None => self.sample_schema(),
        };
        *self.inner.schema.borrow_mut() = schema;

        if let Some(def) = self.inner.config.master.clone() {
            *self.inner.binding.borrow_mut() = Some(MasterBinding::new(def));

            if let Some(binding) = self.inner.binding.borrow().as_ref() {
                binding.initialize(&self.inner);
            }
        }

        if self.inner.config.auto_refresh {
            self.load(LoadKind::Initial);
        }

        self.inner.ready.set(true);

        let queued: Vec<_> = self.inner.ready_queue.borrow_mut().drain(..).collect();
        for callback in queued {
            callback(self);
        }
    }

    /// Re-run the load cycle. A call arriving while one is in flight is
    /// dropped as a no-op.
    pub fn refresh(&self) -> bool {
        self.load(LoadKind::Refresh)
    }

    /// Tear the controller down; every subsequent operation is a no-op.
    pub fn dispose(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }

        // the controller, not the binding, owns the removal of its
        // registration from the master's fan-out list
        if let Some(binding) = self.inner.binding.borrow().as_ref() {
            if let Some(master) = binding.master_handle() {
                let me = Rc::downgrade(&self.inner);
                master.children.borrow_mut().retain(|w| !w.ptr_eq(&me));
            }

            binding.dispose();
        }

        self.inner.records.borrow_mut().clear();
        self.inner.groups.borrow_mut().clear();
        self.inner.children.borrow_mut().clear();
        self.inner.ready_queue.borrow_mut().clear();
        *self.inner.current_id.borrow_mut() = None;
        self.inner.notifier.clear();
        self.inner.hooks.clear();
    }

    // ------------------------------------------------------------------
    // Current record
    // ------------------------------------------------------------------

    /// Change the current record by identity.
    ///
    /// A no-op on identity match; otherwise emits `CurrentChanged`, fires a
    /// change notification, and triggers a refresh of every registered,
    /// live, ready child.
    pub fn set_current(&self, id: Option<&Value>) {
        if self.inner.destroyed.get() {
            return;
        }

        if self.inner.current_id.borrow().as_ref() == id {
            return;
        }

        if let Some(id) = id {
            let member = self
                .inner
                .records
                .borrow()
                .iter()
                .any(|record| record.id() == id);

            if !member {
                self.inner.diagnostics.warn(format!(
                    "current record {id} is not a member of '{}'",
                    self.inner.name
                ));

                return;
            }
        }

        self.assign_current(id.cloned());
        self.notify();
        self.cascade_children();
    }

    /// Controller-side observer for record field writes.
    ///
    /// Promotes the written record to current and re-fires the collection
    /// notification; suppressed while a batch revert is in progress.
    pub(crate) fn field_changed(&self, id: &Value, field: &str) {
        if self.inner.destroyed.get() {
            return;
        }

        self.inner
            .hooks
            .emit(&HookEvent::new(HookKind::FieldChanged).with_id(id).with_field(field));

        if self.inner.mute_notify.get() {
            return;
        }

        let is_current = self.inner.current_id.borrow().as_ref() == Some(id);
        if is_current {
            self.notify();
        } else {
            self.set_current(Some(id));
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Insert a partial row, returning the confirmed row on success.
    pub fn insert(&self, partial: &Row) -> Option<Row> {
        if self.inner.destroyed.get() {
            return None;
        }

        let target = self.capability(Mutation::Insert, self.inner.config.allow_insert)?;
        let _guard = self.inner.updating.try_acquire()?;

        if !self
            .inner
            .hooks
            .emit(&HookEvent::new(HookKind::BeforeInsert).with_row(partial))
        {
            return None;
        }

        match self.inner.executor.insert_row(&target, partial) {
            Ok(confirmed) => {
                self.inner
                    .hooks
                    .emit(&HookEvent::new(HookKind::AfterInsert).with_row(&confirmed));
                self.refresh();

                Some(confirmed)
            }
            Err(err) => {
                self.inner
                    .diagnostics
                    .error(format!("insert into '{target}' failed: {err}"));

                None
            }
        }
    }

    /// Apply a partial row onto the row identified by `id`.
    ///
    /// With `skip_refresh`, confirmed values are merged onto the matching
    /// record's baseline and its pending changes clear, avoiding a refresh
    /// round-trip (the batch-save path).
    pub fn update(&self, id: &Value, partial: &Row, skip_refresh: bool) -> bool {
        if self.inner.destroyed.get() {
            return false;
        }

        let Some(target) = self.capability(Mutation::Update, self.inner.config.allow_update) else {
            return false;
        };
        let Some(_guard) = self.inner.updating.try_acquire() else {
            return false;
        };

        if !self
            .inner
            .hooks
            .emit(&HookEvent::new(HookKind::BeforeUpdate).with_id(id).with_row(partial))
        {
            return false;
        }

        match self.inner.executor.update_row(&target, id, partial) {
            Ok(()) => {
                self.inner
                    .hooks
                    .emit(&HookEvent::new(HookKind::AfterUpdate).with_id(id).with_row(partial));

                if skip_refresh {
                    // confirmed values land on the matching record's
                    // baseline; no notification and no refresh round-trip
                    let record = self
                        .inner
                        .records
                        .borrow()
                        .iter()
                        .find(|record| record.id() == id)
                        .cloned();

                    if let Some(record) = record {
                        record.apply_server_updates(partial);
                    }
                } else {
                    self.refresh();
                }

                true
            }
            Err(err) => {
                self.inner
                    .diagnostics
                    .error(format!("update of {id} in '{target}' failed: {err}"));

                false
            }
        }
    }

    /// Delete the row identified by `id`.
    pub fn delete(&self, id: &Value) -> bool {
        if self.inner.destroyed.get() {
            return false;
        }

        let Some(target) = self.capability(Mutation::Delete, self.inner.config.allow_delete) else {
            return false;
        };
        let Some(_guard) = self.inner.updating.try_acquire() else {
            return false;
        };

        if !self
            .inner
            .hooks
            .emit(&HookEvent::new(HookKind::BeforeDelete).with_id(id))
        {
            return false;
        }

        match self.inner.executor.delete_row(&target, id) {
            Ok(()) => {
                self.inner
                    .hooks
                    .emit(&HookEvent::new(HookKind::AfterDelete).with_id(id));
                self.refresh();

                true
            }
            Err(err) => {
                self.inner
                    .diagnostics
                    .error(format!("delete of {id} from '{target}' failed: {err}"));

                false
            }
        }
    }

    /// Save every record with pending changes, then refresh once.
    ///
    /// All saves are issued before the consolidating refresh; one record's
    /// failure never cancels or rolls back the others, and each failure is
    /// reported independently.
    pub fn save_changes(&self) -> bool {
        if self.inner.destroyed.get() {
            return false;
        }

        let Some(_guard) = self.inner.saving.try_acquire() else {
            return false;
        };

        let dirty: Vec<Rc<Record>> = self
            .inner
            .records
            .borrow()
            .iter()
            .filter(|record| record.has_changes())
            .cloned()
            .collect();

        let mut all_ok = true;
        for record in &dirty {
            if !record.save() {
                all_ok = false;
            }
        }

        self.refresh();

        all_ok
    }

    /// Revert every changed record to its baseline in place.
    ///
    /// No executor call; exactly one change notification.
    pub fn cancel_changes(&self) {
        if self.inner.destroyed.get() {
            return;
        }

        let dirty: Vec<Rc<Record>> = self
            .inner
            .records
            .borrow()
            .iter()
            .filter(|record| record.has_changes())
            .cloned()
            .collect();

        self.inner.mute_notify.set(true);
        for record in &dirty {
            record.revert();
        }
        self.inner.mute_notify.set(false);

        self.notify();
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    /// Replace the grouping spec and recompute from the in-memory
    /// collection; never touches the executor.
    pub fn set_group_by(&self, spec: Option<GroupSpec>) {
        if self.inner.destroyed.get() {
            return;
        }

        *self.inner.group_spec.borrow_mut() = spec;
        self.recompute_groups();
    }

    // ------------------------------------------------------------------
    // Load cycle
    // ------------------------------------------------------------------

    fn load(&self, kind: LoadKind) -> bool {
        if self.inner.destroyed.get() {
            return false;
        }

        let Some(_guard) = self.inner.refreshing.try_acquire() else {
            // an equivalent load is in flight; coalesce silently
            return false;
        };

        let (before, after) = match kind {
            LoadKind::Initial => (HookKind::BeforeLoad, HookKind::AfterLoad),
            LoadKind::Refresh => (HookKind::BeforeRefresh, HookKind::AfterRefresh),
        };

        if !self.inner.hooks.emit(&HookEvent::new(before)) {
            return false;
        }

        let rows = match self.compose_spec() {
            // master value withheld: empty result without touching the
            // executor
            None => Vec::new(),
            Some(spec) => match self.inner.executor.run_query(&spec) {
                Ok(rows) => rows,
                Err(err) => {
                    self.inner.diagnostics.error(format!(
                        "load of '{}' failed: {err}",
                        self.inner.config.source
                    ));

                    return false;
                }
            },
        };

        let owner = Rc::downgrade(&self.inner);
        let records: Vec<Rc<Record>> = rows
            .into_iter()
            .map(|row| Record::from_row(owner.clone(), row))
            .collect();
        let first_id = records.first().map(|record| record.id().clone());

        *self.inner.records.borrow_mut() = records;

        self.recompute_groups();
        // bindings of bound children re-derive on this emission, before any
        // child refresh begins
        self.assign_current(first_id);

        self.notify();
        self.inner.hooks.emit(&HookEvent::new(after));
        self.cascade_children();

        true
    }

    fn compose_spec(&self) -> Option<LoadSpec> {
        let config = &self.inner.config;
        let mut spec = LoadSpec::new(config.source.clone());

        if let Some(declared) = &config.fields {
            let mut names = declared.names();

            if !names.iter().any(|name| name == ID_FIELD) {
                names.insert(0, ID_FIELD.to_string());
            }

            spec.fields = Some(names);
        }

        spec.filter = config.filter.clone();

        if let Some(binding) = self.inner.binding.borrow().as_ref() {
            match binding.derived() {
                DerivedFilter::Inactive => {}
                DerivedFilter::Withheld => return None,
                DerivedFilter::Clause(clause) => spec.filter.push(clause),
            }
        }

        spec.sort = config.sort.clone();
        spec.limit = config.limit;

        Some(spec)
    }

    fn sample_schema(&self) -> Option<FieldSchema> {
        let spec = LoadSpec::new(self.inner.config.source.clone()).limit(1);

        match self.inner.executor.run_query(&spec) {
            Ok(rows) => rows.first().map(FieldSchema::inferred),
            Err(err) => {
                self.inner.diagnostics.warn(format!(
                    "field sampling for '{}' failed: {err}",
                    self.inner.config.source
                ));

                None
            }
        }
    }

    fn recompute_groups(&self) {
        let computed = match self.inner.group_spec.borrow().as_ref() {
            Some(spec) => {
                compute_groups(spec, &self.inner.records.borrow(), &self.inner.diagnostics)
            }
            None => Vec::new(),
        };

        *self.inner.groups.borrow_mut() = computed;
    }

    fn assign_current(&self, id: Option<Value>) {
        *self.inner.current_id.borrow_mut() = id.clone();

        let event = HookEvent::new(HookKind::CurrentChanged);
        match &id {
            Some(id) => {
                self.inner.hooks.emit(&event.with_id(id));
            }
            None => {
                self.inner.hooks.emit(&event);
            }
        }
    }

    fn notify(&self) {
        if self.inner.mute_notify.get() {
            return;
        }

        let records = self.inner.records.borrow().clone();
        self.inner.notifier.emit(&records);
    }

    fn cascade_children(&self) {
        let children: Vec<Rc<DataSetInner>> = {
            let mut registered = self.inner.children.borrow_mut();
            registered.retain(|weak| weak.upgrade().is_some());

            registered.iter().filter_map(Weak::upgrade).collect()
        };

        for child in children {
            if child.destroyed.get() || !child.ready.get() || child.refreshing.is_set() {
                continue;
            }

            let child = Self::from_inner(child);
            if !child.refresh() {
                self.inner.diagnostics.warn(format!(
                    "child '{}' refresh did not complete after current-record change on '{}'",
                    child.name(),
                    self.inner.name
                ));
            }
        }
    }

    fn capability(&self, operation: Mutation, enabled: bool) -> Option<String> {
        let reason = if enabled {
            if self.inner.config.update_source.is_none() {
                Some(CapabilityReason::NoMutationTarget)
            } else {
                None
            }
        } else {
            Some(CapabilityReason::Disabled)
        };

        if let Some(reason) = reason {
            self.inner
                .diagnostics
                .warn(EngineError::CapabilityDenied { operation, reason }.to_string());

            return None;
        }

        self.inner.config.update_source.clone()
    }
}
