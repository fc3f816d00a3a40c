//! Change-tracked row wrapper.
//!
//! A record keeps a baseline snapshot (last server-confirmed values), a live
//! view, and the set of fields whose live value differs from baseline. Field
//! access is an explicit `get`/`set` accessor contract; every successful
//! write notifies the owning controller, which promotes the record to
//! current and re-fires the collection notification.

use crate::{
    dataset::{DataSet, DataSetInner},
    state::Flag,
};
use std::{
    cell::RefCell,
    collections::BTreeSet,
    rc::{Rc, Weak},
};
use tether_core::prelude::{ID_FIELD, Row, Value};

///
/// Record
///

pub struct Record {
    id: Value,
    owner: Weak<DataSetInner>,
    baseline: RefCell<Row>,
    live: RefCell<Row>,
    pending: RefCell<BTreeSet<String>>,
    saving: Flag,
    deleting: Flag,
}

impl Record {
    pub(crate) fn from_row(owner: Weak<DataSetInner>, row: Row) -> Rc<Self> {
        Rc::new(Self {
            id: row.id(),
            owner,
            baseline: RefCell::new(row.clone()),
            live: RefCell::new(row),
            pending: RefCell::new(BTreeSet::new()),
            saving: Flag::default(),
            deleting: Flag::default(),
        })
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn id(&self) -> &Value {
        &self.id
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Value {
        self.live.borrow().value_or_null(field)
    }

    /// Full live-row snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Row {
        self.live.borrow().clone()
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Pending-change view: every dirty field with its live value.
    #[must_use]
    pub fn changes(&self) -> Row {
        let live = self.live.borrow();

        self.pending
            .borrow()
            .iter()
            .map(|field| (field.clone(), live.value_or_null(field)))
            .collect()
    }

    /// Identity match against the owning controller's current record.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|owner| owner.current_id.borrow().as_ref() == Some(&self.id))
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving.is_set()
    }

    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.deleting.is_set()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write a field, diffing against the baseline.
    ///
    /// Writing a field back to its baseline value un-dirties it. The
    /// identity field is immutable.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> bool {
        if field == ID_FIELD {
            if let Some(owner) = self.owner.upgrade() {
                owner
                    .diagnostics
                    .warn(format!("identity field '{ID_FIELD}' is immutable"));
            }

            return false;
        }

        let value = value.into();
        let baseline_value = self.baseline.borrow().value_or_null(field);

        self.live.borrow_mut().put(field, value.clone());

        if value == baseline_value {
            self.pending.borrow_mut().remove(field);
        } else {
            self.pending.borrow_mut().insert(field.to_string());
        }

        self.notify_field(field);

        true
    }

    /// Restore every dirty field to its baseline value.
    pub fn revert(&self) {
        let fields: Vec<String> = self.pending.borrow().iter().cloned().collect();

        for field in &fields {
            let baseline_value = self.baseline.borrow().value_or_null(field);
            self.live.borrow_mut().put(field, baseline_value);
            self.pending.borrow_mut().remove(field);
            self.notify_field(field);
        }
    }

    /// Merge confirmed field values into both the live view and the
    /// baseline, then clear pending changes. Keeps local state consistent
    /// with the backend after a skip-refresh update.
    pub fn apply_server_updates(&self, confirmed: &Row) {
        self.baseline.borrow_mut().merge(confirmed);
        self.live.borrow_mut().merge(confirmed);
        self.pending.borrow_mut().clear();
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Persist this record's pending changes through the owning controller.
    ///
    /// Uses the skip-refresh update path: confirmed values are merged into
    /// the baseline and dirty state clears, with no consolidating refresh.
    pub fn save(&self) -> bool {
        let Some(_guard) = self.saving.try_acquire() else {
            return false;
        };

        if !self.has_changes() {
            return true;
        }

        let Some(owner) = self.owner.upgrade() else {
            return false;
        };

        DataSet::from_inner(owner).update(&self.id, &self.changes(), true)
    }

    /// Delete this record through the owning controller.
    pub fn delete(&self) -> bool {
        let Some(_guard) = self.deleting.try_acquire() else {
            return false;
        };

        let Some(owner) = self.owner.upgrade() else {
            return false;
        };

        DataSet::from_inner(owner).delete(&self.id)
    }

    fn notify_field(&self, field: &str) {
        if let Some(owner) = self.owner.upgrade() {
            DataSet::from_inner(owner).field_changed(&self.id, field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::rc::Weak;
    use tether_core::row;

    fn detached(row: Row) -> Rc<Record> {
        Record::from_row(Weak::new(), row)
    }

    #[test]
    fn set_tracks_and_untracks_pending_fields() {
        let record = detached(row! { "id" => 1, "status" => "pending" });

        assert!(record.set("status", "done"));
        assert!(record.has_changes());
        assert_eq!(record.changes(), row! { "status" => "done" });

        // writing the baseline value back un-dirties the field
        assert!(record.set("status", "pending"));
        assert!(!record.has_changes());
    }

    #[test]
    fn identity_field_is_immutable() {
        let record = detached(row! { "id" => 1 });

        assert!(!record.set("id", 2));
        assert_eq!(record.id(), &Value::from(1));
    }

    #[test]
    fn apply_server_updates_moves_the_baseline() {
        let record = detached(row! { "id" => 1, "status" => "pending" });
        record.set("status", "done");

        record.apply_server_updates(&row! { "status" => "done" });

        assert!(!record.has_changes());
        assert_eq!(record.get("status"), Value::from("done"));

        // reverting after the merge restores the new baseline, not the old
        record.set("status", "pending");
        record.revert();
        assert_eq!(record.get("status"), Value::from("done"));
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn set_then_revert_restores_baseline(
            baseline in value_strategy(),
            written in value_strategy(),
        ) {
            let mut row = row! { "id" => 1 };
            row.put("field", baseline.clone());
            let record = detached(row);

            record.set("field", written);
            record.revert();

            prop_assert_eq!(record.get("field"), baseline);
            prop_assert!(!record.has_changes());
        }
    }
}
