//! In-memory reference executor.
//!
//! Evaluates the full operator set, conjunctive clause lists, sort, limit,
//! and projection against seeded tables. Mutations are last-write-wins.
//! Used by the test suite and as a fixture backend for hosts that need one.

use crate::executor::Executor;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use tether_core::prelude::{ExecutorError, ID_FIELD, LoadSpec, OrderDirection, Row, Value};

///
/// MemoryExecutor
///

#[derive(Default)]
pub struct MemoryExecutor {
    tables: RefCell<BTreeMap<String, Vec<Row>>>,
    next_id: Cell<i64>,
    query_count: Cell<u64>,
    failing_updates: RefCell<Vec<Value>>,
}

impl MemoryExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            ..Self::default()
        }
    }

    /// Seed a table, assigning integer identities to rows without one.
    pub fn seed(&self, table: impl Into<String>, rows: impl IntoIterator<Item = Row>) {
        let rows = rows.into_iter().map(|row| self.with_id(row)).collect();

        self.tables.borrow_mut().insert(table.into(), rows);
    }

    /// Mark an identity whose next updates fail with an injected error.
    pub fn fail_updates_for(&self, id: impl Into<Value>) {
        self.failing_updates.borrow_mut().push(id.into());
    }

    /// Number of `run_query` calls served so far.
    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.query_count.get()
    }

    /// Snapshot of a table's rows, for assertions.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    fn with_id(&self, mut row: Row) -> Row {
        if row.id().is_null() {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            row.put(ID_FIELD, id);
        } else if let Some(explicit) = row.id().as_f64() {
            // keep generated identities clear of explicitly seeded ones
            #[allow(clippy::cast_possible_truncation)]
            let explicit = explicit as i64;
            if explicit >= self.next_id.get() {
                self.next_id.set(explicit + 1);
            }
        }

        row
    }
}

impl Executor for MemoryExecutor {
    fn run_query(&self, spec: &LoadSpec) -> Result<Vec<Row>, ExecutorError> {
        self.query_count.set(self.query_count.get() + 1);

        let tables = self.tables.borrow();
        let rows = tables
            .get(&spec.source)
            .ok_or_else(|| ExecutorError::new(format!("unknown source '{}'", spec.source)))?;

        let mut out: Vec<Row> = rows
            .iter()
            .filter(|row| spec.filter.iter().all(|clause| clause.matches(row)))
            .cloned()
            .collect();

        if let Some(sort) = &spec.sort {
            out.sort_by(|a, b| {
                let ordering = a
                    .value_or_null(&sort.field)
                    .cmp(&b.value_or_null(&sort.field));

                match sort.direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = spec.limit {
            out.truncate(limit as usize);
        }

        if let Some(fields) = &spec.fields {
            out = out.iter().map(|row| row.project(fields)).collect();
        }

        Ok(out)
    }

    fn insert_row(&self, target: &str, row: &Row) -> Result<Row, ExecutorError> {
        let confirmed = self.with_id(row.clone());

        self.tables
            .borrow_mut()
            .entry(target.to_string())
            .or_default()
            .push(confirmed.clone());

        Ok(confirmed)
    }

    fn update_row(&self, target: &str, id: &Value, row: &Row) -> Result<(), ExecutorError> {
        if self.failing_updates.borrow().contains(id) {
            return Err(ExecutorError::new(format!(
                "injected update failure for id {id}"
            )));
        }

        let mut tables = self.tables.borrow_mut();
        let rows = tables
            .get_mut(target)
            .ok_or_else(|| ExecutorError::new(format!("unknown target '{target}'")))?;

        let existing = rows
            .iter_mut()
            .find(|r| r.id() == *id)
            .ok_or_else(|| ExecutorError::new(format!("row {id} not found in '{target}'")))?;
        existing.merge(row);

        Ok(())
    }

    fn delete_row(&self, target: &str, id: &Value) -> Result<(), ExecutorError> {
        let mut tables = self.tables.borrow_mut();
        let rows = tables
            .get_mut(target)
            .ok_or_else(|| ExecutorError::new(format!("unknown target '{target}'")))?;

        let before = rows.len();
        rows.retain(|r| r.id() != *id);

        if rows.len() == before {
            return Err(ExecutorError::new(format!(
                "row {id} not found in '{target}'"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{prelude::*, row};

    fn seeded() -> MemoryExecutor {
        let executor = MemoryExecutor::new();
        executor.seed(
            "orders",
            [
                row! { "status" => "pending", "amount" => 10, "created_at" => Date::new(2024, 1, 1) },
                row! { "status" => "done", "amount" => 5, "created_at" => Date::new(2024, 1, 2) },
                row! { "status" => "pending", "amount" => 3, "created_at" => Date::new(2024, 1, 3) },
            ],
        );

        executor
    }

    #[test]
    fn filter_sort_limit_projection() {
        let executor = seeded();
        let spec = LoadSpec::new("orders")
            .fields(["status", "created_at"])
            .filter(FilterClause::eq("status", "pending"))
            .order_by(SortExpr::desc("created_at"))
            .limit(1);

        let rows = executor.run_query(&spec).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].value_or_null("created_at"),
            Value::Date(Date::new(2024, 1, 3))
        );
        // projection keeps the identity field, drops the rest
        assert_eq!(rows[0].value("amount"), None);
        assert!(!rows[0].id().is_null());
    }

    #[test]
    fn insert_assigns_identity() {
        let executor = seeded();
        let confirmed = executor
            .insert_row("orders", &row! { "status" => "new" })
            .unwrap();

        assert!(!confirmed.id().is_null());
        assert_eq!(executor.rows("orders").len(), 4);
    }

    #[test]
    fn update_merges_and_delete_removes() {
        let executor = seeded();
        let id = executor.rows("orders")[0].id();

        executor
            .update_row("orders", &id, &row! { "status" => "done" })
            .unwrap();
        assert_eq!(
            executor.rows("orders")[0].value_or_null("status"),
            Value::from("done")
        );

        executor.delete_row("orders", &id).unwrap();
        assert_eq!(executor.rows("orders").len(), 2);
        assert!(executor.delete_row("orders", &id).is_err());
    }

    #[test]
    fn injected_update_failure_surfaces_once() {
        let executor = seeded();
        let id = executor.rows("orders")[0].id();
        executor.fail_updates_for(id.clone());

        assert!(
            executor
                .update_row("orders", &id, &row! { "status" => "done" })
                .is_err()
        );
    }

    #[test]
    fn unknown_source_is_an_executor_error() {
        let executor = MemoryExecutor::new();

        assert!(executor.run_query(&LoadSpec::new("nope")).is_err());
    }
}
