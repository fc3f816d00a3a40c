//! Load cycle, readiness, guards, grouping, and notification ordering.

use super::{dataset, ids, orders_fixture};
use crate::prelude::*;
use std::{cell::Cell, rc::Rc};

#[test]
fn filtered_sorted_limited_load() {
    let executor = orders_fixture();
    let config = DataSetConfig::new("orders")
        .fields(FieldSchema::declared([
            ("id".to_string(), FieldKind::Number),
            ("status".to_string(), FieldKind::Text),
        ]))
        .filter(FilterClause::eq("status", "pending"))
        .order_by(SortExpr::desc("created_at"))
        .limit(2);
    let (ds, _sink) = dataset("orders", config, &executor);

    ds.initialize();

    // exactly two records, both pending, descending created_at
    assert_eq!(ds.len(), 2);
    assert_eq!(ids(&ds), vec![Value::from(5), Value::from(3)]);
    for record in ds.records() {
        assert_eq!(record.get("status"), Value::from("pending"));
        // projection keeps only the declared fields plus identity
        assert_eq!(record.get("amount"), Value::Null);
    }
}

#[test]
fn current_is_first_row_after_load() {
    let executor = orders_fixture();
    let (ds, _sink) = dataset("orders", DataSetConfig::new("orders"), &executor);

    ds.initialize();

    let current = ds.current().expect("collection is non-empty");
    assert_eq!(current.id(), &Value::from(1));
    assert!(current.is_current());
    assert!(ids(&ds).contains(current.id()));
}

#[test]
fn reentrant_refresh_is_coalesced_to_one_fetch() {
    let executor = orders_fixture();
    let config = DataSetConfig::new("orders")
        .fields(FieldSchema::declared([(
            "status".to_string(),
            FieldKind::Text,
        )]))
        .auto_refresh(false);
    let (ds, _sink) = dataset("orders", config, &executor);
    ds.initialize();

    let inner = ds.clone();
    let reentered = Rc::new(Cell::new(false));
    let reentered_hook = reentered.clone();
    ds.on(HookKind::BeforeRefresh, move |_| {
        if !reentered_hook.replace(true) {
            // second call while the first is in flight: dropped, not queued
            assert!(!inner.refresh());
        }

        Ok(())
    });

    assert!(ds.refresh());
    assert!(reentered.get());
    assert_eq!(executor.query_count(), 1);
}

#[test]
fn cancelled_before_hook_stops_the_load() {
    let executor = orders_fixture();
    let config = DataSetConfig::new("orders")
        .fields(FieldSchema::declared([(
            "status".to_string(),
            FieldKind::Text,
        )]))
        .auto_refresh(false);
    let (ds, _sink) = dataset("orders", config, &executor);
    ds.initialize();

    ds.on(HookKind::BeforeRefresh, |event| {
        event.cancel();
        Ok(())
    });

    assert!(!ds.refresh());
    assert_eq!(executor.query_count(), 0);
    assert!(ds.is_empty());
}

#[test]
fn readiness_is_not_blocked_by_load_errors() {
    let executor = Rc::new(MemoryExecutor::new());
    let (ds, sink) = dataset("ghosts", DataSetConfig::new("ghosts"), &executor);

    let ran = Rc::new(Cell::new(false));
    let ran_cb = ran.clone();
    ds.on_ready(move |ds| {
        ran_cb.set(true);
        assert!(ds.is_ready());
    });
    assert!(!ran.get());

    // the source does not exist: sampling warns, the load reports an error,
    // readiness is still reached
    ds.initialize();

    assert!(ds.is_ready());
    assert!(ran.get());
    assert_eq!(sink.count(Severity::Warning), 1);
    assert_eq!(sink.count(Severity::Error), 1);
}

#[test]
fn grouping_recomputes_on_refresh_and_spec_change() {
    let executor = orders_fixture();
    let config = DataSetConfig::new("orders").group_by(
        GroupSpec::by("status").aggregate("total", AggregateOp::Sum, Some("amount")),
    );
    let (ds, _sink) = dataset("orders", config, &executor);
    ds.initialize();

    let groups = ds.groups();
    assert_eq!(groups.len(), 3);
    let pending = groups.iter().find(|g| g.key == "pending").unwrap();
    assert_eq!(pending.aggregates.value_or_null("total"), Value::from(15));

    // replacing the spec regroups in memory without a backend call
    let queries = executor.query_count();
    ds.set_group_by(Some(
        GroupSpec::by("customer_id").aggregate("n", AggregateOp::Count, None),
    ));

    assert_eq!(executor.query_count(), queries);
    let groups = ds.groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(
        groups
            .iter()
            .find(|g| g.key == "7")
            .unwrap()
            .aggregates
            .value_or_null("n"),
        Value::from(3)
    );
}

#[test]
fn field_write_promotes_record_and_renotifies() {
    let executor = orders_fixture();
    let (ds, _sink) = dataset("orders", DataSetConfig::new("orders"), &executor);
    ds.initialize();

    let notifications = Rc::new(Cell::new(0u32));
    let notifications_sub = notifications.clone();
    ds.subscribe(move |_| notifications_sub.set(notifications_sub.get() + 1));

    let current_changes = Rc::new(Cell::new(0u32));
    let current_changes_hook = current_changes.clone();
    ds.on(HookKind::CurrentChanged, move |_| {
        current_changes_hook.set(current_changes_hook.get() + 1);
        Ok(())
    });

    let third = ds.records()[2].clone();
    assert!(!third.is_current());

    third.set("status", "done");

    assert!(third.is_current());
    assert_eq!(current_changes.get(), 1);
    assert_eq!(notifications.get(), 1);
}

#[test]
fn cancel_changes_reverts_in_place_with_one_notification() {
    let executor = orders_fixture();
    let (ds, _sink) = dataset("orders", DataSetConfig::new("orders"), &executor);
    ds.initialize();

    let records = ds.records();
    records[0].set("status", "a");
    records[1].set("status", "b");
    assert!(records[0].has_changes() && records[1].has_changes());

    let notifications = Rc::new(Cell::new(0u32));
    let notifications_sub = notifications.clone();
    ds.subscribe(move |_| notifications_sub.set(notifications_sub.get() + 1));

    let queries = executor.query_count();
    ds.cancel_changes();

    assert_eq!(notifications.get(), 1);
    assert_eq!(executor.query_count(), queries);
    assert_eq!(records[0].get("status"), Value::from("pending"));
    assert_eq!(records[1].get("status"), Value::from("done"));
    assert!(!records[0].has_changes() && !records[1].has_changes());
}

#[test]
fn setting_a_non_member_current_is_rejected() {
    let executor = orders_fixture();
    let (ds, sink) = dataset("orders", DataSetConfig::new("orders"), &executor);
    ds.initialize();

    ds.set_current(Some(&Value::from(999)));

    assert_eq!(ds.current().unwrap().id(), &Value::from(1));
    assert_eq!(sink.count(Severity::Warning), 1);
}

#[test]
fn disposed_controller_is_inert() {
    let executor = orders_fixture();
    let config = DataSetConfig::new("orders").update_source("orders").allow_insert();
    let (ds, _sink) = dataset("orders", config, &executor);
    ds.initialize();

    ds.dispose();

    assert!(ds.is_destroyed());
    assert!(ds.is_empty());
    assert!(!ds.refresh());
    assert!(ds.insert(&tether_core::row! { "status" => "new" }).is_none());
    assert_eq!(executor.rows("orders").len(), 5);
}
