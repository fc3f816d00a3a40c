//! End-to-end controller scenarios against the in-memory reference executor.

mod lifecycle;

use crate::prelude::*;
use std::rc::Rc;
use tether_core::row;

pub(crate) fn orders_fixture() -> Rc<MemoryExecutor> {
    let executor = Rc::new(MemoryExecutor::new());

    executor.seed(
        "orders",
        [
            row! { "id" => 1, "customer_id" => 7, "status" => "pending", "amount" => 10, "created_at" => Date::new(2024, 1, 1) },
            row! { "id" => 2, "customer_id" => 7, "status" => "done", "amount" => 5, "created_at" => Date::new(2024, 1, 2) },
            row! { "id" => 3, "customer_id" => 9, "status" => "pending", "amount" => 3, "created_at" => Date::new(2024, 1, 3) },
            row! { "id" => 4, "customer_id" => 9, "status" => "shipped", "amount" => 8, "created_at" => Date::new(2024, 1, 4) },
            row! { "id" => 5, "customer_id" => 7, "status" => "pending", "amount" => 2, "created_at" => Date::new(2024, 1, 5) },
        ],
    );
    executor.seed(
        "customers",
        [
            row! { "id" => 7, "name" => "Ada" },
            row! { "id" => 9, "name" => "Grace" },
        ],
    );

    executor
}

pub(crate) fn dataset(
    name: &str,
    config: DataSetConfig,
    executor: &Rc<MemoryExecutor>,
) -> (DataSet, Rc<CaptureSink>) {
    let (diagnostics, sink) = Diagnostics::capture();
    let ds = DataSet::new(name, config, executor.clone(), None, diagnostics);

    (ds, sink)
}

pub(crate) fn bound_dataset(
    name: &str,
    config: DataSetConfig,
    executor: &Rc<MemoryExecutor>,
    registry: &Rc<MapRegistry>,
) -> (DataSet, Rc<CaptureSink>) {
    let (diagnostics, sink) = Diagnostics::capture();
    let ds = DataSet::new(
        name,
        config,
        executor.clone(),
        Some(registry.clone() as Rc<dyn Registry>),
        diagnostics,
    );
    registry.register(&ds);

    (ds, sink)
}

pub(crate) fn ids(ds: &DataSet) -> Vec<Value> {
    ds.records().iter().map(|r| r.id().clone()).collect()
}
