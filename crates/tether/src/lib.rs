//! Tether, a reactive record-binding engine.
//!
//! Mirrors subsets of rows from a remote relational source into observable,
//! change-tracked collections, and keeps dependent child collections
//! automatically re-filtered when a master collection's current row changes.
//!
//! ## Crate layout
//! - `dataset`: the collection controller (load/refresh/CRUD orchestration).
//! - `record`: change-tracked row wrappers.
//! - `binding`: master→child cascading-filter coordination.
//! - `group`: the pure grouping/aggregation engine.
//! - `events` / `notify`: lifecycle hooks and collection change notifier.
//! - `executor` / `registry` / `storage`: consumed collaborator seams.
//! - `memory`: in-memory reference executor for tests and fixtures.
//!
//! The pure data model (values, rows, schemas, filter clauses, load specs,
//! diagnostics) lives in `tether-core`.

pub mod binding;
pub mod dataset;
pub mod events;
pub mod executor;
pub mod group;
pub mod memory;
pub mod notify;
pub mod record;
pub mod registry;
pub mod storage;

pub(crate) mod state;

#[cfg(test)]
mod tests;

pub use tether_core as core;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        binding::{BindingState, MasterBindingDef},
        dataset::{DataSet, DataSetConfig},
        events::{HookError, HookEvent, HookId, HookKind},
        executor::Executor,
        group::{Aggregate, AggregateOp, GroupRow, GroupSpec},
        memory::MemoryExecutor,
        notify::SubscriptionId,
        record::Record,
        registry::{MapRegistry, Registry},
        storage::{BlobStore, MemoryBlobStore, ScopedStore},
    };
    pub use tether_core::prelude::*;
}
