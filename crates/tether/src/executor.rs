use tether_core::prelude::{ExecutorError, LoadSpec, Row, Value};

///
/// Executor
///
/// The backing-store collaborator. The engine lowers declarative load specs
/// and row mutations onto these four calls, never retries them, and surfaces
/// each failure exactly once through the diagnostics error channel.
///
/// The executor owns suspension and timeout policy; from the engine's
/// perspective every call completes before control returns.
///

pub trait Executor {
    fn run_query(&self, spec: &LoadSpec) -> Result<Vec<Row>, ExecutorError>;

    /// Insert a partial row into `target`, returning the confirmed row.
    fn insert_row(&self, target: &str, row: &Row) -> Result<Row, ExecutorError>;

    /// Apply a partial row onto the row identified by `id`.
    fn update_row(&self, target: &str, id: &Value, row: &Row) -> Result<(), ExecutorError>;

    fn delete_row(&self, target: &str, id: &Value) -> Result<(), ExecutorError>;
}
