//! Pure data model for the Tether binding engine.
//!
//! ## Crate layout
//! - `value`: scalar cell values with finite-number and epoch-day date wrappers.
//! - `row`: string-keyed generic row representation.
//! - `schema`: declared or sampled field-kind schemas.
//! - `filter`: filter-clause operators and row evaluation.
//! - `query`: declarative load specifications handed to executors.
//! - `diagnostics`: error/warning/info reporting seam.
//! - `error`: recoverable-failure taxonomy.
//!
//! Nothing in this crate performs I/O or holds engine state; the engine
//! lives in the `tether` crate.

pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod query;
pub mod row;
pub mod schema;
pub mod value;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        diagnostics::{CallbackSink, CaptureSink, Diagnostics, DiagnosticsSink, Severity},
        error::{BindingFailure, CapabilityReason, EngineError, ExecutorError, Mutation},
        filter::{Cmp, FilterClause},
        query::{LoadSpec, OrderDirection, SortExpr},
        row::{ID_FIELD, Row},
        schema::{FieldKind, FieldSchema},
        value::{Date, Number, Value},
    };
}
