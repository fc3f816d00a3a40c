//! Grouping engine.
//!
//! Pure, synchronous transform over the currently loaded records; no
//! executor interaction. Buckets by the string rendering of one field,
//! preserving first-encounter order, and computes per-bucket aggregates.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tether_core::prelude::{Diagnostics, Row, Value};

///
/// AggregateOp
///
/// `Unknown` absorbs unrecognized kinds arriving through serde input; they
/// are reported as warnings and skipped at compute time.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    #[serde(other)]
    Unknown,
}

///
/// Aggregate
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub alias: String,
    pub op: AggregateOp,
    /// Source field; ignored by `count`.
    pub field: Option<String>,
}

///
/// GroupSpec
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub field: String,
    pub aggregates: Vec<Aggregate>,
    /// Fields snapshotted from the first-encountered member of each bucket.
    pub extra_fields: Vec<String>,
}

impl GroupSpec {
    #[must_use]
    pub fn by(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            aggregates: Vec::new(),
            extra_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn aggregate(
        mut self,
        alias: impl Into<String>,
        op: AggregateOp,
        field: Option<&str>,
    ) -> Self {
        self.aggregates.push(Aggregate {
            alias: alias.into(),
            op,
            field: field.map(ToString::to_string),
        });

        self
    }

    #[must_use]
    pub fn extras<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.extra_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

///
/// GroupRow
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupRow {
    pub key: String,
    pub aggregates: Row,
    pub extras: Row,
}

/// Bucket the records and compute the requested aggregates.
pub(crate) fn compute_groups(
    spec: &GroupSpec,
    records: &[Rc<Record>],
    diagnostics: &Diagnostics,
) -> Vec<GroupRow> {
    let mut keys: Vec<String> = Vec::new();
    let mut buckets: Vec<Vec<Row>> = Vec::new();

    for record in records {
        let key = record.get(&spec.field).to_string();

        let index = keys.iter().position(|k| *k == key).unwrap_or_else(|| {
            keys.push(key);
            buckets.push(Vec::new());
            keys.len() - 1
        });
        buckets[index].push(record.snapshot());
    }

    keys.into_iter()
        .zip(buckets)
        .map(|(key, rows)| {
            let mut aggregates = Row::new();

            for aggregate in &spec.aggregates {
                if let Some(value) = compute_aggregate(aggregate, &rows, diagnostics) {
                    aggregates.put(aggregate.alias.clone(), value);
                }
            }

            // additional fields come from the first-encountered member;
            // not guaranteed representative for heterogeneous buckets
            let extras = rows
                .first()
                .map(|row| row.project(&spec.extra_fields))
                .filter(|_| !spec.extra_fields.is_empty())
                .unwrap_or_default();

            GroupRow {
                key,
                aggregates,
                extras,
            }
        })
        .collect()
}

fn compute_aggregate(
    aggregate: &Aggregate,
    rows: &[Row],
    diagnostics: &Diagnostics,
) -> Option<Value> {
    if aggregate.op == AggregateOp::Unknown {
        diagnostics.warn(format!(
            "unknown aggregate kind for alias '{}'; skipped",
            aggregate.alias
        ));

        return None;
    }

    if aggregate.op == AggregateOp::Count {
        return Some(Value::from(rows.len() as i64));
    }

    let Some(field) = aggregate.field.as_deref() else {
        diagnostics.warn(format!(
            "aggregate '{}' has no source field; skipped",
            aggregate.alias
        ));

        return None;
    };

    match aggregate.op {
        AggregateOp::Sum => {
            let sum: f64 = numeric_values(rows, field).sum();

            Some(Value::number(sum))
        }
        AggregateOp::Avg => {
            let values: Vec<f64> = numeric_values(rows, field).collect();

            if values.is_empty() {
                Some(Value::Null)
            } else {
                #[allow(clippy::cast_precision_loss)]
                let count = values.len() as f64;

                Some(Value::number(values.iter().sum::<f64>() / count))
            }
        }
        AggregateOp::Min => Some(field_extreme(rows, field, false)),
        AggregateOp::Max => Some(field_extreme(rows, field, true)),
        AggregateOp::Count | AggregateOp::Unknown => None,
    }
}

fn numeric_values<'a>(rows: &'a [Row], field: &'a str) -> impl Iterator<Item = f64> + 'a {
    rows.iter().filter_map(|row| row.value_or_null(field).as_f64())
}

fn field_extreme(rows: &[Row], field: &str, max: bool) -> Value {
    let values = rows
        .iter()
        .map(|row| row.value_or_null(field))
        .filter(|value| !value.is_null());

    let extreme = if max { values.max() } else { values.min() };

    extreme.unwrap_or(Value::Null)
}
