use crate::filter::FilterClause;
use serde::{Deserialize, Serialize};

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

///
/// SortExpr
///
/// Schema-agnostic sort expression; lowered by the executor.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SortExpr {
    pub field: String,
    pub direction: OrderDirection,
}

impl SortExpr {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

///
/// LoadSpec
///
/// Declarative load description handed to the executor: source, optional
/// projection, conjunctive filter clauses, sort, and row limit.
/// Immutable for the duration of one load cycle.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LoadSpec {
    pub source: String,
    /// `None` means "all fields".
    pub fields: Option<Vec<String>>,
    pub filter: Vec<FilterClause>,
    pub sort: Option<SortExpr>,
    pub limit: Option<u32>,
}

impl LoadSpec {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Query refinement
    // ------------------------------------------------------------------

    #[must_use]
    pub fn fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluent_refinement_composes() {
        let spec = LoadSpec::new("orders")
            .fields(["id", "status"])
            .filter(FilterClause::eq("status", "pending"))
            .order_by(SortExpr::desc("created_at"))
            .limit(2);

        assert_eq!(spec.source, "orders");
        assert_eq!(spec.fields.as_deref().unwrap().len(), 2);
        assert_eq!(spec.filter.len(), 1);
        assert_eq!(spec.sort.as_ref().unwrap().direction, OrderDirection::Desc);
        assert_eq!(spec.limit, Some(2));
    }
}
