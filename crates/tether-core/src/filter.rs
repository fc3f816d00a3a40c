use crate::{row::Row, value::Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Cmp
///
/// Operator set for filter clauses. Each operator maps 1:1 onto an executor
/// predicate; serde names follow the declarative wire spelling.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Cmp {
    #[serde(rename = "equals")]
    Eq,
    #[serde(rename = "notequals")]
    Ne,
    #[serde(rename = "greaterthan")]
    Gt,
    #[serde(rename = "lessthan")]
    Lt,
    #[serde(rename = "isnull")]
    IsNull,
    #[serde(rename = "isnotnull")]
    IsNotNull,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "ilike")]
    LikeCi,
}

impl Cmp {
    /// Operators whose right-hand value is structurally absent.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

///
/// FilterClause
///
/// One `field cmp value` condition. Clause lists compose by conjunction in
/// declaration order.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub cmp: Cmp,
    pub value: Option<Value>,
}

impl FilterClause {
    #[must_use]
    pub fn new(field: impl Into<String>, cmp: Cmp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            cmp,
            value: Some(value.into()),
        }
    }

    fn unary(field: String, cmp: Cmp) -> Self {
        Self {
            field,
            cmp,
            value: None,
        }
    }

    // --- Equality ---

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Cmp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Cmp::Ne, value)
    }

    // --- Ordering ---

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Cmp::Gt, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Cmp::Lt, value)
    }

    // --- Presence ---

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::unary(field.into(), Cmp::IsNull)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::unary(field.into(), Cmp::IsNotNull)
    }

    // --- Patterns ---

    pub fn like(field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::new(field, Cmp::Like, pattern)
    }

    pub fn like_ci(field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::new(field, Cmp::LikeCi, pattern)
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluate the clause against one row.
    ///
    /// Ordering operators require matching kinds; a valued operator with a
    /// structurally missing right-hand side never matches.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.value_or_null(&self.field);

        match self.cmp {
            Cmp::IsNull => actual.is_null(),
            Cmp::IsNotNull => !actual.is_null(),
            Cmp::Eq => self.value.as_ref() == Some(&actual),
            Cmp::Ne => self.value.as_ref().is_some_and(|v| *v != actual),
            Cmp::Gt => self.compare(&actual) == Some(Ordering::Greater),
            Cmp::Lt => self.compare(&actual) == Some(Ordering::Less),
            Cmp::Like => self.pattern_match(&actual, false),
            Cmp::LikeCi => self.pattern_match(&actual, true),
        }
    }

    fn compare(&self, actual: &Value) -> Option<Ordering> {
        let expected = self.value.as_ref()?;

        actual.compare_same_kind(expected)
    }

    fn pattern_match(&self, actual: &Value, ci: bool) -> bool {
        if actual.is_null() {
            return false;
        }

        let Some(pattern) = self.value.as_ref().and_then(Value::as_text) else {
            return false;
        };

        like_match(&actual.to_string(), pattern, ci)
    }
}

/// SQL-style pattern match: `%` spans any run, `_` one character.
fn like_match(text: &str, pattern: &str, ci: bool) -> bool {
    if ci {
        return like_chars(
            &text.to_lowercase().chars().collect::<Vec<_>>(),
            &pattern.to_lowercase().chars().collect::<Vec<_>>(),
        );
    }

    like_chars(
        &text.chars().collect::<Vec<_>>(),
        &pattern.chars().collect::<Vec<_>>(),
    )
}

fn like_chars(text: &[char], pattern: &[char]) -> bool {
    // two-pointer wildcard match with backtracking over the last `%`
    let (mut t, mut p) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use proptest::prelude::*;

    #[test]
    fn equality_and_presence() {
        let row = row! { "id" => 7, "status" => "pending", "note" => Value::Null };

        assert!(FilterClause::eq("status", "pending").matches(&row));
        assert!(!FilterClause::eq("status", "done").matches(&row));
        assert!(FilterClause::ne("id", 9).matches(&row));
        assert!(FilterClause::is_null("note").matches(&row));
        assert!(FilterClause::is_null("missing").matches(&row));
        assert!(FilterClause::is_not_null("id").matches(&row));
    }

    #[test]
    fn ordering_requires_matching_kinds() {
        let row = row! { "amount" => 10 };

        assert!(FilterClause::gt("amount", 5).matches(&row));
        assert!(FilterClause::lt("amount", 11).matches(&row));
        assert!(!FilterClause::gt("amount", "5").matches(&row));
        assert!(!FilterClause::lt("amount", 10).matches(&row));
    }

    #[test]
    fn like_patterns() {
        let row = row! { "name" => "Ada Lovelace" };

        assert!(FilterClause::like("name", "Ada%").matches(&row));
        assert!(FilterClause::like("name", "%Love%").matches(&row));
        assert!(FilterClause::like("name", "Ada L_velace").matches(&row));
        assert!(!FilterClause::like("name", "ada%").matches(&row));
        assert!(FilterClause::like_ci("name", "ada%").matches(&row));
        assert!(!FilterClause::like("name", "Ada").matches(&row));
    }

    proptest! {
        #[test]
        fn wildcard_free_patterns_match_only_themselves(
            text in "[a-z]{1,8}",
            pattern in "[a-z]{1,8}",
        ) {
            let row = row! { "f" => text.clone() };

            prop_assert!(FilterClause::like("f", text.clone()).matches(&row));
            prop_assert_eq!(
                FilterClause::like("f", pattern.clone()).matches(&row),
                text == pattern
            );
            prop_assert!(
                FilterClause::like_ci("f", text.to_uppercase()).matches(&row)
            );
        }
    }

    #[test]
    fn serde_uses_wire_operator_names() {
        let clause = FilterClause::gt("amount", 5);
        let json = serde_json::to_string(&clause).unwrap();

        assert_eq!(
            json,
            r#"{"field":"amount","cmp":"greaterthan","value":5.0}"#
        );

        let back: FilterClause = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clause);
    }
}
