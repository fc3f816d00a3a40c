use crate::value::Value;
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity field every mirrored source is expected to expose.
pub const ID_FIELD: &str = "id";

///
/// Row
///
/// String-keyed generic value map; the fallback row shape when no field
/// schema is declared. Keys are canonically ordered.
///

#[derive(
    Clone, Debug, Default, Deref, DerefMut, Eq, IntoIterator, PartialEq, Serialize, Deserialize,
)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Read a field, treating absence as `Null`.
    #[must_use]
    pub fn value_or_null(&self, field: &str) -> Value {
        self.0.get(field).cloned().unwrap_or(Value::Null)
    }

    pub fn put(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn id(&self) -> Value {
        self.value_or_null(ID_FIELD)
    }

    /// Overlay every field of `other` onto this row.
    pub fn merge(&mut self, other: &Self) {
        for (field, value) in &other.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Restrict to the named fields; the identity field is always retained.
    #[must_use]
    pub fn project(&self, fields: &[String]) -> Self {
        let mut out = Self::new();

        for (field, value) in &self.0 {
            if field == ID_FIELD || fields.iter().any(|f| f == field) {
                out.0.insert(field.clone(), value.clone());
            }
        }

        out
    }

    #[must_use]
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Value>> for Row {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Build a [`Row`] from field/value literals.
///
/// ```ignore
/// let row = row! { "id" => 1, "status" => "pending" };
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::row::Row::new() };
    ( $( $field:expr => $value:expr ),+ $(,)? ) => {{
        let mut row = $crate::row::Row::new();
        $( row.put($field, $value); )+
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_field_reads_as_null() {
        let row = row! { "id" => 1 };

        assert_eq!(row.value_or_null("status"), Value::Null);
        assert_eq!(row.value("status"), None);
    }

    #[test]
    fn merge_overlays_fields() {
        let mut row = row! { "id" => 1, "status" => "pending" };
        row.merge(&row! { "status" => "done", "amount" => 3 });

        assert_eq!(row.value_or_null("status"), Value::from("done"));
        assert_eq!(row.value_or_null("amount"), Value::from(3));
        assert_eq!(row.id(), Value::from(1));
    }

    #[test]
    fn projection_always_keeps_identity() {
        let row = row! { "id" => 7, "status" => "pending", "amount" => 3 };
        let projected = row.project(&["status".to_string()]);

        assert_eq!(projected.id(), Value::from(7));
        assert_eq!(projected.value("amount"), None);
        assert_eq!(projected.value_or_null("status"), Value::from("pending"));
    }
}
