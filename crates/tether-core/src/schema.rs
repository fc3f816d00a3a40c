use crate::{row::Row, value::Value};
use serde::{Deserialize, Serialize};

///
/// FieldKind
///
/// Value-kind tag for a declared field.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Bool,
    Date,
    Number,
    Text,
}

impl FieldKind {
    /// Kind of a sampled value; `Null` samples carry no kind information.
    #[must_use]
    pub const fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(Self::Bool),
            Value::Date(_) => Some(Self::Date),
            Value::Number(_) => Some(Self::Number),
            Value::Text(_) => Some(Self::Text),
            Value::Null => None,
        }
    }
}

///
/// FieldSchema
///
/// Ordered field list with kind tags. Either declared up front or inferred
/// once from a single sampled row; field order is preserved for projection.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: Vec<(String, FieldKind)>,
}

impl FieldSchema {
    #[must_use]
    pub fn declared<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (String, FieldKind)>,
    {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Infer a schema from one sampled row.
    ///
    /// A `Null` sample falls back to `Text`; there is no second sample to
    /// refine the guess.
    #[must_use]
    pub fn inferred(sample: &Row) -> Self {
        Self {
            fields: sample
                .iter()
                .map(|(name, value)| {
                    (
                        name.clone(),
                        FieldKind::of(value).unwrap_or(FieldKind::Text),
                    )
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }

    #[must_use]
    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, kind)| *kind)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{row, value::Date};

    #[test]
    fn inference_reads_one_sample_row() {
        let sample = row! {
            "id" => 1,
            "name" => "ada",
            "joined" => Date::new(2021, 3, 4),
            "active" => true,
        };
        let schema = FieldSchema::inferred(&sample);

        assert_eq!(schema.kind_of("id"), Some(FieldKind::Number));
        assert_eq!(schema.kind_of("name"), Some(FieldKind::Text));
        assert_eq!(schema.kind_of("joined"), Some(FieldKind::Date));
        assert_eq!(schema.kind_of("active"), Some(FieldKind::Bool));
        assert_eq!(schema.kind_of("missing"), None);
    }

    #[test]
    fn null_sample_falls_back_to_text() {
        let schema = FieldSchema::inferred(&row! { "note" => Value::Null });

        assert_eq!(schema.kind_of("note"), Some(FieldKind::Text));
    }
}
