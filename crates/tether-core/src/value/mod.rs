mod date;
mod number;


use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

// re-exports
pub use date::{Date, DateParseError};
pub use number::{Number, NumberError};

///
/// Value
///
/// Scalar cell value for rows and filter clauses.
///
/// Null → the field's value is absent (i.e. SQL NULL).
///
/// Serde representation is untagged so JSON fixtures read naturally:
/// bools, numbers, ISO `YYYY-MM-DD` strings, other strings, and null map to
/// the matching variant in that order.
///

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(Number),
    Date(Date),
    Text(String),
    Null,
}

impl Value {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Build a `Value` from a raw f64; non-finite payloads degrade to `Null`.
    #[must_use]
    pub fn number(v: f64) -> Self {
        Number::try_new(v).map_or(Self::Null, Self::Number)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used by aggregate computation.
    ///
    /// Coerces numeric text; every other kind is non-numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.get()),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Kind tag used for cross-kind ordering; mirrors variant order.
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Date(_) => 3,
            Self::Text(_) => 4,
        }
    }

    /// Compare two values of the same kind.
    ///
    /// Returns `None` on kind mismatch or when either side is `Null`;
    /// ordering comparisons against mismatched kinds never match.
    #[must_use]
    pub fn compare_same_kind(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Number(a), Self::Number(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_same_kind(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

// ------------------------------------------------------------------
// Conversions
// ------------------------------------------------------------------

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Number> for Value {
    fn from(v: Number) -> Self {
        Self::Number(v)
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Self::Date(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::number(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
