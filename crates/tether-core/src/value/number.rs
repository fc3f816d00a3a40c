use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};
use thiserror::Error as ThisError;

///
/// Number
///
/// Finite f64 only; -0.0 canonically stored as 0.0
///

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Display, Serialize)]
pub struct Number(f64);

impl Number {
    /// Fallible constructor that rejects non-finite values and normalizes -0.0.
    #[must_use]
    pub fn try_new(v: f64) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }

        // canonicalize -0.0 to 0.0 so Eq/Hash/Ord are consistent
        Some(Self(if v == 0.0 { 0.0 } else { v }))
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

#[derive(Debug, ThisError)]
pub enum NumberError {
    #[error("non-finite number payload")]
    NonFinite,
}

impl Eq for Number {}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        // finite by construction, so total_cmp matches numeric order
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl TryFrom<f64> for Number {
    type Error = NumberError;

    fn try_from(v: f64) -> Result<Self, Self::Error> {
        Self::try_new(v).ok_or(NumberError::NonFinite)
    }
}

impl From<i64> for Number {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self(v as f64)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Self(f64::from(v))
    }
}

impl From<u32> for Number {
    fn from(v: u32) -> Self {
        Self(f64::from(v))
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = f64::deserialize(deserializer)?;

        Self::try_new(v).ok_or_else(|| serde::de::Error::custom("non-finite number payload"))
    }
}
