use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{self, Debug, Display},
    str::FromStr,
    sync::OnceLock,
};
use thiserror::Error as ThisError;
use time::{Date as TimeDate, Duration as TimeDuration, Month, format_description::FormatItem};

static FORMAT: OnceLock<Vec<FormatItem<'static>>> = OnceLock::new();

fn iso_format() -> &'static [FormatItem<'static>] {
    FORMAT.get_or_init(|| time::format_description::parse("[year]-[month]-[day]").unwrap())
}

///
/// Date
///
/// Calendar date stored as whole days since the Unix epoch.
/// Out-of-range construction clamps to the epoch rather than failing.
///

#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct Date(i32);

impl Date {
    pub const EPOCH: Self = Self(0);

    const fn epoch_date() -> TimeDate {
        // constant valid date
        match TimeDate::from_calendar_date(1970, Month::January, 1) {
            Ok(d) => d,
            Err(_) => unreachable!(),
        }
    }

    #[must_use]
    pub fn new(y: i32, m: u8, d: u8) -> Self {
        let Ok(month) = Month::try_from(m.clamp(1, 12)) else {
            return Self::EPOCH;
        };

        match TimeDate::from_calendar_date(y, month, d) {
            Ok(date) => Self::from_time(date),
            Err(_) => Self::EPOCH,
        }
    }

    #[must_use]
    pub const fn from_days(days: i32) -> Self {
        Self(days)
    }

    #[must_use]
    pub const fn days(self) -> i32 {
        self.0
    }

    fn from_time(date: TimeDate) -> Self {
        let days = (date - Self::epoch_date()).whole_days();

        i32::try_from(days).map_or(Self::EPOCH, Self)
    }

    fn to_time(self) -> TimeDate {
        Self::epoch_date()
            .checked_add(TimeDuration::days(i64::from(self.0)))
            .unwrap_or_else(Self::epoch_date)
    }
}

#[derive(Debug, ThisError)]
pub enum DateParseError {
    #[error("invalid date literal: {literal}")]
    Invalid { literal: String },
}

impl FromStr for Date {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeDate::parse(s, iso_format())
            .map(Self::from_time)
            .map_err(|_| DateParseError::Invalid {
                literal: s.to_string(),
            })
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_time().format(iso_format()) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Serialize for Date {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        s.parse().map_err(serde::de::Error::custom)
    }
}
