//! Defines the kinds of data the cache distinguishes and their default lifetimes.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of payload stored in the [`crate::TemporalCache`].
///
/// The kind decides how long a cached payload stays valid: historical data never
/// changes once published, while "now" conditions go stale within the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// Multi-year daily series ending before the current year.
    Historical,
    /// Daily series reaching into the current year (year to date).
    CurrentYear,
    /// Current conditions.
    Current,
    /// Weather warnings side feed.
    Warnings,
    /// News side feed.
    News,
}

impl DataKind {
    pub const ALL: [DataKind; 5] = [
        DataKind::Historical,
        DataKind::CurrentYear,
        DataKind::Current,
        DataKind::Warnings,
        DataKind::News,
    ];

    pub(crate) fn key_segment(&self) -> &'static str {
        match self {
            DataKind::Historical => "historical",
            DataKind::CurrentYear => "current_year",
            DataKind::Current => "current",
            DataKind::Warnings => "warnings",
            DataKind::News => "news",
        }
    }

    pub(crate) fn from_key_segment(segment: &str) -> Option<DataKind> {
        DataKind::ALL
            .into_iter()
            .find(|kind| kind.key_segment() == segment)
    }

    /// Time-to-live applied when a caller does not pass one explicitly.
    pub fn default_ttl(&self) -> TimeDelta {
        match self {
            DataKind::Historical => TimeDelta::hours(24),
            DataKind::CurrentYear => TimeDelta::hours(6),
            DataKind::Current => TimeDelta::hours(1),
            DataKind::Warnings => TimeDelta::minutes(10),
            DataKind::News => TimeDelta::minutes(30),
        }
    }
}

/// Formats a `DataKind` using its key segment.
///
/// # Examples
///
/// ```
/// use meteo_insights::DataKind;
///
/// assert_eq!(DataKind::CurrentYear.to_string(), "current_year");
/// ```
impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_segment())
    }
}
