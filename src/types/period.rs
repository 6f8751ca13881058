use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Year(pub i32);
impl Year {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Display for Year {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// A calendar month of a specific year: `Month(year, month)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Month(pub i32, pub u32);
impl Month {
    pub fn year(self) -> i32 {
        self.0
    }
    pub fn month(self) -> u32 {
        self.1
    }
    pub fn new(month: u32, year: i32) -> Self {
        Self(year, month)
    }
    pub fn of(date: NaiveDate) -> Self {
        Self(date.year(), date.month())
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

/// Meteorological seasons. Declaration order is the order within a season-year,
/// which starts with winter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Season {
    /// December to February.
    Winter,
    /// March to May.
    Spring,
    /// June to August.
    Summer,
    /// September to November.
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [
        Season::Winter,
        Season::Spring,
        Season::Summer,
        Season::Autumn,
    ];

    pub fn from_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A season within a specific season-year. December is counted towards the
/// winter of the following year, so `Winter 2024` spans Dec 2023 to Feb 2024.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct SeasonOfYear {
    pub year: i32,
    pub season: Season,
}

impl SeasonOfYear {
    pub fn of(date: NaiveDate) -> Self {
        let season = Season::from_month(date.month());
        let year = if date.month() == 12 {
            date.year() + 1
        } else {
            date.year()
        };
        Self { year, season }
    }
}

impl Display for SeasonOfYear {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:04}", self.season, self.year)
    }
}

/// The period a [`crate::ComparisonRecord`] summarises.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Period {
    Year(Year),
    Month(Month),
    Season(SeasonOfYear),
}

impl Period {
    /// The calendar (or season) year this period belongs to.
    pub fn year(self) -> i32 {
        match self {
            Period::Year(y) => y.get(),
            Period::Month(m) => m.year(),
            Period::Season(s) => s.year,
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(y) => y.fmt(f),
            Period::Month(m) => m.fmt(f),
            Period::Season(s) => s.fmt(f),
        }
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// True if this range fully covers `other`.
    pub fn covers(&self, other: &DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_season_mapping() {
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(5), Season::Spring);
        assert_eq!(Season::from_month(6), Season::Summer);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(9), Season::Autumn);
        assert_eq!(Season::from_month(11), Season::Autumn);
        assert_eq!(Season::from_month(12), Season::Winter);
    }

    #[test]
    fn test_december_belongs_to_next_winter() {
        let dec = SeasonOfYear::of(date(2023, 12, 15));
        let jan = SeasonOfYear::of(date(2024, 1, 15));
        assert_eq!(dec, jan);
        assert_eq!(dec.to_string(), "Winter 2024");
    }

    #[test]
    fn test_range_covers() {
        let stored = DateRange::new(date(2015, 1, 1), date(2024, 12, 31));
        assert!(stored.covers(&DateRange::new(date(2016, 1, 1), date(2020, 6, 30))));
        assert!(stored.covers(&stored));
        assert!(!stored.covers(&DateRange::new(date(2014, 12, 31), date(2020, 1, 1))));
        assert!(!stored.covers(&DateRange::new(date(2020, 1, 1), date(2025, 1, 1))));
    }
}
