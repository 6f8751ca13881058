//! Daily observations and the ordered series they form.

use crate::types::field::Field;
use crate::types::period::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One calendar day of weather at one location. Every measurement is optional;
/// a `None` means "not observed", never zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub date: NaiveDate,
    pub rainfall: Option<f64>,            // mm
    pub temperature_mean: Option<f64>,    // °C
    pub temperature_min: Option<f64>,     // °C
    pub temperature_max: Option<f64>,     // °C
    pub wind_speed: Option<f64>,          // km/h
    pub wind_gusts: Option<f64>,          // km/h
    pub wind_direction: Option<f64>,      // degrees
    pub solar_radiation_sum: Option<f64>, // MJ/m²/day
    pub sunshine_duration: Option<f64>,   // seconds
}

impl Observation {
    /// An observation for `date` with no measurements.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }

    pub fn with(mut self, field: Field, value: f64) -> Self {
        *field.slot(&mut self) = Some(value);
        self
    }

    fn validate(&self) -> Result<(), SeriesError> {
        for field in Field::ALL {
            let Some(value) = field.value(self) else {
                continue;
            };
            let in_range = value.is_finite()
                && (!field.non_negative() || value >= 0.0)
                && (field != Field::WindDirection || value < 360.0);
            if !in_range {
                return Err(SeriesError::OutOfRange {
                    date: self.date,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("Observation dates must be strictly increasing, but {next} follows {previous}")]
    NotIncreasing { previous: NaiveDate, next: NaiveDate },

    #[error("Duplicate observation for {0}")]
    Duplicate(NaiveDate),

    #[error("Value {value} for {field} on {date} is out of range")]
    OutOfRange {
        date: NaiveDate,
        field: Field,
        value: f64,
    },
}

/// Daily observations for one location, strictly ascending by date with no
/// duplicates. Missing days are simply absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct ObservationSeries {
    observations: Vec<Observation>,
}

impl ObservationSeries {
    /// Builds a series from observations that are already in date order.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::NotIncreasing`] or [`SeriesError::Duplicate`] if the
    /// ordering invariant is violated and [`SeriesError::OutOfRange`] for values
    /// that cannot be physical (negative rainfall, non-finite numbers, ...).
    pub fn new(observations: Vec<Observation>) -> Result<Self, SeriesError> {
        for pair in observations.windows(2) {
            let (previous, next) = (pair[0].date, pair[1].date);
            if previous == next {
                return Err(SeriesError::Duplicate(next));
            }
            if previous > next {
                return Err(SeriesError::NotIncreasing { previous, next });
            }
        }
        for observation in &observations {
            observation.validate()?;
        }
        Ok(Self { observations })
    }

    /// Sorts the observations by date before validating them.
    pub fn from_unsorted(mut observations: Vec<Observation>) -> Result<Self, SeriesError> {
        observations.sort_by_key(|o| o.date);
        Self::new(observations)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// First and last observed date.
    pub fn range(&self) -> Option<DateRange> {
        let first = self.observations.first()?;
        let last = self.observations.last()?;
        Some(DateRange::new(first.date, last.date))
    }

    /// Observations whose date lies inside `range` (inclusive).
    pub fn slice(&self, range: DateRange) -> ObservationSeries {
        let start = self.observations.partition_point(|o| o.date < range.start);
        let end = self.observations.partition_point(|o| o.date <= range.end);
        ObservationSeries {
            observations: self.observations[start..end.max(start)].to_vec(),
        }
    }

    /// The present values of `field`, in date order.
    pub fn values(&self, field: Field) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.observations
            .iter()
            .filter_map(move |o| field.value(o).map(|v| (o.date, v)))
    }

    /// Combines two series for the same location. Dates from both are kept and,
    /// where both have an observation for a day, fields missing in `self` are
    /// taken from `other`.
    pub fn merge(&self, other: &ObservationSeries) -> ObservationSeries {
        let mut by_date: BTreeMap<NaiveDate, Observation> = self
            .observations
            .iter()
            .map(|o| (o.date, o.clone()))
            .collect();
        for incoming in &other.observations {
            let entry = by_date
                .entry(incoming.date)
                .or_insert_with(|| Observation::empty(incoming.date));
            for field in Field::ALL {
                let slot = field.slot(entry);
                if slot.is_none() {
                    *slot = field.value(incoming);
                }
            }
        }
        ObservationSeries {
            observations: by_date.into_values().collect(),
        }
    }
}

impl TryFrom<Vec<Observation>> for ObservationSeries {
    type Error = SeriesError;

    fn try_from(observations: Vec<Observation>) -> Result<Self, Self::Error> {
        Self::new(observations)
    }
}

impl From<ObservationSeries> for Vec<Observation> {
    fn from(series: ObservationSeries) -> Self {
        series.observations
    }
}

impl<'a> IntoIterator for &'a ObservationSeries {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rejects_duplicates_and_disorder() {
        let dup = vec![
            Observation::empty(date(2024, 1, 1)),
            Observation::empty(date(2024, 1, 1)),
        ];
        assert_eq!(
            ObservationSeries::new(dup),
            Err(SeriesError::Duplicate(date(2024, 1, 1)))
        );

        let backwards = vec![
            Observation::empty(date(2024, 1, 2)),
            Observation::empty(date(2024, 1, 1)),
        ];
        assert!(matches!(
            ObservationSeries::new(backwards.clone()),
            Err(SeriesError::NotIncreasing { .. })
        ));
        assert_eq!(ObservationSeries::from_unsorted(backwards).unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_negative_rainfall_but_not_negative_temperature() {
        let bad = vec![Observation::empty(date(2024, 1, 1)).with(Field::Rainfall, -0.5)];
        assert!(matches!(
            ObservationSeries::new(bad),
            Err(SeriesError::OutOfRange {
                field: Field::Rainfall,
                ..
            })
        ));

        let cold = vec![Observation::empty(date(2024, 1, 1)).with(Field::TemperatureMin, -12.0)];
        assert!(ObservationSeries::new(cold).is_ok());
    }

    #[test]
    fn test_slice_is_inclusive_and_keeps_gaps() {
        let series = ObservationSeries::new(vec![
            Observation::empty(date(2024, 1, 1)),
            Observation::empty(date(2024, 1, 3)),
            Observation::empty(date(2024, 1, 4)),
            Observation::empty(date(2024, 1, 9)),
        ])
        .unwrap();
        let sliced = series.slice(DateRange::new(date(2024, 1, 2), date(2024, 1, 4)));
        let dates: Vec<_> = sliced.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 3), date(2024, 1, 4)]);

        assert!(series
            .slice(DateRange::new(date(2025, 1, 1), date(2025, 2, 1)))
            .is_empty());
    }

    #[test]
    fn test_merge_fills_missing_fields() {
        let rain = ObservationSeries::new(vec![
            Observation::empty(date(2024, 1, 1)).with(Field::Rainfall, 2.0),
            Observation::empty(date(2024, 1, 2)).with(Field::Rainfall, 0.0),
        ])
        .unwrap();
        let temp = ObservationSeries::new(vec![
            Observation::empty(date(2024, 1, 2)).with(Field::TemperatureMax, 8.5),
            Observation::empty(date(2024, 1, 3)).with(Field::TemperatureMax, 9.0),
        ])
        .unwrap();

        let merged = rain.merge(&temp);
        assert_eq!(merged.len(), 3);
        let jan2 = &merged.observations()[1];
        assert_eq!(jan2.rainfall, Some(0.0));
        assert_eq!(jan2.temperature_max, Some(8.5));
    }

    #[test]
    fn test_serde_enforces_invariant() {
        let json = r#"[{"date":"2024-01-02"},{"date":"2024-01-01"}]"#;
        assert!(serde_json::from_str::<ObservationSeries>(json).is_err());

        let json = r#"[{"date":"2024-01-01","rainfall":1.5}]"#;
        let series: ObservationSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.observations()[0].rainfall, Some(1.5));
    }
}
