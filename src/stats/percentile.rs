//! Nearest-rank percentiles.

use crate::types::field::Field;
use crate::types::observation::Observation;
use crate::utils::round1;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// The value at rank `ceil(p / 100 * n)` of an ascending slice.
///
/// Ranks are clamped to `1..=n`, so `p = 0` gives the minimum and `p = 100` the
/// maximum. An empty slice yields `0.0`.
///
/// # Examples
///
/// ```
/// use meteo_insights::percentile;
///
/// let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
/// assert_eq!(percentile(&sorted, 50.0), 5.0);
/// assert_eq!(percentile(&sorted, 90.0), 9.0);
/// assert_eq!(percentile(&sorted, 95.0), 10.0);
/// assert_eq!(percentile(&[], 50.0), 0.0);
/// ```
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let rank = (p.clamp(0.0, 100.0) * n as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}

/// Sorts `values` ascending. NaNs sort last.
pub fn sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<OrderedFloat<f64>> = values.into_iter().map(OrderedFloat).collect();
    values.sort_unstable();
    values.into_iter().map(|v| v.0).collect()
}

/// Commonly reported percentiles of a set of values, rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PercentileBand {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl PercentileBand {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let sorted = sorted(values);
        Self {
            p10: round1(percentile(&sorted, 10.0)),
            p25: round1(percentile(&sorted, 25.0)),
            p50: round1(percentile(&sorted, 50.0)),
            p75: round1(percentile(&sorted, 75.0)),
            p90: round1(percentile(&sorted, 90.0)),
        }
    }

    /// Percentiles of daily rainfall on days it rained. Dry (0 mm) days are
    /// excluded, so the band describes how heavy rain is when it falls.
    pub fn rainfall<'a>(observations: impl IntoIterator<Item = &'a Observation>) -> Self {
        Self::from_values(
            observations
                .into_iter()
                .filter_map(|o| Field::Rainfall.value(o))
                .filter(|mm| *mm > 0.0),
        )
    }

    /// Percentiles of any field's present values.
    pub fn of_field<'a>(
        observations: impl IntoIterator<Item = &'a Observation>,
        field: Field,
    ) -> Self {
        Self::from_values(observations.into_iter().filter_map(|o| field.value(o)))
    }
}
