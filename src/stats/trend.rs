//! Ordinary least squares trends over (year, metric) pairs.

use crate::stats::aggregate::{ComparisonRecord, RecordMetric};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// `None` when either variable has zero variance.
    pub r_squared: Option<f64>,
}

/// Fits `y = slope * x + intercept`.
///
/// Returns `None` for fewer than two points or when every `x` is the same.
pub fn fit_line(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    let (mut scale_x, mut scale_y) = (0.0, 0.0);
    for &(x, y) in points {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
        scale_x += x * x;
        scale_y += y * y;
    }

    // A constant column leaves only cancellation noise, relative to its magnitude.
    if sxx <= f64::EPSILON * scale_x {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r_squared = (syy > f64::EPSILON * scale_y)
        .then(|| ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0));

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl Display for TrendDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Increasing => "Increasing",
            TrendDirection::Decreasing => "Decreasing",
            TrendDirection::Stable => "Stable",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub metric: RecordMetric,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: Option<f64>,
    pub direction: TrendDirection,
    pub samples: usize,
}

impl Trend {
    /// Unit of the slope, e.g. `mm/year`.
    pub fn slope_unit(&self) -> String {
        format!("{}/year", self.metric.unit())
    }
}

/// Fits and labels trends.
///
/// A slope within `±band` is [`TrendDirection::Stable`]. The band is in the
/// metric's unit per year: the default of 0.05 means 0.05 mm/year for rainfall
/// totals, 0.05 °C/year for temperatures, 0.05 km/h/year for wind and 0.05
/// days/year for day counts. Override it per metric with [`TrendEstimator::with_band`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEstimator {
    pub min_samples: usize,
    pub stable_band: f64,
    #[serde(default)]
    pub bands: HashMap<RecordMetric, f64>,
}

impl Default for TrendEstimator {
    fn default() -> Self {
        Self {
            min_samples: 3,
            stable_band: 0.05,
            bands: HashMap::new(),
        }
    }
}

impl TrendEstimator {
    pub fn with_band(mut self, metric: RecordMetric, band: f64) -> Self {
        self.bands.insert(metric, band.abs());
        self
    }

    pub fn band(&self, metric: RecordMetric) -> f64 {
        self.bands.get(&metric).copied().unwrap_or(self.stable_band)
    }

    pub fn classify(&self, metric: RecordMetric, slope: f64) -> TrendDirection {
        let band = self.band(metric);
        if slope > band {
            TrendDirection::Increasing
        } else if slope < -band {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    /// The labelled trend of `points`, or `None` below `min_samples` points or
    /// when no line can be fitted.
    pub fn estimate(&self, metric: RecordMetric, points: &[(f64, f64)]) -> Option<Trend> {
        if points.len() < self.min_samples.max(2) {
            return None;
        }
        let fit = fit_line(points)?;
        Some(Trend {
            metric,
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            direction: self.classify(metric, fit.slope),
            samples: points.len(),
        })
    }

    /// Trend of `metric` across yearly records. Records lacking the metric are skipped.
    pub fn for_records(&self, records: &[ComparisonRecord], metric: RecordMetric) -> Option<Trend> {
        self.estimate(metric, &yearly_points(records, metric))
    }
}

/// `(year, value)` pairs of `metric` for records that have it.
pub fn yearly_points(records: &[ComparisonRecord], metric: RecordMetric) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter_map(|r| metric.value(r).map(|v| (r.period.year() as f64, v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_rising_rainfall_totals() {
        let totals = [800.0, 820.0, 840.0, 860.0, 880.0, 900.0, 920.0, 940.0, 960.0, 980.0];
        let points: Vec<(f64, f64)> = (2015..=2024)
            .zip(totals)
            .map(|(year, total)| (year as f64, total))
            .collect();
        let trend = TrendEstimator::default()
            .estimate(RecordMetric::RainfallTotal, &points)
            .unwrap();
        assert!(close(trend.slope, 20.0), "slope {}", trend.slope);
        assert!(close(trend.r_squared.unwrap(), 1.0));
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.direction.to_string(), "Increasing");
        assert_eq!(trend.slope_unit(), "mm/year");
        assert!((trend.intercept + trend.slope * 2015.0 - 800.0).abs() < 1e-4);
    }

    #[test]
    fn test_flat_series_is_stable() {
        let points = [(2020.0, 12.0), (2021.0, 12.0), (2022.0, 12.0)];
        let trend = TrendEstimator::default()
            .estimate(RecordMetric::MeanTemperature, &points)
            .unwrap();
        assert!(close(trend.slope, 0.0));
        assert_eq!(trend.r_squared, None);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_flat_fractional_series_has_no_r_squared() {
        for value in [0.7, 9.9, 12.3, 820.1] {
            let points: Vec<(f64, f64)> = (2015..=2024).map(|y| (y as f64, value)).collect();
            let fit = fit_line(&points).unwrap();
            assert_eq!(fit.r_squared, None, "value {}", value);
            assert!(fit.slope.abs() < 1e-9);

            let trend = TrendEstimator::default()
                .estimate(RecordMetric::MeanTemperature, &points)
                .unwrap();
            assert_eq!(trend.direction, TrendDirection::Stable);
        }
    }

    #[test]
    fn test_r_squared_stays_within_unit_interval() {
        let points: Vec<(f64, f64)> = (2015..=2024)
            .map(|y| (y as f64, 0.7 * (y - 2000) as f64))
            .collect();
        let r_squared = fit_line(&points).unwrap().r_squared.unwrap();
        assert!((0.0..=1.0).contains(&r_squared), "r2 {}", r_squared);
        assert!(close(r_squared, 1.0));
    }

    #[test]
    fn test_falling_series() {
        let points = [(2020.0, 30.0), (2021.0, 28.0), (2022.0, 27.0), (2023.0, 25.0)];
        let trend = TrendEstimator::default()
            .estimate(RecordMetric::FrostDays, &points)
            .unwrap();
        assert!(trend.slope < 0.0);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
        assert!(trend.r_squared.unwrap() > 0.9);
    }

    #[test]
    fn test_too_few_points() {
        let estimator = TrendEstimator::default();
        assert_eq!(estimator.estimate(RecordMetric::RainfallTotal, &[]), None);
        let two = [(2020.0, 1.0), (2021.0, 2.0)];
        assert_eq!(estimator.estimate(RecordMetric::RainfallTotal, &two), None);
        assert!(fit_line(&two).is_some());
        assert!(fit_line(&[(2020.0, 1.0)]).is_none());
    }

    #[test]
    fn test_constant_x_cannot_be_fitted() {
        let points = [(2020.0, 1.0), (2020.0, 2.0), (2020.0, 3.0)];
        assert_eq!(fit_line(&points), None);
    }

    #[test]
    fn test_band_override() {
        let estimator = TrendEstimator::default().with_band(RecordMetric::RainfallTotal, 5.0);
        assert_eq!(
            estimator.classify(RecordMetric::RainfallTotal, 3.0),
            TrendDirection::Stable
        );
        assert_eq!(
            estimator.classify(RecordMetric::MeanTemperature, 3.0),
            TrendDirection::Increasing
        );
    }
}
