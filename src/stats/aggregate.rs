//! Yearly, monthly and seasonal aggregation of an observation series.
//!
//! Every aggregate is computed from the raw values and rounded to one decimal
//! place only once it is complete. Empty buckets give zero-valued results.

use crate::stats::percentile::PercentileBand;
use crate::types::field::Field;
use crate::types::observation::{Observation, ObservationSeries};
use crate::types::period::{Month, Period, SeasonOfYear, Year};
use crate::utils::round1;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count, sum, mean, min and max of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Summary {
        let mut count = 0;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        if count == 0 {
            return Summary::default();
        }
        Summary {
            count,
            sum: round1(sum),
            mean: round1(sum / count as f64),
            min: round1(min),
            max: round1(max),
        }
    }

    fn of_field(observations: &[&Observation], field: Field) -> Summary {
        Summary::of(observations.iter().filter_map(|o| field.value(o)))
    }
}

/// Day thresholds used for the threshold-crossing counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayThresholds {
    /// Rainfall above this (mm) makes a wet day.
    pub wet_day_mm: f64,
    /// Rainfall below this (mm) makes a dry day.
    pub dry_day_mm: f64,
    /// Maximum temperature above this (°C) makes a warm day.
    pub warm_day_c: f64,
    /// Minimum temperature below this (°C) makes a frost day.
    pub frost_day_c: f64,
    /// Peak gust above this (km/h) makes a windy day.
    pub windy_day_gust_kmh: f64,
    /// At least this many hours of sunshine make a sunny day.
    pub sunny_day_hours: f64,
}

impl Default for DayThresholds {
    fn default() -> Self {
        Self {
            wet_day_mm: 0.1,
            dry_day_mm: 1.0,
            warm_day_c: 20.0,
            frost_day_c: 0.0,
            windy_day_gust_kmh: 60.0,
            sunny_day_hours: 6.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RainfallStats {
    /// Daily rainfall: `sum` is the period total.
    pub daily: Summary,
    pub wet_days: usize,
    pub dry_days: usize,
    /// Percentiles over wet (> 0 mm) days only.
    pub percentiles: PercentileBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TemperatureStats {
    pub mean: Summary,
    /// Daily maxima: `max` is the highest temperature of the period.
    pub max: Summary,
    /// Daily minima: `min` is the lowest temperature of the period.
    pub min: Summary,
    pub warm_days: usize,
    pub frost_days: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindStats {
    pub speed: Summary,
    pub gusts: Summary,
    pub windy_days: usize,
    /// Circular mean of the daily dominant directions, degrees.
    pub prevailing_direction: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SolarStats {
    /// Daily radiation sums: `sum` is the period total in MJ/m².
    pub radiation: Summary,
    pub sunshine_hours: f64,
    /// Days that reported a sunshine duration.
    pub sunshine_observed: usize,
    pub sunny_days: usize,
}

/// Aggregated metrics for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub period: Period,
    pub days_observed: usize,
    pub rainfall: RainfallStats,
    pub temperature: TemperatureStats,
    pub wind: WindStats,
    pub solar: SolarStats,
}

/// A scalar read off a [`ComparisonRecord`], used for anomalies and trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordMetric {
    /// Total rainfall, mm.
    RainfallTotal,
    /// Number of wet days.
    WetDays,
    /// Mean daily temperature, °C.
    MeanTemperature,
    /// Mean of the daily maxima, °C.
    MeanMaxTemperature,
    /// Mean of the daily minima, °C.
    MeanMinTemperature,
    WarmDays,
    FrostDays,
    /// Mean daily wind speed, km/h.
    MeanWindSpeed,
    /// Highest gust, km/h.
    MaxGust,
    /// Total shortwave radiation, MJ/m².
    RadiationTotal,
    SunshineHours,
}

impl RecordMetric {
    /// The metric's value, or `None` when the record has no observations of the
    /// underlying field (a zero-valued aggregate is not a measurement).
    pub fn value(self, record: &ComparisonRecord) -> Option<f64> {
        let (observed, value) = match self {
            RecordMetric::RainfallTotal => (record.rainfall.daily.count, record.rainfall.daily.sum),
            RecordMetric::WetDays => (
                record.rainfall.daily.count,
                record.rainfall.wet_days as f64,
            ),
            RecordMetric::MeanTemperature => {
                (record.temperature.mean.count, record.temperature.mean.mean)
            }
            RecordMetric::MeanMaxTemperature => {
                (record.temperature.max.count, record.temperature.max.mean)
            }
            RecordMetric::MeanMinTemperature => {
                (record.temperature.min.count, record.temperature.min.mean)
            }
            RecordMetric::WarmDays => (
                record.temperature.max.count,
                record.temperature.warm_days as f64,
            ),
            RecordMetric::FrostDays => (
                record.temperature.min.count,
                record.temperature.frost_days as f64,
            ),
            RecordMetric::MeanWindSpeed => (record.wind.speed.count, record.wind.speed.mean),
            RecordMetric::MaxGust => (record.wind.gusts.count, record.wind.gusts.max),
            RecordMetric::RadiationTotal => {
                (record.solar.radiation.count, record.solar.radiation.sum)
            }
            RecordMetric::SunshineHours => {
                (record.solar.sunshine_observed, record.solar.sunshine_hours)
            }
        };
        (observed > 0).then_some(value)
    }

    /// The field the metric is computed from.
    pub fn field(self) -> Field {
        match self {
            RecordMetric::RainfallTotal | RecordMetric::WetDays => Field::Rainfall,
            RecordMetric::MeanTemperature => Field::TemperatureMean,
            RecordMetric::MeanMaxTemperature | RecordMetric::WarmDays => Field::TemperatureMax,
            RecordMetric::MeanMinTemperature | RecordMetric::FrostDays => Field::TemperatureMin,
            RecordMetric::MeanWindSpeed => Field::WindSpeed,
            RecordMetric::MaxGust => Field::WindGusts,
            RecordMetric::RadiationTotal => Field::SolarRadiation,
            RecordMetric::SunshineHours => Field::Sunshine,
        }
    }

    /// The metric over a bucket of observations, before rounding. Rounding this
    /// gives what [`RecordMetric::value`] reads off the bucket's record.
    fn measure(self, observations: &[&Observation], t: &DayThresholds) -> Option<f64> {
        let field = self.field();
        let values: Vec<f64> = observations.iter().filter_map(|o| field.value(o)).collect();
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        let count_above = |limit: f64| values.iter().filter(|&&v| v > limit).count() as f64;

        Some(match self {
            RecordMetric::RainfallTotal | RecordMetric::RadiationTotal => sum,
            RecordMetric::SunshineHours => sum / 3600.0,
            RecordMetric::MeanTemperature
            | RecordMetric::MeanMaxTemperature
            | RecordMetric::MeanMinTemperature
            | RecordMetric::MeanWindSpeed => sum / values.len() as f64,
            RecordMetric::MaxGust => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            RecordMetric::WetDays => count_above(t.wet_day_mm),
            RecordMetric::WarmDays => count_above(t.warm_day_c),
            RecordMetric::FrostDays => values.iter().filter(|&&c| c < t.frost_day_c).count() as f64,
        })
    }

    pub fn unit(self) -> &'static str {
        match self {
            RecordMetric::RainfallTotal => "mm",
            RecordMetric::MeanTemperature
            | RecordMetric::MeanMaxTemperature
            | RecordMetric::MeanMinTemperature => "°C",
            RecordMetric::MeanWindSpeed | RecordMetric::MaxGust => "km/h",
            RecordMetric::RadiationTotal => "MJ/m²",
            RecordMetric::SunshineHours => "h",
            RecordMetric::WetDays | RecordMetric::WarmDays | RecordMetric::FrostDays => "days",
        }
    }
}

/// Deviation of one period's metric from the mean over all compared periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub period: Period,
    pub value: f64,
    pub baseline: f64,
    pub deviation: f64,
}

/// Mean of a calendar month's aggregates across all years in a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyNormal {
    pub month: u32,
    pub years: usize,
    pub rainfall_total: f64,
    pub mean_temperature: f64,
    pub mean_wind_speed: f64,
    pub radiation_total: f64,
}

/// Buckets observations by period and computes [`ComparisonRecord`]s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesAggregator {
    pub thresholds: DayThresholds,
}

impl SeriesAggregator {
    pub fn new(thresholds: DayThresholds) -> Self {
        Self { thresholds }
    }

    pub fn by_year(&self, series: &ObservationSeries) -> Vec<ComparisonRecord> {
        self.group(series, |o| Period::Year(Year(o.date.year())))
    }

    pub fn by_month(&self, series: &ObservationSeries) -> Vec<ComparisonRecord> {
        self.group(series, |o| Period::Month(Month::of(o.date)))
    }

    pub fn by_season(&self, series: &ObservationSeries) -> Vec<ComparisonRecord> {
        self.group(series, |o| Period::Season(SeasonOfYear::of(o.date)))
    }

    fn group(
        &self,
        series: &ObservationSeries,
        period_of: impl Fn(&Observation) -> Period,
    ) -> Vec<ComparisonRecord> {
        bucket(series, period_of)
            .into_iter()
            .map(|(period, observations)| self.summarize(period, &observations))
            .collect()
    }

    /// Aggregates one bucket. An empty bucket yields an all-zero record.
    pub fn summarize(&self, period: Period, observations: &[&Observation]) -> ComparisonRecord {
        let t = &self.thresholds;
        let count_where = |field: Field, predicate: fn(f64, &DayThresholds) -> bool| {
            count_matching(observations, field, |v| predicate(v, t))
        };

        let sunshine = Summary::of_field(observations, Field::Sunshine);
        let sunshine_seconds: f64 = observations
            .iter()
            .filter_map(|o| Field::Sunshine.value(o))
            .sum();

        ComparisonRecord {
            period,
            days_observed: observations.len(),
            rainfall: RainfallStats {
                daily: Summary::of_field(observations, Field::Rainfall),
                wet_days: count_where(Field::Rainfall, |mm, t| mm > t.wet_day_mm),
                dry_days: count_where(Field::Rainfall, |mm, t| mm < t.dry_day_mm),
                percentiles: PercentileBand::rainfall(observations.iter().copied()),
            },
            temperature: TemperatureStats {
                mean: Summary::of_field(observations, Field::TemperatureMean),
                max: Summary::of_field(observations, Field::TemperatureMax),
                min: Summary::of_field(observations, Field::TemperatureMin),
                warm_days: count_where(Field::TemperatureMax, |c, t| c > t.warm_day_c),
                frost_days: count_where(Field::TemperatureMin, |c, t| c < t.frost_day_c),
            },
            wind: WindStats {
                speed: Summary::of_field(observations, Field::WindSpeed),
                gusts: Summary::of_field(observations, Field::WindGusts),
                windy_days: count_where(Field::WindGusts, |kmh, t| kmh > t.windy_day_gust_kmh),
                prevailing_direction: circular_mean(
                    observations
                        .iter()
                        .filter_map(|o| Field::WindDirection.value(o)),
                ),
            },
            solar: SolarStats {
                radiation: Summary::of_field(observations, Field::SolarRadiation),
                sunshine_hours: round1(sunshine_seconds / 3600.0),
                sunshine_observed: sunshine.count,
                sunny_days: count_where(Field::Sunshine, |s, t| s >= t.sunny_day_hours * 3600.0),
            },
        }
    }

    /// Mean of each calendar month's aggregates across the years present in the series.
    pub fn monthly_climatology(&self, series: &ObservationSeries) -> Vec<MonthlyNormal> {
        let mut by_calendar_month: BTreeMap<u32, BTreeMap<i32, Vec<&Observation>>> =
            BTreeMap::new();
        for observation in series {
            by_calendar_month
                .entry(observation.date.month())
                .or_default()
                .entry(observation.date.year())
                .or_default()
                .push(observation);
        }

        by_calendar_month
            .into_iter()
            .map(|(month, years)| {
                let normal_of = |metric: RecordMetric| {
                    let values: Vec<f64> = years
                        .values()
                        .filter_map(|days| metric.measure(days, &self.thresholds))
                        .collect();
                    mean(&values).map_or(0.0, round1)
                };
                MonthlyNormal {
                    month,
                    years: years.len(),
                    rainfall_total: normal_of(RecordMetric::RainfallTotal),
                    mean_temperature: normal_of(RecordMetric::MeanTemperature),
                    mean_wind_speed: normal_of(RecordMetric::MeanWindSpeed),
                    radiation_total: normal_of(RecordMetric::RadiationTotal),
                }
            })
            .collect()
    }

    /// Deviation of each year's `metric` from its mean across all years that
    /// have it. Years without the metric are skipped.
    pub fn yearly_anomalies(&self, series: &ObservationSeries, metric: RecordMetric) -> Vec<Anomaly> {
        let values: Vec<(Period, f64)> = bucket(series, |o| Year(o.date.year()))
            .into_iter()
            .filter_map(|(year, days)| {
                metric
                    .measure(&days, &self.thresholds)
                    .map(|value| (Period::Year(year), value))
            })
            .collect();
        let raw: Vec<f64> = values.iter().map(|&(_, v)| v).collect();
        let Some(baseline) = mean(&raw) else {
            return Vec::new();
        };
        values
            .into_iter()
            .map(|(period, value)| Anomaly {
                period,
                value: round1(value),
                baseline: round1(baseline),
                deviation: round1(value - baseline),
            })
            .collect()
    }
}

fn bucket<K: Ord>(
    series: &ObservationSeries,
    key_of: impl Fn(&Observation) -> K,
) -> BTreeMap<K, Vec<&Observation>> {
    let mut buckets: BTreeMap<K, Vec<&Observation>> = BTreeMap::new();
    for observation in series {
        buckets.entry(key_of(observation)).or_default().push(observation);
    }
    buckets
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn count_matching(
    observations: &[&Observation],
    field: Field,
    predicate: impl Fn(f64) -> bool,
) -> usize {
    observations
        .iter()
        .filter_map(|o| field.value(o))
        .filter(|v| predicate(*v))
        .count()
}

/// Mean direction of angles in degrees, or `None` if there are none or they cancel out.
fn circular_mean(degrees: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (mut sin, mut cos, mut count) = (0.0, 0.0, 0usize);
    for angle in degrees {
        let radians = angle.to_radians();
        sin += radians.sin();
        cos += radians.cos();
        count += 1;
    }
    if count == 0 || (sin.hypot(cos) / count as f64) < 1e-9 {
        return None;
    }
    let mean = sin.atan2(cos).to_degrees().rem_euclid(360.0);
    Some(round1(mean) % 360.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Three years of synthetic daily data with a deterministic pattern and a few gaps.
    fn synthetic_series() -> ObservationSeries {
        let mut observations = Vec::new();
        let mut day = date(2021, 1, 1);
        let mut i = 0u32;
        while day <= date(2023, 12, 31) {
            if i % 17 != 5 {
                let rain = ((i * 7) % 11) as f64 * 0.37;
                let seasonal = 10.0 - 8.0 * ((day.ordinal() as f64) / 58.0).cos();
                observations.push(
                    Observation::empty(day)
                        .with(Field::Rainfall, rain)
                        .with(Field::TemperatureMean, seasonal)
                        .with(Field::TemperatureMax, seasonal + 5.0)
                        .with(Field::TemperatureMin, seasonal - 5.0)
                        .with(Field::WindSpeed, ((i * 3) % 25) as f64),
                );
            }
            day += TimeDelta::days(1);
            i += 1;
        }
        ObservationSeries::new(observations).unwrap()
    }

    #[test]
    fn test_rainfall_totals_are_conserved_across_groupings() {
        let series = synthetic_series();
        let aggregator = SeriesAggregator::default();
        let raw: f64 = series.values(Field::Rainfall).map(|(_, v)| v).sum();
        let yearly: f64 = aggregator
            .by_year(&series)
            .iter()
            .map(|r| r.rainfall.daily.sum)
            .sum();
        let monthly: f64 = aggregator
            .by_month(&series)
            .iter()
            .map(|r| r.rainfall.daily.sum)
            .sum();
        let seasonal: f64 = aggregator
            .by_season(&series)
            .iter()
            .map(|r| r.rainfall.daily.sum)
            .sum();

        // Each bucket is rounded to 0.05 at most.
        assert!((yearly - raw).abs() <= 3.0 * 0.05 + 1e-9);
        assert!((monthly - raw).abs() <= 36.0 * 0.05 + 1e-9);
        assert!((seasonal - raw).abs() <= 13.0 * 0.05 + 1e-9);
    }

    #[test]
    fn test_grouping_keys() {
        let series = synthetic_series();
        let aggregator = SeriesAggregator::default();

        let years: Vec<_> = aggregator.by_year(&series).iter().map(|r| r.period).collect();
        assert_eq!(
            years,
            vec![
                Period::Year(Year(2021)),
                Period::Year(Year(2022)),
                Period::Year(Year(2023))
            ]
        );
        assert_eq!(aggregator.by_month(&series).len(), 36);

        // Winter 2021 (Jan-Feb 2021) through Winter 2024 (Dec 2023 only).
        let seasons = aggregator.by_season(&series);
        assert_eq!(seasons.len(), 13);
        assert_eq!(seasons.last().unwrap().period.to_string(), "Winter 2024");
        assert_eq!(seasons.last().unwrap().days_observed, 29);
    }

    #[test]
    fn test_threshold_counts_and_rounding() {
        let observations = vec![
            Observation::empty(date(2024, 7, 1))
                .with(Field::Rainfall, 0.1)
                .with(Field::TemperatureMax, 20.0)
                .with(Field::TemperatureMin, 0.0),
            Observation::empty(date(2024, 7, 2))
                .with(Field::Rainfall, 0.15)
                .with(Field::TemperatureMax, 20.04)
                .with(Field::TemperatureMin, -0.04),
            Observation::empty(date(2024, 7, 3))
                .with(Field::Rainfall, 0.14)
                .with(Field::Sunshine, 6.0 * 3600.0)
                .with(Field::WindGusts, 61.0),
        ];
        let refs: Vec<&Observation> = observations.iter().collect();
        let record = SeriesAggregator::default()
            .summarize(Period::Month(Month(2024, 7)), &refs);

        assert_eq!(record.rainfall.wet_days, 2);
        assert_eq!(record.rainfall.dry_days, 3);
        // 0.1 + 0.15 + 0.14 = 0.39, rounded once to 0.4 (per-element rounding would give 0.3).
        assert_eq!(record.rainfall.daily.sum, 0.4);
        assert_eq!(record.temperature.warm_days, 1);
        assert_eq!(record.temperature.frost_days, 1);
        assert_eq!(record.temperature.max.count, 2);
        assert_eq!(record.wind.windy_days, 1);
        assert_eq!(record.solar.sunny_days, 1);
        assert_eq!(record.solar.sunshine_hours, 6.0);
        assert_eq!(record.solar.radiation, Summary::default());
    }

    #[test]
    fn test_empty_bucket_is_zero_valued() {
        let record = SeriesAggregator::default().summarize(Period::Year(Year(2024)), &[]);
        assert_eq!(record.days_observed, 0);
        assert_eq!(record.rainfall, RainfallStats::default());
        assert_eq!(record.temperature.mean.mean, 0.0);
        assert_eq!(record.wind.prevailing_direction, None);
        assert_eq!(RecordMetric::RainfallTotal.value(&record), None);
    }

    #[test]
    fn test_prevailing_direction_wraps_north() {
        assert_eq!(circular_mean([350.0, 10.0]), Some(0.0));
        assert_eq!(circular_mean([80.0, 100.0]), Some(90.0));
        assert_eq!(circular_mean([90.0, 270.0]), None);
        assert_eq!(circular_mean([]), None);
    }

    #[test]
    fn test_anomalies_against_mean() {
        let aggregator = SeriesAggregator::default();
        let observations: Vec<Observation> = (2020..2023)
            .map(|year| {
                Observation::empty(date(year, 6, 1))
                    .with(Field::Rainfall, 10.0 * (year - 2019) as f64)
            })
            .collect();
        let series = ObservationSeries::new(observations).unwrap();
        let yearly = aggregator.yearly_anomalies(&series, RecordMetric::RainfallTotal);
        let deviations: Vec<f64> = yearly.iter().map(|a| a.deviation).collect();
        assert_eq!(deviations, vec![-10.0, 0.0, 10.0]);
        assert!(yearly.iter().all(|a| a.baseline == 20.0));
    }

    #[test]
    fn test_anomaly_baseline_uses_unrounded_totals() {
        // Rounded yearly totals (0.1, 0.1, 0.2) would give a baseline of 0.1.
        let observations: Vec<Observation> = [(2020, 0.14), (2021, 0.14), (2022, 0.24)]
            .into_iter()
            .map(|(year, mm)| Observation::empty(date(year, 6, 1)).with(Field::Rainfall, mm))
            .collect();
        let series = ObservationSeries::new(observations).unwrap();
        let yearly =
            SeriesAggregator::default().yearly_anomalies(&series, RecordMetric::RainfallTotal);

        assert!(yearly.iter().all(|a| a.baseline == 0.2));
        let values: Vec<f64> = yearly.iter().map(|a| a.value).collect();
        assert_eq!(values, vec![0.1, 0.1, 0.2]);
        let deviations: Vec<f64> = yearly.iter().map(|a| a.deviation).collect();
        assert_eq!(deviations, vec![0.0, 0.0, 0.1]);
    }

    #[test]
    fn test_climatology_rounds_once() {
        // January totals of 0.14, 0.14 and 0.24 mm: the rounded monthly sums
        // (0.1, 0.1, 0.2) average to 0.1, the raw ones to 0.17.
        let observations: Vec<Observation> = [(2020, 0.14), (2021, 0.14), (2022, 0.24)]
            .into_iter()
            .flat_map(|(year, mm)| {
                [
                    Observation::empty(date(year, 1, 10))
                        .with(Field::Rainfall, mm)
                        .with(Field::TemperatureMean, 0.04),
                    Observation::empty(date(year, 1, 11)).with(Field::Rainfall, 0.0),
                ]
            })
            .collect();
        let series = ObservationSeries::new(observations).unwrap();
        let normals = SeriesAggregator::default().monthly_climatology(&series);

        assert_eq!(normals.len(), 1);
        assert_eq!(normals[0].years, 3);
        assert_eq!(normals[0].rainfall_total, 0.2);
        assert_eq!(normals[0].mean_temperature, 0.0);
        assert_eq!(normals[0].mean_wind_speed, 0.0);
    }

    #[test]
    fn test_measure_matches_record_values() {
        let series = synthetic_series();
        let aggregator = SeriesAggregator::default();
        let by_year = bucket(&series, |o| Year(o.date.year()));
        let records = aggregator.by_year(&series);
        for (record, days) in records.iter().zip(by_year.values()) {
            for metric in [
                RecordMetric::RainfallTotal,
                RecordMetric::WetDays,
                RecordMetric::MeanTemperature,
                RecordMetric::MeanMaxTemperature,
                RecordMetric::FrostDays,
                RecordMetric::MeanWindSpeed,
                RecordMetric::RadiationTotal,
            ] {
                assert_eq!(
                    metric.measure(days, &aggregator.thresholds).map(round1),
                    metric.value(record),
                    "{:?} in {}",
                    metric,
                    record.period
                );
            }
        }
    }

    #[test]
    fn test_monthly_climatology() {
        let series = synthetic_series();
        let normals = SeriesAggregator::default().monthly_climatology(&series);
        assert_eq!(normals.len(), 12);
        assert!(normals.iter().all(|n| n.years == 3));
        assert_eq!(normals[0].month, 1);
    }
}
