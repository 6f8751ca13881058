//! Streak-based extreme event detection.

use crate::types::field::Field;
use crate::types::observation::{Observation, ObservationSeries};
use crate::utils::round1;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Anything positioned on the calendar.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for Observation {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Folds the items of a run into a summary. Reset between runs.
pub trait RunAccumulator<T> {
    type Summary;
    fn push(&mut self, item: &T);
    fn finish(&mut self) -> Self::Summary;
}

/// A run of consecutive calendar days that all satisfied a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Streak<S> {
    pub start: NaiveDate,
    /// Date of the last satisfying day.
    pub end: NaiveDate,
    pub length: usize,
    pub summary: S,
}

struct OpenRun {
    start: NaiveDate,
    last: NaiveDate,
    length: usize,
}

/// Finds every maximal run of consecutive days satisfying `predicate` that is
/// at least `min_length` long, in one pass over `items`.
///
/// `items` must be in ascending date order. A missing day ends the run, as does
/// an item failing the predicate.
pub fn find_streaks<T, A>(
    items: &[T],
    min_length: usize,
    predicate: impl Fn(&T) -> bool,
    mut accumulator: A,
) -> Vec<Streak<A::Summary>>
where
    T: Dated,
    A: RunAccumulator<T>,
{
    let mut streaks = Vec::new();
    let mut open: Option<OpenRun> = None;

    for item in items {
        let date = item.date();
        let continues = open
            .as_ref()
            .is_some_and(|run| run.last.succ_opt() == Some(date));
        if !continues {
            close_run(&mut open, min_length, &mut accumulator, &mut streaks);
        }

        if predicate(item) {
            match open.as_mut() {
                Some(run) => {
                    run.last = date;
                    run.length += 1;
                }
                None => {
                    open = Some(OpenRun {
                        start: date,
                        last: date,
                        length: 1,
                    })
                }
            }
            accumulator.push(item);
        } else {
            close_run(&mut open, min_length, &mut accumulator, &mut streaks);
        }
    }
    close_run(&mut open, min_length, &mut accumulator, &mut streaks);

    streaks
}

fn close_run<T, A: RunAccumulator<T>>(
    open: &mut Option<OpenRun>,
    min_length: usize,
    accumulator: &mut A,
    streaks: &mut Vec<Streak<A::Summary>>,
) {
    let Some(run) = open.take() else {
        return;
    };
    // Always finish so the accumulator starts the next run empty.
    let summary = accumulator.finish();
    if run.length >= min_length {
        streaks.push(Streak {
            start: run.start,
            end: run.last,
            length: run.length,
            summary,
        });
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    Max,
    Min,
    Mean,
}

/// One value captured over the days of an event.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub field: Field,
    pub statistic: Statistic,
    pub value: f64,
}

#[derive(Debug, Clone, Copy)]
struct Running {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl Running {
    const EMPTY: Running = Running {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
        sum: 0.0,
        count: 0,
    };

    fn value(&self, statistic: Statistic) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(match statistic {
            Statistic::Max => self.max,
            Statistic::Min => self.min,
            Statistic::Mean => self.sum / self.count as f64,
        })
    }
}

/// Running max/min/mean of selected fields over a run.
#[derive(Debug, Clone)]
pub struct ExtremeTracker {
    tracked: Vec<(Field, Statistic)>,
    running: Vec<Running>,
}

impl ExtremeTracker {
    pub fn new(tracked: &[(Field, Statistic)]) -> Self {
        Self {
            tracked: tracked.to_vec(),
            running: vec![Running::EMPTY; tracked.len()],
        }
    }
}

impl RunAccumulator<Observation> for ExtremeTracker {
    type Summary = Vec<Extreme>;

    fn push(&mut self, item: &Observation) {
        for ((field, _), running) in self.tracked.iter().zip(self.running.iter_mut()) {
            if let Some(value) = field.value(item) {
                running.min = running.min.min(value);
                running.max = running.max.max(value);
                running.sum += value;
                running.count += 1;
            }
        }
    }

    fn finish(&mut self) -> Vec<Extreme> {
        let extremes = self
            .tracked
            .iter()
            .zip(&self.running)
            .filter_map(|(&(field, statistic), running)| {
                running.value(statistic).map(|value| Extreme {
                    field,
                    statistic,
                    value: round1(value),
                })
            })
            .collect();
        self.running.fill(Running::EMPTY);
        extremes
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Drought,
    HeatWave,
    ColdSnap,
    StrongWind,
    CalmPeriod,
    SolarPeak,
    LowSolar,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Drought,
        EventKind::HeatWave,
        EventKind::ColdSnap,
        EventKind::StrongWind,
        EventKind::CalmPeriod,
        EventKind::SolarPeak,
        EventKind::LowSolar,
    ];

    pub fn rule(self) -> EventRule {
        use Statistic::*;
        let (field, threshold, min_length, tracked): (_, _, _, &[(Field, Statistic)]) = match self
        {
            EventKind::Drought => (
                Field::Rainfall,
                Threshold::Below(1.0),
                7,
                &[(Field::Rainfall, Max), (Field::Rainfall, Mean)],
            ),
            EventKind::HeatWave => (
                Field::TemperatureMax,
                Threshold::Above(25.0),
                3,
                &[(Field::TemperatureMax, Max)],
            ),
            EventKind::ColdSnap => (
                Field::TemperatureMin,
                Threshold::Below(-2.0),
                3,
                &[(Field::TemperatureMin, Min)],
            ),
            EventKind::StrongWind => (
                Field::WindGusts,
                Threshold::Above(60.0),
                3,
                &[(Field::WindGusts, Max), (Field::WindSpeed, Max)],
            ),
            EventKind::CalmPeriod => (
                Field::WindSpeed,
                Threshold::Below(10.0),
                5,
                &[(Field::WindSpeed, Mean)],
            ),
            EventKind::SolarPeak => (
                Field::SolarRadiation,
                Threshold::Above(18.0),
                3,
                &[(Field::SolarRadiation, Max)],
            ),
            EventKind::LowSolar => (
                Field::SolarRadiation,
                Threshold::Below(7.0),
                5,
                &[(Field::SolarRadiation, Min)],
            ),
        };
        EventRule {
            kind: self,
            field,
            threshold,
            min_length,
            tracked: tracked.to_vec(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Drought => "drought",
            EventKind::HeatWave => "heat wave",
            EventKind::ColdSnap => "cold snap",
            EventKind::StrongWind => "strong wind",
            EventKind::CalmPeriod => "calm period",
            EventKind::SolarPeak => "solar peak",
            EventKind::LowSolar => "low solar period",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strict comparison against a fixed value.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Threshold {
    Above(f64),
    Below(f64),
}

impl Threshold {
    pub fn holds(self, value: f64) -> bool {
        match self {
            Threshold::Above(limit) => value > limit,
            Threshold::Below(limit) => value < limit,
        }
    }
}

/// What makes a day part of an event, and what to capture over the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRule {
    pub kind: EventKind,
    pub field: Field,
    pub threshold: Threshold,
    pub min_length: usize,
    pub tracked: Vec<(Field, Statistic)>,
}

impl EventRule {
    /// A day without a value for the rule's field never qualifies.
    pub fn matches(&self, observation: &Observation) -> bool {
        self.field
            .value(observation)
            .is_some_and(|value| self.threshold.holds(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeEvent {
    pub kind: EventKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: usize,
    pub extremes: Vec<Extreme>,
}

impl ExtremeEvent {
    pub fn extreme(&self, field: Field, statistic: Statistic) -> Option<f64> {
        self.extremes
            .iter()
            .find(|e| e.field == field && e.statistic == statistic)
            .map(|e| e.value)
    }
}

/// Count and length statistics of one kind of event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub kind: EventKind,
    pub count: usize,
    pub longest: usize,
    pub total_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetector {
    pub rules: Vec<EventRule>,
}

impl Default for EventDetector {
    fn default() -> Self {
        Self {
            rules: EventKind::ALL.iter().map(|kind| kind.rule()).collect(),
        }
    }
}

impl EventDetector {
    pub fn new(rules: Vec<EventRule>) -> Self {
        Self { rules }
    }

    /// All events of every configured kind, ordered by start date.
    pub fn detect(&self, series: &ObservationSeries) -> Vec<ExtremeEvent> {
        let mut events: Vec<ExtremeEvent> = self
            .rules
            .iter()
            .flat_map(|rule| Self::detect_rule(rule, series))
            .collect();
        events.sort_by_key(|e| (e.start, e.kind));
        events
    }

    pub fn detect_kind(&self, series: &ObservationSeries, kind: EventKind) -> Vec<ExtremeEvent> {
        self.rules
            .iter()
            .filter(|rule| rule.kind == kind)
            .flat_map(|rule| Self::detect_rule(rule, series))
            .collect()
    }

    pub fn detect_rule(rule: &EventRule, series: &ObservationSeries) -> Vec<ExtremeEvent> {
        find_streaks(
            series.observations(),
            rule.min_length,
            |o| rule.matches(o),
            ExtremeTracker::new(&rule.tracked),
        )
        .into_iter()
        .map(|streak| ExtremeEvent {
            kind: rule.kind,
            start: streak.start,
            end: streak.end,
            duration: streak.length,
            extremes: streak.summary,
        })
        .collect()
    }
}

/// One summary per kind in [`EventKind::ALL`], including kinds with no events.
pub fn summarize_events(events: &[ExtremeEvent]) -> Vec<EventSummary> {
    EventKind::ALL
        .iter()
        .map(|&kind| {
            let durations = events.iter().filter(|e| e.kind == kind).map(|e| e.duration);
            EventSummary {
                kind,
                count: durations.clone().count(),
                longest: durations.clone().max().unwrap_or(0),
                total_days: durations.sum(),
            }
        })
        .collect()
}

/// Events grouped by the year they started in.
pub fn events_by_year(events: &[ExtremeEvent]) -> BTreeMap<i32, Vec<ExtremeEvent>> {
    let mut by_year: BTreeMap<i32, Vec<ExtremeEvent>> = BTreeMap::new();
    for event in events {
        by_year
            .entry(event.start.year())
            .or_default()
            .push(event.clone());
    }
    by_year
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() + TimeDelta::days(n)
    }

    fn series_of(field: Field, values: &[f64]) -> ObservationSeries {
        ObservationSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Observation::empty(day(i as i64)).with(field, *v))
                .collect(),
        )
        .unwrap()
    }

    fn detect(kind: EventKind, series: &ObservationSeries) -> Vec<ExtremeEvent> {
        EventDetector::default().detect_kind(series, kind)
    }

    #[test]
    fn test_ten_dry_days_make_one_drought() {
        let events = detect(EventKind::Drought, &series_of(Field::Rainfall, &[0.5; 10]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration, 10);
        assert_eq!(events[0].start, day(0));
        assert_eq!(events[0].end, day(9));
        assert_eq!(events[0].extreme(Field::Rainfall, Statistic::Max), Some(0.5));
        assert_eq!(events[0].extreme(Field::Rainfall, Statistic::Mean), Some(0.5));
    }

    #[test]
    fn test_wet_day_splits_drought() {
        let mut rain = [0.5; 10];
        rain[1] = 0.9;
        rain[3] = 0.0;
        rain[7] = 2.0;
        let events = detect(EventKind::Drought, &series_of(Field::Rainfall, &rain));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration, 7);
        assert_eq!(events[0].end, day(6));
        // The wet day after the run is not part of it.
        assert_eq!(events[0].extreme(Field::Rainfall, Statistic::Max), Some(0.9));
        assert_eq!(events[0].extreme(Field::Rainfall, Statistic::Mean), Some(0.5));
    }

    #[test]
    fn test_broken_heat_wave_is_not_emitted() {
        let series = series_of(Field::TemperatureMax, &[26.0, 27.0, 24.0, 28.0]);
        assert!(detect(EventKind::HeatWave, &series).is_empty());
    }

    #[test]
    fn test_min_length_boundary() {
        let two = series_of(Field::TemperatureMax, &[26.0, 27.0, 20.0]);
        assert!(detect(EventKind::HeatWave, &two).is_empty());

        let three = series_of(Field::TemperatureMax, &[26.0, 27.0, 26.5, 20.0]);
        let events = detect(EventKind::HeatWave, &three);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration, 3);
    }

    #[test]
    fn test_extremes_cover_only_the_run() {
        let series = series_of(
            Field::TemperatureMax,
            &[40.0, 20.0, 27.0, 30.5, 28.0, 24.0, 35.0, 26.0],
        );
        let events = detect(EventKind::HeatWave, &series);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, day(2));
        assert_eq!(
            events[0].extreme(Field::TemperatureMax, Statistic::Max),
            Some(30.5)
        );
    }

    #[test]
    fn test_open_run_is_flushed_with_last_date() {
        let series = series_of(Field::TemperatureMin, &[1.0, -3.0, -5.5, -2.5]);
        let events = detect(EventKind::ColdSnap, &series);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].end, day(3));
        assert_eq!(
            events[0].extreme(Field::TemperatureMin, Statistic::Min),
            Some(-5.5)
        );
    }

    #[test]
    fn test_gap_and_missing_field_break_runs() {
        let observations = vec![
            Observation::empty(day(0)).with(Field::TemperatureMax, 30.0),
            Observation::empty(day(1)).with(Field::TemperatureMax, 30.0),
            // day 2 absent
            Observation::empty(day(3)).with(Field::TemperatureMax, 30.0),
            Observation::empty(day(4)).with(Field::TemperatureMax, 30.0),
            Observation::empty(day(5)),
            Observation::empty(day(6)).with(Field::TemperatureMax, 30.0),
        ];
        let series = ObservationSeries::new(observations).unwrap();
        assert!(detect(EventKind::HeatWave, &series).is_empty());
    }

    #[test]
    fn test_strong_wind_tracks_gust_and_speed() {
        let observations = (0..3)
            .map(|i| {
                Observation::empty(day(i))
                    .with(Field::WindGusts, 65.0 + i as f64)
                    .with(Field::WindSpeed, 30.0 - i as f64)
            })
            .collect();
        let series = ObservationSeries::new(observations).unwrap();
        let events = detect(EventKind::StrongWind, &series);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].extreme(Field::WindGusts, Statistic::Max), Some(67.0));
        assert_eq!(events[0].extreme(Field::WindSpeed, Statistic::Max), Some(30.0));
    }

    #[test]
    fn test_calm_period_mean_speed() {
        let series = series_of(Field::WindSpeed, &[2.0, 4.0, 6.0, 8.0, 5.0, 12.0]);
        let events = detect(EventKind::CalmPeriod, &series);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].extreme(Field::WindSpeed, Statistic::Mean), Some(5.0));
    }

    #[test]
    fn test_empty_series() {
        let series = ObservationSeries::default();
        assert!(EventDetector::default().detect(&series).is_empty());
    }

    #[test]
    fn test_summary_and_grouping() {
        let mut rain = vec![0.0; 20];
        rain[9] = 5.0;
        let series = series_of(Field::Rainfall, &rain);
        let events = EventDetector::default().detect(&series);
        let summaries = summarize_events(&events);
        let drought = summaries
            .iter()
            .find(|s| s.kind == EventKind::Drought)
            .unwrap();
        assert_eq!((drought.count, drought.longest, drought.total_days), (2, 10, 19));
        assert_eq!(summaries.len(), EventKind::ALL.len());
        assert_eq!(events_by_year(&events)[&2024].len(), 2);
    }
}
