use crate::stats::aggregate::{
    Anomaly, ComparisonRecord, MonthlyNormal, RecordMetric, SeriesAggregator,
};
use crate::stats::events::{events_by_year, summarize_events, EventDetector, EventSummary, ExtremeEvent};
use crate::stats::trend::{Trend, TrendEstimator};
use crate::types::observation::ObservationSeries;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The metrics [`ClimateAnalysis`] fits trends for by default.
pub const DEFAULT_TREND_METRICS: [RecordMetric; 6] = [
    RecordMetric::RainfallTotal,
    RecordMetric::MeanTemperature,
    RecordMetric::WarmDays,
    RecordMetric::FrostDays,
    RecordMetric::MeanWindSpeed,
    RecordMetric::RadiationTotal,
];

/// Everything computed for one location's series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateReport {
    pub yearly: Vec<ComparisonRecord>,
    pub monthly: Vec<ComparisonRecord>,
    pub seasonal: Vec<ComparisonRecord>,
    pub climatology: Vec<MonthlyNormal>,
    pub events: Vec<ExtremeEvent>,
    pub event_summaries: Vec<EventSummary>,
    pub events_by_year: BTreeMap<i32, Vec<ExtremeEvent>>,
    pub rainfall_anomalies: Vec<Anomaly>,
    pub trends: Vec<Trend>,
}

/// Runs the aggregator, event detector and trend estimator over a series.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateAnalysis {
    pub aggregator: SeriesAggregator,
    pub detector: EventDetector,
    pub estimator: TrendEstimator,
    pub trend_metrics: Vec<RecordMetric>,
}

impl Default for ClimateAnalysis {
    fn default() -> Self {
        Self {
            aggregator: SeriesAggregator::default(),
            detector: EventDetector::default(),
            estimator: TrendEstimator::default(),
            trend_metrics: DEFAULT_TREND_METRICS.to_vec(),
        }
    }
}

impl ClimateAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyse(&self, series: &ObservationSeries) -> ClimateReport {
        let yearly = self.aggregator.by_year(series);
        let events = self.detector.detect(series);
        // Metrics without enough years produce no trend.
        let trends: Vec<Trend> = self
            .trend_metrics
            .iter()
            .filter_map(|&metric| self.estimator.for_records(&yearly, metric))
            .collect();
        debug!(
            "Analysed {} observations: {} years, {} events, {} trends",
            series.len(),
            yearly.len(),
            events.len(),
            trends.len()
        );

        ClimateReport {
            monthly: self.aggregator.by_month(series),
            seasonal: self.aggregator.by_season(series),
            climatology: self.aggregator.monthly_climatology(series),
            event_summaries: summarize_events(&events),
            events_by_year: events_by_year(&events),
            rainfall_anomalies: self
                .aggregator
                .yearly_anomalies(series, RecordMetric::RainfallTotal),
            trends,
            events,
            yearly,
        }
    }
}
