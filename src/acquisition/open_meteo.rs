//! Client for the Open-Meteo historical archive.

use crate::acquisition::error::FetchError;
use crate::acquisition::fetcher::{FetchRequest, ObservationFetcher};
use crate::types::field::Field;
use crate::types::observation::{Observation, ObservationSeries};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    /// Archive API base URL (default: <https://archive-api.open-meteo.com/v1>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://archive-api.open-meteo.com/v1".to_string()
}

const fn default_timeout() -> u64 {
    30
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Body of a successful archive response. Only the daily block is read.
#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    #[serde(flatten)]
    variables: HashMap<String, Vec<Option<f64>>>,
}

/// Body Open-Meteo sends with a 400 response.
#[derive(Debug, Deserialize)]
struct RejectionBody {
    reason: String,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoArchive {
    client: Client,
    config: OpenMeteoConfig,
}

impl OpenMeteoArchive {
    /// # Errors
    ///
    /// Returns [`FetchError::NetworkRequest`] if the HTTP client cannot be built.
    pub fn new(config: OpenMeteoConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::NetworkRequest(config.base_url.clone(), e))?;
        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(OpenMeteoConfig::default())
    }

    pub fn config(&self) -> &OpenMeteoConfig {
        &self.config
    }

    fn url_for(&self, request: &FetchRequest) -> String {
        let daily: Vec<&str> = request.fields.iter().map(|f| f.open_meteo_name()).collect();
        format!(
            "{}/archive?latitude={}&longitude={}&start_date={}&end_date={}&daily={}&timezone=UTC",
            self.config.base_url.trim_end_matches('/'),
            request.location.latitude(),
            request.location.longitude(),
            request.range.start.format("%Y-%m-%d"),
            request.range.end.format("%Y-%m-%d"),
            daily.join(",")
        )
    }
}

#[async_trait]
impl ObservationFetcher for OpenMeteoArchive {
    async fn fetch(&self, request: &FetchRequest) -> Result<ObservationSeries, FetchError> {
        let (lat, lon) = (request.location.latitude(), request.location.longitude());
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(FetchError::Rejected {
                reason: format!("invalid coordinates {}", request.location),
            });
        }
        if request.range.start > request.range.end {
            return Err(FetchError::Rejected {
                reason: format!("empty date range {}", request.range),
            });
        }

        let url = self.url_for(request);
        info!("Downloading daily observations from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        if response.status() == StatusCode::BAD_REQUEST {
            let body = response
                .text()
                .await
                .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
            warn!("Archive rejected {}: {}", url, body);
            return Err(rejection(&body));
        }

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url, e)
                });
            }
        };

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
        let series = parse_daily(&url, &body, &request.fields)?;
        info!("Received {} days from {}", series.len(), url);
        Ok(series)
    }
}

fn rejection(body: &str) -> FetchError {
    let reason = serde_json::from_str::<RejectionBody>(body)
        .map(|b| b.reason)
        .unwrap_or_else(|_| body.trim().to_string());
    FetchError::Rejected { reason }
}

/// Validates a daily archive response and turns it into a series.
///
/// Every requested field must be present with one value per date; `null`
/// values become missing measurements.
fn parse_daily(url: &str, body: &str, fields: &[Field]) -> Result<ObservationSeries, FetchError> {
    let schema_error = |message: String| FetchError::Schema {
        url: url.to_string(),
        message,
    };

    let response: ArchiveResponse =
        serde_json::from_str(body).map_err(|e| schema_error(e.to_string()))?;
    let Some(mut daily) = response.daily else {
        return Err(schema_error("missing daily block".to_string()));
    };

    let days = daily.time.len();
    let mut columns = Vec::with_capacity(fields.len());
    for &field in fields {
        let values = daily
            .variables
            .remove(field.open_meteo_name())
            .ok_or_else(|| schema_error(format!("missing variable {}", field)))?;
        if values.len() != days {
            return Err(schema_error(format!(
                "{} has {} values for {} days",
                field,
                values.len(),
                days
            )));
        }
        columns.push((field, values));
    }

    let mut observations = Vec::with_capacity(days);
    for (i, time) in daily.time.iter().enumerate() {
        let date = NaiveDate::parse_from_str(time, "%Y-%m-%d")
            .map_err(|e| schema_error(format!("invalid date '{}': {}", time, e)))?;
        let mut observation = Observation::empty(date);
        for (field, values) in &columns {
            if let Some(value) = values[i] {
                let value = match field {
                    // The archive reports north as either 0 or 360.
                    Field::WindDirection => value.rem_euclid(360.0),
                    _ => value,
                };
                observation = observation.with(*field, value);
            }
        }
        observations.push(observation);
    }

    Ok(ObservationSeries::from_unsorted(observations)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::location::LatLon;
    use crate::types::period::DateRange;

    const URL: &str = "https://archive.test/v1/archive";

    #[test]
    fn test_parse_daily_block() {
        let body = r#"{
            "latitude": 51.5,
            "longitude": -0.12,
            "daily_units": {"time": "iso8601", "precipitation_sum": "mm"},
            "daily": {
                "time": ["2024-01-01", "2024-01-02", "2024-01-03"],
                "precipitation_sum": [1.2, null, 0.0],
                "wind_direction_10m_dominant": [360.0, 90.0, 180.0]
            }
        }"#;
        let series = parse_daily(
            URL,
            body,
            &[Field::Rainfall, Field::WindDirection],
        )
        .unwrap();
        assert_eq!(series.len(), 3);
        let first = &series.observations()[0];
        assert_eq!(first.rainfall, Some(1.2));
        assert_eq!(first.wind_direction, Some(0.0));
        assert_eq!(series.observations()[1].rainfall, None);
        assert_eq!(series.observations()[1].temperature_max, None);
    }

    #[test]
    fn test_length_mismatch_is_schema_error() {
        let body = r#"{"daily": {"time": ["2024-01-01", "2024-01-02"], "precipitation_sum": [1.0]}}"#;
        let err = parse_daily(URL, body, &[Field::Rainfall]).unwrap_err();
        assert!(matches!(err, FetchError::Schema { .. }));
        assert!(err.is_narrowable());
    }

    #[test]
    fn test_missing_variable_and_bad_date() {
        let body = r#"{"daily": {"time": ["2024-01-01"], "precipitation_sum": [1.0]}}"#;
        assert!(matches!(
            parse_daily(URL, body, &[Field::Rainfall, Field::Sunshine]),
            Err(FetchError::Schema { .. })
        ));

        let body = r#"{"daily": {"time": ["01/01/2024"], "precipitation_sum": [1.0]}}"#;
        assert!(matches!(
            parse_daily(URL, body, &[Field::Rainfall]),
            Err(FetchError::Schema { .. })
        ));

        assert!(matches!(
            parse_daily(URL, "{}", &[Field::Rainfall]),
            Err(FetchError::Schema { .. })
        ));
    }

    #[test]
    fn test_negative_rainfall_is_invalid_series() {
        let body = r#"{"daily": {"time": ["2024-01-01"], "precipitation_sum": [-1.0]}}"#;
        assert!(matches!(
            parse_daily(URL, body, &[Field::Rainfall]),
            Err(FetchError::InvalidSeries(_))
        ));
    }

    #[test]
    fn test_rejection_reason() {
        let err = rejection(r#"{"error": true, "reason": "Cannot initialize WeatherVariable"}"#);
        match err {
            FetchError::Rejected { reason } => {
                assert_eq!(reason, "Cannot initialize WeatherVariable")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_request_url() {
        let archive = OpenMeteoArchive::new(OpenMeteoConfig {
            base_url: "https://archive.test/v1/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        let request = FetchRequest {
            location: LatLon(51.5, -0.12),
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
            ),
            fields: vec![Field::Rainfall, Field::TemperatureMax],
        };
        assert_eq!(
            archive.url_for(&request),
            "https://archive.test/v1/archive?latitude=51.5&longitude=-0.12\
             &start_date=2020-01-01&end_date=2020-12-31\
             &daily=precipitation_sum,temperature_2m_max&timezone=UTC"
        );
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_locally() {
        let archive = OpenMeteoArchive::with_defaults().unwrap();
        let request = FetchRequest::comprehensive(
            LatLon(123.0, 0.0),
            DateRange::new(
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            ),
        );
        assert!(matches!(
            archive.fetch(&request).await,
            Err(FetchError::Rejected { .. })
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: OpenMeteoConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OpenMeteoConfig::default());
        assert_eq!(config.timeout_secs, 30);
    }
}
