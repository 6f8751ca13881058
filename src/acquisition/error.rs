use crate::cache::temporal_cache::CachedEntry;
use crate::throttle::error::ThrottleError;
use crate::types::data_kind::DataKind;
use crate::types::location::LatLon;
use crate::types::observation::{ObservationSeries, SeriesError};
use crate::types::period::DateRange;
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    /// The archive understood the request but refused it, e.g. an unsupported
    /// variable or a range outside its coverage.
    #[error("Archive rejected the request: {reason}")]
    Rejected { reason: String },

    #[error("Unexpected response from {url}: {message}")]
    Schema { url: String, message: String },

    #[error("Response contained invalid observations")]
    InvalidSeries(#[from] SeriesError),

    #[error(transparent)]
    Throttle(#[from] ThrottleError),
}

impl FetchError {
    /// Whether asking for fewer variables might succeed where the full request failed.
    pub fn is_narrowable(&self) -> bool {
        matches!(
            self,
            FetchError::Rejected { .. } | FetchError::Schema { .. } | FetchError::InvalidSeries(_)
        )
    }
}

/// A failed acquisition, with the context it was attempted in and whatever the
/// cache still holds for the same location and kind.
#[derive(Debug, Error)]
#[error("Failed to acquire {kind} observations for {location} over {range}")]
pub struct AcquisitionError {
    pub location: LatLon,
    pub range: DateRange,
    pub kind: DataKind,
    #[source]
    pub source: FetchError,
    /// The last valid cached series for `(location, kind)`, if any. It may not
    /// cover `range`.
    pub last_cached: Option<CachedEntry<ObservationSeries>>,
}

impl AcquisitionError {
    /// How old the cached fallback is at `now`.
    pub fn last_cached_age(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.last_cached.as_ref().map(|entry| entry.age(now))
    }
}
