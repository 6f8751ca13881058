//! Cached, throttled acquisition of daily observation series.

use crate::acquisition::error::{AcquisitionError, FetchError};
use crate::acquisition::fetcher::{FetchRequest, ObservationFetcher};
use crate::cache::store::Store;
use crate::cache::temporal_cache::TemporalCache;
use crate::clock::{Clock, SystemClock};
use crate::throttle::request_throttle::RequestThrottle;
use crate::types::data_kind::DataKind;
use crate::types::field::Domain;
use crate::types::location::LatLon;
use crate::types::observation::ObservationSeries;
use crate::types::period::DateRange;
use bon::bon;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use log::{info, warn};
use std::sync::Arc;

/// A series together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquired {
    /// Served from the cache; `created_at` is when it was fetched.
    Cached {
        series: ObservationSeries,
        created_at: DateTime<Utc>,
    },
    /// Fetched with every field.
    Fetched { series: ObservationSeries },
    /// The full request failed and only the listed domains were fetched.
    /// Never cached.
    Fallback {
        series: ObservationSeries,
        domains: Vec<Domain>,
        reason: String,
    },
}

impl Acquired {
    pub fn series(&self) -> &ObservationSeries {
        match self {
            Acquired::Cached { series, .. }
            | Acquired::Fetched { series }
            | Acquired::Fallback { series, .. } => series,
        }
    }

    pub fn into_series(self) -> ObservationSeries {
        match self {
            Acquired::Cached { series, .. }
            | Acquired::Fetched { series }
            | Acquired::Fallback { series, .. } => series,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Acquired::Fallback { .. })
    }
}

/// Composes a fetcher, a [`RequestThrottle`] and a [`TemporalCache`].
///
/// Every outbound fetch goes through the throttle. Complete fetches are cached
/// under [`DataKind::Historical`] or [`DataKind::CurrentYear`] together with
/// the range they cover.
pub struct WeatherArchive<F, S, C = SystemClock> {
    fetcher: Arc<F>,
    throttle: RequestThrottle,
    cache: TemporalCache<S, C>,
}

#[bon]
impl<F, S, C> WeatherArchive<F, S, C>
where
    F: ObservationFetcher + 'static,
    S: Store,
    C: Clock,
{
    pub fn new(fetcher: Arc<F>, throttle: RequestThrottle, cache: TemporalCache<S, C>) -> Self {
        Self {
            fetcher,
            throttle,
            cache,
        }
    }

    pub fn cache(&self) -> &TemporalCache<S, C> {
        &self.cache
    }

    pub fn throttle(&self) -> &RequestThrottle {
        &self.throttle
    }

    /// Cache kind for a range: ranges ending before the current year never change.
    pub fn kind_for(&self, range: DateRange) -> DataKind {
        if range.end.year() < self.cache.now().year() {
            DataKind::Historical
        } else {
            DataKind::CurrentYear
        }
    }

    /// Daily observations for `location` between `start` and `end` inclusive.
    ///
    /// Served from the cache when a stored series covers the range. Otherwise
    /// every field is fetched through the throttle and cached. If the archive
    /// rejects that request or returns something unreadable, the fetch is
    /// retried once per domain (only `domain`, when given) and the partial
    /// result is returned uncached as [`Acquired::Fallback`].
    ///
    /// # Errors
    ///
    /// Returns an [`AcquisitionError`] carrying the last valid cached series for
    /// the same location and kind, if one exists, so callers can show it with its age.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use meteo_insights::*;
    /// # use chrono::NaiveDate;
    /// # use std::sync::Arc;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), ClimateError> {
    /// let archive = WeatherArchive::new(
    ///     Arc::new(OpenMeteoArchive::with_defaults()?),
    ///     RequestThrottle::new(ThrottleConfig::default()),
    ///     TemporalCache::with_system_clock(MemoryStore::new()),
    /// );
    /// let acquired = archive
    ///     .observations(LatLon(51.5074, -0.1278))
    ///     .start(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap())
    ///     .end(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    ///     .call()
    ///     .await?;
    /// let report = ClimateAnalysis::new().analyse(acquired.series());
    /// println!("{} yearly records", report.yearly.len());
    /// # Ok(())
    /// # }
    /// ```
    #[builder(start_fn = observations)]
    #[doc(hidden)]
    pub async fn build_observations(
        &self,
        #[builder(start_fn)] location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
        domain: Option<Domain>,
    ) -> Result<Acquired, AcquisitionError> {
        let range = DateRange::new(start, end);
        let kind = self.kind_for(range);

        if let Some(entry) =
            self.cache
                .get_entry_with_range::<ObservationSeries>(location, kind, range)
        {
            info!(
                "Cache hit for {} observations at {} over {}",
                kind, location, range
            );
            return Ok(Acquired::Cached {
                series: entry.data.slice(range),
                created_at: entry.created_at,
            });
        }
        warn!(
            "Cache miss for {} observations at {} over {}. Fetching.",
            kind, location, range
        );

        let error = match self
            .throttled_fetch(FetchRequest::comprehensive(location, range))
            .await
        {
            Ok(series) => {
                self.cache
                    .set_with_range(location, kind, range, &series, None);
                return Ok(Acquired::Fetched { series });
            }
            Err(e) => e,
        };

        if !error.is_narrowable() {
            return Err(self.failure(location, range, kind, error));
        }

        let domains = match domain {
            Some(domain) => vec![domain],
            None => Domain::ALL.to_vec(),
        };
        warn!(
            "Full fetch for {} failed ({}), retrying with {:?} only",
            location, error, domains
        );
        match self.fetch_domains(location, range, &domains).await {
            Ok((series, fetched)) => Ok(Acquired::Fallback {
                series,
                domains: fetched,
                reason: error.to_string(),
            }),
            Err(fallback_error) => Err(self.failure(location, range, kind, fallback_error)),
        }
    }

    async fn throttled_fetch(&self, request: FetchRequest) -> Result<ObservationSeries, FetchError> {
        let fetcher = Arc::clone(&self.fetcher);
        self.throttle
            .submit(move || async move { fetcher.fetch(&request).await })
            .await?
    }

    /// Fetches each domain on its own and merges what succeeds. Fails only if
    /// every domain fails, with the last error.
    async fn fetch_domains(
        &self,
        location: LatLon,
        range: DateRange,
        domains: &[Domain],
    ) -> Result<(ObservationSeries, Vec<Domain>), FetchError> {
        let mut merged: Option<ObservationSeries> = None;
        let mut fetched = Vec::new();
        let mut last_error = None;

        for &domain in domains {
            let request = FetchRequest {
                location,
                range,
                fields: domain.fields().to_vec(),
            };
            match self.throttled_fetch(request).await {
                Ok(series) => {
                    merged = Some(match merged {
                        Some(previous) => previous.merge(&series),
                        None => series,
                    });
                    fetched.push(domain);
                }
                Err(e) => {
                    warn!("Fetching {} for {} failed: {}", domain, location, e);
                    last_error = Some(e);
                }
            }
        }

        match (merged, last_error) {
            (Some(series), _) => Ok((series, fetched)),
            (None, Some(e)) => Err(e),
            (None, None) => Err(FetchError::Rejected {
                reason: "no domains requested".to_string(),
            }),
        }
    }

    fn failure(
        &self,
        location: LatLon,
        range: DateRange,
        kind: DataKind,
        source: FetchError,
    ) -> AcquisitionError {
        let last_cached = self.cache.get_entry::<ObservationSeries>(location, kind);
        if let Some(entry) = &last_cached {
            warn!(
                "Acquisition for {} failed; cached data from {} is available",
                location, entry.created_at
            );
        }
        AcquisitionError {
            location,
            range,
            kind,
            source,
            last_cached,
        }
    }
}
