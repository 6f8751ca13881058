//! Daily weather acquisition and climate analytics.
//!
//! Observations are fetched through a quota-aware [`RequestThrottle`], kept in a
//! [`TemporalCache`] for a per-kind validity window, and turned into yearly,
//! monthly and seasonal [`ComparisonRecord`]s, [`ExtremeEvent`]s and [`Trend`]s.
//!
//! ```
//! use meteo_insights::*;
//! use chrono::{NaiveDate, TimeDelta};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
//! let observations = (0..10)
//!     .map(|i| Observation::empty(start + TimeDelta::days(i)).with(Field::Rainfall, 0.5))
//!     .collect();
//! let series = ObservationSeries::new(observations)?;
//!
//! let droughts = EventDetector::default().detect_kind(&series, EventKind::Drought);
//! assert_eq!(droughts.len(), 1);
//! assert_eq!(droughts[0].duration, 10);
//!
//! let yearly = SeriesAggregator::default().by_year(&series);
//! assert_eq!(yearly[0].rainfall.daily.sum, 5.0);
//! # Ok::<(), ClimateError>(())
//! ```
mod acquisition;
mod cache;
mod clock;
mod error;
mod stats;
mod throttle;
mod types;
mod utils;

pub use error::ClimateError;

pub use acquisition::archive::{Acquired, WeatherArchive};
pub use acquisition::error::{AcquisitionError, FetchError};
pub use acquisition::fetcher::{FetchRequest, ObservationFetcher};
pub use acquisition::open_meteo::{OpenMeteoArchive, OpenMeteoConfig};

pub use cache::error::StoreError;
pub use cache::store::{FileStore, MemoryStore, Store};
pub use cache::temporal_cache::{CacheConfig, CacheStats, CachedEntry, TemporalCache};
pub use clock::{Clock, ManualClock, SystemClock};

pub use throttle::error::ThrottleError;
pub use throttle::feed_limiter::FeedLimiter;
pub use throttle::request_throttle::{RequestThrottle, ThrottleConfig, ThrottleStats};

pub use stats::aggregate::*;
pub use stats::analysis::{ClimateAnalysis, ClimateReport, DEFAULT_TREND_METRICS};
pub use stats::events::*;
pub use stats::percentile::{percentile, PercentileBand};
pub use stats::trend::*;

pub use types::data_kind::DataKind;
pub use types::field::{Domain, Field};
pub use types::frame::FrameError;
pub use types::location::LatLon;
pub use types::observation::{Observation, ObservationSeries, SeriesError};
pub use types::period::{DateRange, Month, Period, Season, SeasonOfYear, Year};

pub use utils::get_cache_dir;
