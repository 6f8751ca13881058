//! A time-bounded cache keyed by location, data kind and (optionally) the
//! covered date range.
//!
//! Entries are stored as self-describing JSON envelopes
//! (`{ data, createdAt, expiresAt, range? }`) in a [`Store`]. The cache is an
//! optimisation only: store failures and unreadable entries are logged and
//! turn into misses, they are never returned to the caller.

use crate::cache::store::Store;
use crate::clock::{Clock, SystemClock};
use crate::types::data_kind::DataKind;
use crate::types::location::LatLon;
use crate::types::period::DateRange;
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    data: T,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<DateRange>,
}

/// Settings for a [`TemporalCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Decimal places coordinates are rounded to before building a key.
    #[serde(default = "default_precision")]
    pub coordinate_precision: u32,

    /// Prefix of every key this cache owns in the store.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Per-kind TTL overrides in seconds. Kinds not listed use [`DataKind::default_ttl`].
    #[serde(default)]
    pub ttl_secs: HashMap<DataKind, i64>,
}

const fn default_precision() -> u32 {
    2
}

fn default_key_prefix() -> String {
    "weather".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            coordinate_precision: default_precision(),
            key_prefix: default_key_prefix(),
            ttl_secs: HashMap::new(),
        }
    }
}

/// A cached payload together with its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry<T> {
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub range: Option<DateRange>,
}

impl<T> CachedEntry<T> {
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.created_at
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheStats {
    pub entries: usize,
    /// Sum of the serialized envelope lengths, in bytes.
    pub total_bytes: usize,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub by_kind: HashMap<DataKind, usize>,
}

/// Time-bounded cache in front of the acquisition layer.
///
/// # Examples
///
/// ```
/// use meteo_insights::{CacheConfig, DataKind, LatLon, ManualClock, MemoryStore, TemporalCache};
/// use chrono::TimeDelta;
/// use std::sync::Arc;
///
/// let clock = Arc::new(ManualClock::default());
/// let cache = TemporalCache::new(MemoryStore::new(), Arc::clone(&clock), CacheConfig::default());
/// let home = LatLon(51.5074, -0.1278);
///
/// cache.set(home, DataKind::Current, &vec![1.0, 2.0], Some(TimeDelta::milliseconds(1000)));
/// assert_eq!(cache.get::<Vec<f64>>(home, DataKind::Current), Some(vec![1.0, 2.0]));
///
/// clock.advance(TimeDelta::milliseconds(1001));
/// assert_eq!(cache.get::<Vec<f64>>(home, DataKind::Current), None);
/// assert!(!cache.has(home, DataKind::Current));
/// ```
pub struct TemporalCache<S, C = SystemClock> {
    store: Mutex<S>,
    clock: C,
    config: CacheConfig,
}

impl<S: Store> TemporalCache<S, SystemClock> {
    pub fn with_system_clock(store: S) -> Self {
        Self::new(store, SystemClock, CacheConfig::default())
    }
}

impl<S: Store, C: Clock> TemporalCache<S, C> {
    pub fn new(store: S, clock: C, config: CacheConfig) -> Self {
        Self {
            store: Mutex::new(store),
            clock,
            config,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// TTL used for `kind` when a caller passes none.
    pub fn ttl_for(&self, kind: DataKind) -> TimeDelta {
        self.config
            .ttl_secs
            .get(&kind)
            .map(|secs| TimeDelta::seconds(*secs))
            .unwrap_or_else(|| kind.default_ttl())
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(&self, location: LatLon, kind: DataKind) -> String {
        format!(
            "{}_{}_{}",
            self.config.key_prefix,
            kind.key_segment(),
            location.key_fragment(self.config.coordinate_precision)
        )
    }

    /// Recovers the kind from a key built by [`Self::key`], or `None` for foreign keys.
    fn kind_of_key(&self, key: &str) -> Option<DataKind> {
        let rest = key.strip_prefix(&self.config.key_prefix)?.strip_prefix('_')?;
        // Coordinates never contain '_', so the last two segments are latitude and longitude.
        let mut parts = rest.rsplitn(3, '_');
        let (_lon, _lat, kind) = (parts.next()?, parts.next()?, parts.next()?);
        DataKind::from_key_segment(kind)
    }

    fn owned_keys(&self, store: &S) -> Vec<String> {
        match store.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|key| self.kind_of_key(key).is_some())
                .collect(),
            Err(e) => {
                warn!("Failed to list cache keys: {}", e);
                Vec::new()
            }
        }
    }

    fn remove_key(store: &mut S, key: &str) {
        if let Err(e) = store.remove(key) {
            warn!("Failed to remove cache entry {}: {}", key, e);
        }
    }

    fn write<T: Serialize>(
        &self,
        location: LatLon,
        kind: DataKind,
        payload: &T,
        ttl: Option<TimeDelta>,
        range: Option<DateRange>,
    ) -> bool {
        let ttl = ttl.unwrap_or_else(|| self.ttl_for(kind));
        if ttl <= TimeDelta::zero() {
            warn!("Refusing to cache {} for {} with non-positive TTL {}", kind, location, ttl);
            return false;
        }
        let created_at = self.clock.now();
        let envelope = Envelope {
            data: payload,
            created_at,
            expires_at: created_at + ttl,
            range,
        };
        let serialized = match serde_json::to_string(&envelope) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!("Failed to serialize {} payload for {}: {}", kind, location, e);
                return false;
            }
        };

        let key = self.key(location, kind);
        let bytes = serialized.len();
        match self.lock().set(&key, serialized) {
            Ok(()) => {
                debug!("Cached {} ({} bytes, ttl {})", key, bytes, ttl);
                true
            }
            Err(e) => {
                warn!("Failed to cache {}: {}", key, e);
                false
            }
        }
    }

    fn read<T: DeserializeOwned>(&self, location: LatLon, kind: DataKind) -> Option<Envelope<T>> {
        let key = self.key(location, kind);
        let mut store = self.lock();
        let raw = match store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", key, e);
                return None;
            }
        };

        let envelope = match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Removing unreadable cache entry {}: {}", key, e);
                Self::remove_key(&mut store, &key);
                return None;
            }
        };

        if self.clock.now() > envelope.expires_at {
            info!("Cache entry {} expired at {}", key, envelope.expires_at);
            Self::remove_key(&mut store, &key);
            return None;
        }
        Some(envelope)
    }

    /// Stores `payload` for `(location, kind)`, replacing any previous entry.
    /// Returns whether the entry was written.
    pub fn set<T: Serialize>(
        &self,
        location: LatLon,
        kind: DataKind,
        payload: &T,
        ttl: Option<TimeDelta>,
    ) -> bool {
        self.write(location, kind, payload, ttl, None)
    }

    /// Stores `payload` together with the date range it covers.
    pub fn set_with_range<T: Serialize>(
        &self,
        location: LatLon,
        kind: DataKind,
        range: DateRange,
        payload: &T,
        ttl: Option<TimeDelta>,
    ) -> bool {
        self.write(location, kind, payload, ttl, Some(range))
    }

    /// The live payload for `(location, kind)`. Expired and unreadable entries
    /// are removed and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, location: LatLon, kind: DataKind) -> Option<T> {
        self.read(location, kind).map(|envelope| envelope.data)
    }

    /// Like [`Self::get`], but also returns the entry's timestamps and range.
    pub fn get_entry<T: DeserializeOwned>(
        &self,
        location: LatLon,
        kind: DataKind,
    ) -> Option<CachedEntry<T>> {
        self.read(location, kind).map(|envelope| CachedEntry {
            data: envelope.data,
            created_at: envelope.created_at,
            expires_at: envelope.expires_at,
            range: envelope.range,
        })
    }

    /// The live payload if its stored range fully covers `range`. A partial
    /// overlap is a miss; the valid entry is left in place.
    pub fn get_with_range<T: DeserializeOwned>(
        &self,
        location: LatLon,
        kind: DataKind,
        range: DateRange,
    ) -> Option<T> {
        self.get_entry_with_range(location, kind, range)
            .map(|entry| entry.data)
    }

    pub fn get_entry_with_range<T: DeserializeOwned>(
        &self,
        location: LatLon,
        kind: DataKind,
        range: DateRange,
    ) -> Option<CachedEntry<T>> {
        let entry = self.get_entry(location, kind)?;
        match entry.range {
            Some(stored) if stored.covers(&range) => Some(entry),
            stored => {
                debug!(
                    "Cached {} range {:?} does not cover {} for {}",
                    kind, stored, range, location
                );
                None
            }
        }
    }

    pub fn has(&self, location: LatLon, kind: DataKind) -> bool {
        self.read::<IgnoredAny>(location, kind).is_some()
    }

    /// Removes every kind cached for `location`.
    pub fn clear_location(&self, location: LatLon) {
        let mut store = self.lock();
        for kind in DataKind::ALL {
            Self::remove_key(&mut store, &self.key(location, kind));
        }
    }

    /// Removes expired and unreadable entries. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let now = self.clock.now();
        let mut store = self.lock();
        let mut removed = 0;
        for key in self.owned_keys(&store) {
            let stale = match store.get(&key) {
                Ok(Some(raw)) => serde_json::from_str::<Envelope<IgnoredAny>>(&raw)
                    .map_or(true, |envelope| now > envelope.expires_at),
                Ok(None) => false,
                Err(e) => {
                    warn!("Failed to read cache entry {}: {}", key, e);
                    true
                }
            };
            if stale {
                Self::remove_key(&mut store, &key);
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Cleared {} expired cache entries", removed);
        }
        removed
    }

    /// Removes every entry owned by this cache, regardless of kind or expiry.
    pub fn clear_all(&self) -> usize {
        let mut store = self.lock();
        let keys = self.owned_keys(&store);
        for key in &keys {
            Self::remove_key(&mut store, key);
        }
        keys.len()
    }

    pub fn stats(&self) -> CacheStats {
        let store = self.lock();
        let mut stats = CacheStats::default();
        for key in self.owned_keys(&store) {
            let Ok(Some(raw)) = store.get(&key) else {
                continue;
            };
            stats.entries += 1;
            stats.total_bytes += raw.len();
            if let Some(kind) = self.kind_of_key(&key) {
                *stats.by_kind.entry(kind).or_insert(0) += 1;
            }
            if let Ok(envelope) = serde_json::from_str::<Envelope<IgnoredAny>>(&raw) {
                stats.oldest_created_at = Some(match stats.oldest_created_at {
                    Some(oldest) => oldest.min(envelope.created_at),
                    None => envelope.created_at,
                });
            }
        }
        stats
    }
}
