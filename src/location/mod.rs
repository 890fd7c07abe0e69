use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::validate_point;
use crate::models::courier::{GeoPoint, LocationSample};
use crate::state::AppState;

/// Where a location read was served from. Callers and tests need to tell a
/// fresh read from a degraded one, so the fallback is never hidden behind a
/// uniform return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Realtime,
    Historical,
}

#[derive(Debug, Clone)]
struct HotRow {
    sample: LocationSample,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SampleInput {
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub ts: Option<DateTime<Utc>>,
}

/// Per-courier location store: one hot row with a TTL for "where is this
/// courier right now", backed by a capped durable history. The hot side is
/// disposable; wiping it loses nothing but the freshness window.
pub struct LocationCache {
    ttl: TimeDelta,
    history_cap: usize,
    hot: DashMap<Uuid, HotRow>,
    history: DashMap<Uuid, VecDeque<LocationSample>>,
}

impl LocationCache {
    pub fn new(ttl: Duration, history_cap: usize) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            history_cap: history_cap.max(1),
            hot: DashMap::new(),
            history: DashMap::new(),
        }
    }

    /// Overwrites the courier's hot row and appends to durable history,
    /// trimming history to the newest `history_cap` entries. Concurrent
    /// trims for the same courier are benign; extra pops find nothing
    /// excess to remove.
    pub fn record(&self, courier_id: Uuid, input: SampleInput) -> Result<LocationSample, AppError> {
        validate_point(&GeoPoint {
            lat: input.lat,
            lng: input.lng,
        })?;

        let mut entry = self.history.entry(courier_id).or_default();

        // recorded_at is server-assigned and clamped monotonic per courier
        // so history order never depends on client clocks.
        let now = Utc::now();
        let recorded_at = match entry.back() {
            Some(last) if last.recorded_at >= now => {
                last.recorded_at + TimeDelta::milliseconds(1)
            }
            _ => now,
        };

        let sample = LocationSample {
            courier_id,
            lat: input.lat,
            lng: input.lng,
            heading: input.heading,
            speed: input.speed,
            accuracy: input.accuracy,
            ts: input.ts,
            recorded_at,
        };

        entry.push_back(sample.clone());
        while entry.len() > self.history_cap {
            entry.pop_front();
        }
        drop(entry);

        self.hot.insert(
            courier_id,
            HotRow {
                sample: sample.clone(),
                expires_at: recorded_at + self.ttl,
            },
        );

        Ok(sample)
    }

    /// Hot row first; an expired or missing row degrades to the newest
    /// durable entry. `None` means no data yet, which callers treat as
    /// "location pending" rather than a hard error.
    pub fn read(&self, courier_id: Uuid) -> Option<(LocationSample, Source)> {
        if let Some(row) = self.hot.get(&courier_id) {
            if row.expires_at > Utc::now() {
                return Some((row.sample.clone(), Source::Realtime));
            }
        }

        self.history
            .get(&courier_id)
            .and_then(|entries| entries.back().cloned())
            .map(|sample| (sample, Source::Historical))
    }

    pub fn last_known_position(&self, courier_id: Uuid) -> Option<GeoPoint> {
        self.read(courier_id).map(|(sample, _)| sample.position())
    }

    /// Drops expired hot rows. Purely hygienic, expiry is also checked at
    /// read time.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.hot.len();
        self.hot.retain(|_, row| row.expires_at > now);
        before - self.hot.len()
    }

    pub fn history_len(&self, courier_id: Uuid) -> usize {
        self.history
            .get(&courier_id)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }
}

pub async fn run_hot_sweeper(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let removed = state.locations.sweep_expired();
        if removed > 0 {
            debug!(removed, "swept expired hot location rows");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::{LocationCache, SampleInput, Source};
    use crate::error::AppError;

    fn sample(lat: f64, lng: f64) -> SampleInput {
        SampleInput {
            lat,
            lng,
            heading: None,
            speed: None,
            accuracy: None,
            ts: None,
        }
    }

    #[test]
    fn fresh_sample_reads_realtime() {
        let cache = LocationCache::new(Duration::from_secs(600), 100);
        let courier = Uuid::new_v4();

        let written = cache.record(courier, sample(41.0082, 28.9784)).unwrap();
        let (read, source) = cache.read(courier).unwrap();

        assert_eq!(source, Source::Realtime);
        assert_eq!(read.lat, written.lat);
        assert_eq!(read.lng, written.lng);
        assert_eq!(read.recorded_at, written.recorded_at);
    }

    #[tokio::test]
    async fn expired_hot_row_degrades_to_historical() {
        let cache = LocationCache::new(Duration::from_millis(40), 100);
        let courier = Uuid::new_v4();

        cache.record(courier, sample(41.0082, 28.9784)).unwrap();
        let (_, source) = cache.read(courier).unwrap();
        assert_eq!(source, Source::Realtime);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let (fallback, source) = cache.read(courier).unwrap();
        assert_eq!(source, Source::Historical);
        assert_eq!(fallback.lat, 41.0082);
    }

    #[test]
    fn unknown_courier_has_no_location() {
        let cache = LocationCache::new(Duration::from_secs(600), 100);
        assert!(cache.read(Uuid::new_v4()).is_none());
    }

    #[test]
    fn history_is_trimmed_to_cap_keeping_newest() {
        let cache = LocationCache::new(Duration::from_secs(600), 5);
        let courier = Uuid::new_v4();

        for i in 0..12 {
            cache
                .record(courier, sample(41.0, 28.0 + f64::from(i) * 0.001))
                .unwrap();
        }

        assert_eq!(cache.history_len(courier), 5);

        // The surviving entry set is the newest by recorded_at; the latest
        // write is what a degraded read returns.
        let entries = cache.history.get(&courier).unwrap();
        assert!(entries
            .iter()
            .zip(entries.iter().skip(1))
            .all(|(a, b)| a.recorded_at < b.recorded_at));
        assert!((entries.back().unwrap().lng - 28.011).abs() < 1e-9);
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let cache = LocationCache::new(Duration::from_secs(600), 100);
        let courier = Uuid::new_v4();

        let result = cache.record(courier, sample(95.0, 28.0));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(cache.read(courier).is_none());
    }

    #[test]
    fn sweep_removes_only_expired_rows() {
        let cache = LocationCache::new(Duration::from_secs(600), 100);
        let courier = Uuid::new_v4();
        cache.record(courier, sample(41.0, 28.0)).unwrap();

        assert_eq!(cache.sweep_expired(), 0);
        assert!(cache.read(courier).is_some());
    }
}
