use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PoiSettings;
use crate::core::distance::haversine_distance_m;
use crate::models::{Coordinates, PoiCategory, PointOfInterest, RawPoi};
use crate::services::cache::{CacheKey, CacheManager};
use crate::services::poi::PoiClient;
use crate::services::snapshot::SnapshotStore;

/// One cached raw fetch: the points plus the radius of the window they were
/// fetched for. An entry only satisfies queries whose radius fits inside
/// that window; a wider query refetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedFetch {
    #[serde(rename = "fetchRadiusM")]
    fetch_radius_m: f64,
    points: Vec<RawPoi>,
}

/// Aggregated POI query result across all categories
#[derive(Debug, Default)]
pub struct PoiQueryOutcome {
    pub pois: BTreeMap<PoiCategory, Vec<PointOfInterest>>,
    /// Categories whose live query failed and were served from a snapshot
    /// (or came back empty)
    pub degraded: Vec<PoiCategory>,
}

impl PoiQueryOutcome {
    /// Straight-line distance to the nearest transit stop, or the sentinel
    /// when no transit was found within the search radius
    pub fn nearest_transit_m(&self, sentinel: f64) -> f64 {
        self.pois
            .get(&PoiCategory::Transit)
            .and_then(|stops| stops.first())
            .map(|stop| stop.distance_m)
            .unwrap_or(sentinel)
    }
}

/// Lowercased, whitespace-collapsed name used for duplicate detection
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop later points that duplicate an earlier one.
///
/// Two points are duplicates only when they are both closer than the
/// threshold AND carry the same normalized name; nearby but distinctly
/// named features are kept.
pub fn dedup_points(points: Vec<RawPoi>, threshold_m: f64) -> Vec<RawPoi> {
    let mut kept: Vec<RawPoi> = Vec::with_capacity(points.len());

    for candidate in points {
        let candidate_name = normalize_name(&candidate.name);
        let duplicate = kept.iter().any(|existing| {
            normalize_name(&existing.name) == candidate_name
                && haversine_distance_m(
                    existing.latitude,
                    existing.longitude,
                    candidate.latitude,
                    candidate.longitude,
                ) < threshold_m
        });

        if !duplicate {
            kept.push(candidate);
        }
    }

    kept
}

/// Turn raw fetched points into the final per-category listing: compute
/// distances from the site, drop anything beyond the radius, collapse
/// duplicates, sort nearest-first, cap the count.
pub fn postprocess(
    raw: Vec<RawPoi>,
    site: Coordinates,
    radius_m: f64,
    category: PoiCategory,
    settings: &PoiSettings,
) -> Vec<PointOfInterest> {
    let deduped = dedup_points(raw, settings.dedup_threshold_m);

    let mut pois: Vec<PointOfInterest> = deduped
        .into_iter()
        .map(|p| {
            let distance_m = haversine_distance_m(
                site.latitude,
                site.longitude,
                p.latitude,
                p.longitude,
            );
            PointOfInterest {
                category,
                name: p.name,
                latitude: p.latitude,
                longitude: p.longitude,
                distance_m,
            }
        })
        .filter(|p| p.distance_m <= radius_m)
        .collect();

    pois.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    pois.truncate(settings.per_category_cap);
    pois
}

/// Fan-out engine for proximity queries.
///
/// Queries every category concurrently; a failing category falls back to
/// the latest covering snapshot instead of failing the whole request.
/// Only raw points (name and coordinates) are ever cached, so distances
/// are always computed against the requesting site.
pub struct ProximityEngine {
    client: PoiClient,
    cache: Arc<CacheManager>,
    snapshots: Option<Arc<SnapshotStore>>,
    settings: PoiSettings,
    cache_ttl: Duration,
}

impl ProximityEngine {
    pub fn new(
        client: PoiClient,
        cache: Arc<CacheManager>,
        snapshots: Option<Arc<SnapshotStore>>,
        settings: PoiSettings,
        cache_ttl: Duration,
    ) -> Self {
        Self { client, cache, snapshots, settings, cache_ttl }
    }

    /// Query all categories around a site
    pub async fn query_all(&self, site: Coordinates, radius_m: f64) -> PoiQueryOutcome {
        let (transit, school, park, shop, heritage) = tokio::join!(
            self.query_category(site, radius_m, PoiCategory::Transit),
            self.query_category(site, radius_m, PoiCategory::School),
            self.query_category(site, radius_m, PoiCategory::Park),
            self.query_category(site, radius_m, PoiCategory::Shop),
            self.query_category(site, radius_m, PoiCategory::Heritage),
        );

        let mut outcome = PoiQueryOutcome::default();
        for (category, (pois, degraded)) in [
            (PoiCategory::Transit, transit),
            (PoiCategory::School, school),
            (PoiCategory::Park, park),
            (PoiCategory::Shop, shop),
            (PoiCategory::Heritage, heritage),
        ] {
            if degraded {
                outcome.degraded.push(category);
            }
            outcome.pois.insert(category, pois);
        }

        outcome
    }

    /// Query a single category; the boolean is true when the live fetch
    /// failed and the result came from fallback
    pub async fn query_category(
        &self,
        site: Coordinates,
        radius_m: f64,
        category: PoiCategory,
    ) -> (Vec<PointOfInterest>, bool) {
        let cache_key = CacheKey::pois(&site, category);

        if let Some(cached) = self.cache.get_fresh::<CachedFetch>(&cache_key, self.cache_ttl).await {
            // An entry fetched for a narrower window cannot answer a wider
            // query; it would silently drop everything beyond its window.
            if cached.fetch_radius_m >= radius_m {
                tracing::debug!("POI cache hit for {} {}", category, site.rounded_key());
                return (postprocess(cached.points, site, radius_m, category, &self.settings), false);
            }
            tracing::debug!(
                "POI cache entry for {} {} covers {}m, query wants {}m, refetching",
                category,
                site.rounded_key(),
                cached.fetch_radius_m,
                radius_m
            );
        }

        // Fetch at least the default radius so the cached raw set also
        // serves smaller follow-up queries for the same site.
        let fetch_radius = radius_m.max(self.settings.default_radius_m);

        match self.client.fetch_category(site, fetch_radius, category).await {
            Ok(raw) => {
                let entry = CachedFetch { fetch_radius_m: fetch_radius, points: raw };
                self.cache.put(&cache_key, &entry, self.cache_ttl).await;
                (postprocess(entry.points, site, radius_m, category, &self.settings), false)
            }
            Err(e) => {
                tracing::warn!("Live {} query failed for {}: {}", category, site.rounded_key(), e);
                (self.snapshot_fallback(site, radius_m, category).await, true)
            }
        }
    }

    async fn snapshot_fallback(
        &self,
        site: Coordinates,
        radius_m: f64,
        category: PoiCategory,
    ) -> Vec<PointOfInterest> {
        let Some(store) = &self.snapshots else {
            return Vec::new();
        };

        match store.latest_covering(category, site).await {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    "Serving {} for {} from snapshot taken {}",
                    category,
                    site.rounded_key(),
                    snapshot.fetched_at
                );
                postprocess(snapshot.points, site, radius_m, category, &self.settings)
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Snapshot lookup failed for {}: {}", category, e);
                Vec::new()
            }
        }
    }

    /// Fetch every category live and persist the raw results as snapshots.
    ///
    /// Returns stored point counts per category plus the categories whose
    /// fetch or store failed. Requires a configured snapshot store.
    pub async fn refresh_snapshots(
        &self,
        site: Coordinates,
        radius_m: f64,
    ) -> (BTreeMap<PoiCategory, usize>, Vec<PoiCategory>) {
        let mut stored = BTreeMap::new();
        let mut failed = Vec::new();

        let Some(store) = &self.snapshots else {
            return (stored, PoiCategory::ALL.to_vec());
        };

        for category in PoiCategory::ALL {
            match self.client.fetch_category(site, radius_m, category).await {
                Ok(raw) => match store.store(category, site, radius_m, &raw).await {
                    Ok(()) => {
                        stored.insert(category, raw.len());
                    }
                    Err(e) => {
                        tracing::error!("Failed to store {} snapshot: {}", category, e);
                        failed.push(category);
                    }
                },
                Err(e) => {
                    tracing::warn!("Snapshot fetch for {} failed: {}", category, e);
                    failed.push(category);
                }
            }
        }

        (stored, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poi_settings() -> PoiSettings {
        PoiSettings::default()
    }

    fn raw(name: &str, lat: f64, lon: f64) -> RawPoi {
        RawPoi { name: name.to_string(), latitude: lat, longitude: lon }
    }

    const SITE: Coordinates = Coordinates { latitude: -37.8136, longitude: 144.9631 };

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Main   St  Station "), "main st station");
        assert_eq!(normalize_name("MAIN ST STATION"), "main st station");
    }

    #[test]
    fn test_dedup_collapses_same_name_nearby() {
        // Two listings of the same station ~11m apart (0.0001 deg lat)
        let points = vec![
            raw("Main St Station", -37.8136, 144.9631),
            raw("main st  station", -37.8137, 144.9631),
        ];

        let deduped = dedup_points(points, 30.0);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].name, "Main St Station");
    }

    #[test]
    fn test_dedup_keeps_distinct_names_nearby() {
        let points = vec![
            raw("Platform 1", -37.8136, 144.9631),
            raw("Platform 2", -37.8137, 144.9631),
        ];

        assert_eq!(dedup_points(points, 30.0).len(), 2);
    }

    #[test]
    fn test_dedup_keeps_same_name_far_apart() {
        // Two "Coles" ~2km apart are different shops
        let points = vec![
            raw("Coles", -37.8136, 144.9631),
            raw("Coles", -37.8316, 144.9631),
        ];

        assert_eq!(dedup_points(points, 30.0).len(), 2);
    }

    #[test]
    fn test_postprocess_sorts_filters_and_caps() {
        let settings = poi_settings();

        // One point inside the radius, one well beyond it
        let inside = raw("Near Park", -37.8140, 144.9631);
        let outside = raw("Far Park", -37.8636, 144.9631);
        let nearest = raw("Corner Park", -37.8137, 144.9631);

        let pois = postprocess(
            vec![inside, outside, nearest],
            SITE,
            1000.0,
            PoiCategory::Park,
            &settings,
        );

        assert_eq!(pois.len(), 2);
        assert_eq!(pois[0].name, "Corner Park");
        assert!(pois[0].distance_m < pois[1].distance_m);
        assert!(pois.iter().all(|p| p.distance_m <= 1000.0));
    }

    #[test]
    fn test_postprocess_cap() {
        let settings = poi_settings();
        let points: Vec<RawPoi> = (0..40)
            .map(|i| raw(&format!("Shop {}", i), -37.8136 + i as f64 * 0.0005, 144.9631))
            .collect();

        let pois = postprocess(points, SITE, 5000.0, PoiCategory::Shop, &settings);
        assert_eq!(pois.len(), settings.per_category_cap);
    }

    #[test]
    fn test_nearest_transit_sentinel() {
        let outcome = PoiQueryOutcome::default();
        assert_eq!(outcome.nearest_transit_m(9999.0), 9999.0);

        let mut with_transit = PoiQueryOutcome::default();
        with_transit.pois.insert(
            PoiCategory::Transit,
            vec![PointOfInterest {
                category: PoiCategory::Transit,
                name: "Stop".into(),
                latitude: -37.81,
                longitude: 144.96,
                distance_m: 240.0,
            }],
        );
        assert_eq!(with_transit.nearest_transit_m(9999.0), 240.0);
    }
}
