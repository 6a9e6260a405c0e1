use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::{EstimationSettings, TierProfile};
use crate::core::distance::haversine_distance_m;
use crate::models::{Coordinates, LotResolution, OverlayFlag, Provenance, Source, ZoneClass};
use crate::services::cache::{CacheKey, CacheManager};
use crate::services::geodata::GeodataClient;

/// Accumulator for the tiered resolution cascade.
///
/// Each tier fills only the fields that are still empty, recording where
/// every value came from. `finish` closes remaining gaps with estimation,
/// so the output is always complete.
#[derive(Debug, Default)]
struct ResolutionDraft {
    zone: Option<(ZoneClass, Source)>,
    overlays: Option<(Vec<OverlayFlag>, Source)>,
    lot_width_m: Option<(f64, Source)>,
    lot_depth_m: Option<(f64, Source)>,
    lot_area_sqm: Option<(f64, Source)>,
}

impl ResolutionDraft {
    fn set_zone(&mut self, zone: ZoneClass, source: Source) {
        if self.zone.is_none() {
            self.zone = Some((zone, source));
        }
    }

    fn set_overlays(&mut self, overlays: Vec<OverlayFlag>, source: Source) {
        if self.overlays.is_none() {
            self.overlays = Some((overlays, source));
        }
    }

    fn set_width(&mut self, width_m: f64, source: Source) {
        if self.lot_width_m.is_none() {
            self.lot_width_m = Some((width_m, source));
        }
    }

    fn set_depth(&mut self, depth_m: f64, source: Source) {
        if self.lot_depth_m.is_none() {
            self.lot_depth_m = Some((depth_m, source));
        }
    }

    fn set_area(&mut self, area_sqm: f64, source: Source) {
        if self.lot_area_sqm.is_none() {
            self.lot_area_sqm = Some((area_sqm, source));
        }
    }

    /// Fill every remaining gap from the tier profile and produce the
    /// final resolution
    fn finish(mut self, coords: Coordinates, settings: &EstimationSettings) -> LotResolution {
        let profile = tier_profile(coords, settings);

        // If the cadastre gave us a real area, derive missing dimensions
        // from it instead of the tier default. With one real dimension the
        // other follows directly from area / known; only when both are
        // missing do we fall back to the tier's depth:width ratio.
        let area_for_dims = self
            .lot_area_sqm
            .map(|(a, _)| a)
            .unwrap_or(profile.lot_area_sqm);
        match (self.lot_width_m, self.lot_depth_m) {
            (Some((width, _)), None) if width > 0.0 => {
                self.set_depth(area_for_dims / width, Source::Estimated);
            }
            (None, Some((depth, _))) if depth > 0.0 => {
                self.set_width(area_for_dims / depth, Source::Estimated);
            }
            _ => {}
        }
        let (est_width, est_depth) = rectangle_from_area(area_for_dims, profile.depth_ratio);

        self.set_zone(profile.default_zone, Source::Estimated);
        self.set_overlays(Vec::new(), Source::Estimated);
        self.set_area(profile.lot_area_sqm, Source::Estimated);
        self.set_width(est_width, Source::Estimated);
        self.set_depth(est_depth, Source::Estimated);

        let (zone, zone_src) = self.zone.unwrap_or((ZoneClass::Unclassified, Source::Estimated));
        let (overlays, overlays_src) = self.overlays.unwrap_or((Vec::new(), Source::Estimated));
        let (lot_width_m, width_src) = self.lot_width_m.unwrap_or((est_width, Source::Estimated));
        let (lot_depth_m, depth_src) = self.lot_depth_m.unwrap_or((est_depth, Source::Estimated));
        let (lot_area_sqm, area_src) =
            self.lot_area_sqm.unwrap_or((profile.lot_area_sqm, Source::Estimated));

        LotResolution {
            zone,
            overlays,
            lot_width_m,
            lot_depth_m,
            lot_area_sqm,
            provenance: Provenance {
                zone: zone_src,
                overlays: overlays_src,
                lot_width: width_src,
                lot_depth: depth_src,
                lot_area: area_src,
            },
            resolved_at: Utc::now(),
        }
    }
}

/// Pick the tier profile for a coordinate by its distance from the CBD
pub fn tier_profile(coords: Coordinates, settings: &EstimationSettings) -> &TierProfile {
    let distance_km = haversine_distance_m(
        coords.latitude,
        coords.longitude,
        settings.cbd_latitude,
        settings.cbd_longitude,
    ) / 1000.0;

    if distance_km < settings.inner_radius_km {
        &settings.inner
    } else if distance_km < settings.middle_radius_km {
        &settings.middle
    } else {
        &settings.outer
    }
}

/// Dimensions of a rectangle with the given area and depth:width ratio
pub fn rectangle_from_area(area_sqm: f64, depth_ratio: f64) -> (f64, f64) {
    let width = (area_sqm / depth_ratio).sqrt();
    (width, width * depth_ratio)
}

/// Typical lot attributes for a coordinate, used when no authoritative
/// source answered
pub fn estimate_by_tier(coords: Coordinates, settings: &EstimationSettings) -> LotResolution {
    ResolutionDraft::default().finish(coords, settings)
}

/// Multi-tier lot attribute resolver.
///
/// Tries, in order: cache, cadastral parcel query, planning scheme zoning
/// query, statistical estimation. Resolution itself never fails; upstream
/// errors just push individual fields down the cascade.
pub struct Resolver {
    geodata: GeodataClient,
    cache: Arc<CacheManager>,
    estimation: EstimationSettings,
    cache_ttl: Duration,
}

impl Resolver {
    pub fn new(
        geodata: GeodataClient,
        cache: Arc<CacheManager>,
        estimation: EstimationSettings,
        cache_ttl: Duration,
    ) -> Self {
        Self { geodata, cache, estimation, cache_ttl }
    }

    /// Resolve zoning and lot attributes for a coordinate
    pub async fn resolve(&self, coords: Coordinates) -> LotResolution {
        let cache_key = CacheKey::geodata(&coords);

        if let Some(cached) = self.cache.get_fresh::<LotResolution>(&cache_key, self.cache_ttl).await {
            tracing::debug!("Resolution cache hit for {}", coords.rounded_key());
            return cached;
        }

        let mut draft = ResolutionDraft::default();

        match self.geodata.query_parcel(coords).await {
            Ok(Some(parcel)) => {
                draft.set_area(parcel.area_sqm, Source::Cadastral);
                if let Some(width) = parcel.width_m {
                    draft.set_width(width, Source::Cadastral);
                }
                if let Some(depth) = parcel.depth_m {
                    draft.set_depth(depth, Source::Cadastral);
                }
            }
            Ok(None) => {
                tracing::debug!("No cadastral parcel at {}", coords.rounded_key());
            }
            Err(e) => {
                tracing::warn!("Cadastral query failed for {}: {}", coords.rounded_key(), e);
            }
        }

        match self.geodata.query_zoning(coords).await {
            Ok(Some(zoning)) => {
                draft.set_zone(zoning.zone, Source::PlanningScheme);
                draft.set_overlays(zoning.overlays, Source::PlanningScheme);
            }
            Ok(None) => {
                tracing::debug!("No zoning record at {}", coords.rounded_key());
            }
            Err(e) => {
                tracing::warn!("Zoning query failed for {}: {}", coords.rounded_key(), e);
            }
        }

        let resolution = draft.finish(coords, &self.estimation);
        self.cache.put(&cache_key, &resolution, self.cache_ttl).await;
        resolution
    }
}
