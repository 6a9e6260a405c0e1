use thiserror::Error;

use crate::config::ScoringSettings;
use crate::models::{
    AssessmentRecord, OverlayFlag, ScoreBreakdown, ViabilityScore, ViabilityStatus,
};

/// Errors raised when a record cannot be scored.
///
/// These are the only errors in the core that surface to the caller; a
/// missing required field is never silently substituted with zero.
#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("field {field} out of domain: {value}")]
    OutOfDomain { field: &'static str, value: f64 },
}

/// Score an assessment record (0-100) against the configured criteria.
///
/// Weighted categories:
/// - Zone: 40% (overlays clamp to the floor, a hard constraint)
/// - Transport: 25% (piecewise linear against the catchment distance)
/// - Physical: 25% (width/depth/area vs minimums, independent partial credit)
/// - Compliance: 10% (fraction of confirmed building-standard checks)
pub fn score_assessment(
    record: &AssessmentRecord,
    cfg: &ScoringSettings,
) -> Result<ViabilityScore, ScoringError> {
    let zone = record.zone.ok_or(ScoringError::MissingField("zone"))?;
    let transport_m = record
        .transport_distance_m
        .ok_or(ScoringError::MissingField("transportDistanceM"))?;
    let width = record.lot_width_m.ok_or(ScoringError::MissingField("lotWidthM"))?;
    let depth = record.lot_depth_m.ok_or(ScoringError::MissingField("lotDepthM"))?;
    let area = record.lot_area_sqm.ok_or(ScoringError::MissingField("lotAreaSqm"))?;

    let breakdown = ScoreBreakdown {
        zone: zone_subscore(zone, &record.overlays, cfg),
        transport: transport_subscore(transport_m, cfg)?,
        physical: physical_subscore(width, depth, area, cfg)?,
        compliance: compliance_subscore(record),
    };

    let weighted = breakdown.zone * cfg.weights.zone
        + breakdown.transport * cfg.weights.transport
        + breakdown.physical * cfg.weights.physical
        + breakdown.compliance * cfg.weights.compliance;

    // Round to one decimal place; banding applies to the rounded total
    let total = (weighted.clamp(0.0, 100.0) * 10.0).round() / 10.0;

    Ok(ViabilityScore {
        total,
        breakdown,
        status: status_for(total, cfg),
    })
}

/// Zone sub-score (0-100): base desirability from the lookup table, clamped
/// to the floor when any restrictive overlay is present
#[inline]
pub fn zone_subscore(
    zone: crate::models::ZoneClass,
    overlays: &[OverlayFlag],
    cfg: &ScoringSettings,
) -> f64 {
    if OverlayFlag::any_restrictive(overlays) {
        return cfg.overlay_floor;
    }
    cfg.zone_scores.base_score(zone)
}

/// Transport sub-score (0-100): full marks at 0m, zero at or beyond the
/// catchment, linear in between. Monotonically non-increasing in distance.
#[inline]
pub fn transport_subscore(distance_m: f64, cfg: &ScoringSettings) -> Result<f64, ScoringError> {
    if distance_m < 0.0 {
        return Err(ScoringError::OutOfDomain { field: "transportDistanceM", value: distance_m });
    }

    let fraction = 1.0 - distance_m / cfg.transport_catchment_m;
    Ok(fraction.clamp(0.0, 1.0) * 100.0)
}

/// Physical sub-score (0-100): width, depth and area each contribute a third.
/// A dimension at or above its minimum earns its full third; below it the
/// credit is proportional, so deductions are independent, not multiplicative.
#[inline]
pub fn physical_subscore(
    width_m: f64,
    depth_m: f64,
    area_sqm: f64,
    cfg: &ScoringSettings,
) -> Result<f64, ScoringError> {
    if width_m < 0.0 {
        return Err(ScoringError::OutOfDomain { field: "lotWidthM", value: width_m });
    }
    if depth_m < 0.0 {
        return Err(ScoringError::OutOfDomain { field: "lotDepthM", value: depth_m });
    }
    if area_sqm < 0.0 {
        return Err(ScoringError::OutOfDomain { field: "lotAreaSqm", value: area_sqm });
    }

    let credit = |value: f64, min: f64| (value / min).min(1.0);

    let score = (credit(width_m, cfg.min_lot_width_m)
        + credit(depth_m, cfg.min_lot_depth_m)
        + credit(area_sqm, cfg.min_lot_area_sqm))
        / 3.0
        * 100.0;

    Ok(score)
}

/// Compliance sub-score (0-100): proportion of the named checks confirmed
#[inline]
pub fn compliance_subscore(record: &AssessmentRecord) -> f64 {
    record.compliance.met_count() as f64 / crate::models::ComplianceChecks::COUNT as f64 * 100.0
}

/// Band the rounded total into a verdict (inclusive lower bounds)
#[inline]
pub fn status_for(total: f64, cfg: &ScoringSettings) -> ViabilityStatus {
    if total >= cfg.suitable_min {
        ViabilityStatus::Suitable
    } else if total >= cfg.conditional_min {
        ViabilityStatus::Conditional
    } else {
        ViabilityStatus::Unsuitable
    }
}
