use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{AssessmentRecord, ComplianceChecks, OverlayFlag, Source, ZoneClass};

/// Request to run a full assessment for a geocoded address
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssessRequest {
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// POI search radius in meters; defaults to the configured radius
    #[serde(rename = "radiusM")]
    #[validate(range(min = 1.0, max = 50000.0))]
    pub radius_m: Option<f64>,
    /// User-edited fields from the front-end; these win over resolver output
    #[serde(default)]
    pub overrides: RecordOverrides,
}

/// Fields a user may correct manually in the front-end.
///
/// Any field set here overrides the resolver-derived value of the same name
/// and is marked with user-override provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordOverrides {
    #[serde(default)]
    pub zone: Option<ZoneClass>,
    #[serde(default)]
    pub overlays: Option<Vec<OverlayFlag>>,
    #[serde(rename = "lotWidthM", default)]
    pub lot_width_m: Option<f64>,
    #[serde(rename = "lotDepthM", default)]
    pub lot_depth_m: Option<f64>,
    #[serde(rename = "lotAreaSqm", default)]
    pub lot_area_sqm: Option<f64>,
    #[serde(rename = "transportDistanceM", default)]
    pub transport_distance_m: Option<f64>,
    #[serde(default)]
    pub compliance: Option<ComplianceChecks>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecordOverrides {
    /// Write the user-edited fields onto a record, marking each touched
    /// field's provenance as a user override
    pub fn apply_to(&self, record: &mut AssessmentRecord) {
        if let Some(zone) = self.zone {
            record.zone = Some(zone);
            if let Some(p) = record.provenance.as_mut() {
                p.zone = Source::UserOverride;
            }
        }
        if let Some(overlays) = &self.overlays {
            record.overlays = overlays.clone();
            if let Some(p) = record.provenance.as_mut() {
                p.overlays = Source::UserOverride;
            }
        }
        if let Some(width) = self.lot_width_m {
            record.lot_width_m = Some(width);
            if let Some(p) = record.provenance.as_mut() {
                p.lot_width = Source::UserOverride;
            }
        }
        if let Some(depth) = self.lot_depth_m {
            record.lot_depth_m = Some(depth);
            if let Some(p) = record.provenance.as_mut() {
                p.lot_depth = Source::UserOverride;
            }
        }
        if let Some(area) = self.lot_area_sqm {
            record.lot_area_sqm = Some(area);
            if let Some(p) = record.provenance.as_mut() {
                p.lot_area = Source::UserOverride;
            }
        }
        if let Some(distance) = self.transport_distance_m {
            record.transport_distance_m = Some(distance);
        }
        if let Some(compliance) = self.compliance {
            record.compliance = compliance;
        }
        if let Some(notes) = &self.notes {
            record.notes = Some(notes.clone());
        }
    }
}

/// Request to resolve zoning and lot attributes for a coordinate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Request to query nearby points of interest
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PoiQueryRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 1.0, max = 50000.0))]
    #[serde(rename = "radiusM")]
    pub radius_m: Option<f64>,
}

/// Request to refresh the persisted weekly POI snapshot around a reference point
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SnapshotRefreshRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 1.0, max = 50000.0))]
    #[serde(rename = "radiusM")]
    pub radius_m: Option<f64>,
}
