use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A coordinate pair in decimal degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Coordinate key rounded to 4 decimal degrees (~11m grid).
    ///
    /// All cache entries for a site are keyed on this, so two queries for
    /// near-identical coordinates share one cached payload.
    pub fn rounded_key(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Base planning zone classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoneClass {
    ResidentialGrowth,
    GeneralResidential,
    NeighbourhoodResidential,
    MixedUse,
    LowDensityResidential,
    Unclassified,
}

impl ZoneClass {
    /// Map a free-text zone name from an upstream planning service onto a
    /// classification. Upstream names vary ("General Residential Zone",
    /// "GRZ1", ...), so matching is case-insensitive and substring-based.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("growth") || lower.contains("rgz") {
            ZoneClass::ResidentialGrowth
        } else if lower.contains("general residential") || lower.contains("grz") {
            ZoneClass::GeneralResidential
        } else if lower.contains("neighbourhood") || lower.contains("nrz") {
            ZoneClass::NeighbourhoodResidential
        } else if lower.contains("mixed use") || lower.contains("muz") {
            ZoneClass::MixedUse
        } else if lower.contains("low density") || lower.contains("ldrz") {
            ZoneClass::LowDensityResidential
        } else {
            ZoneClass::Unclassified
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ZoneClass::ResidentialGrowth => "Residential Growth Zone",
            ZoneClass::GeneralResidential => "General Residential Zone",
            ZoneClass::NeighbourhoodResidential => "Neighbourhood Residential Zone",
            ZoneClass::MixedUse => "Mixed Use Zone",
            ZoneClass::LowDensityResidential => "Low Density Residential Zone",
            ZoneClass::Unclassified => "Unclassified",
        }
    }
}

/// Planning-scheme overlay layered on top of the base zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayFlag {
    Heritage,
    NeighbourhoodCharacter,
    None,
}

impl OverlayFlag {
    /// True if any flag in the set restricts conversion use
    pub fn any_restrictive(flags: &[OverlayFlag]) -> bool {
        flags.iter().any(|f| *f != OverlayFlag::None)
    }

    /// Map an overlay name from an upstream service onto a flag
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.contains("heritage") {
            Some(OverlayFlag::Heritage)
        } else if lower.contains("character") {
            Some(OverlayFlag::NeighbourhoodCharacter)
        } else {
            None
        }
    }
}

/// Named boolean compliance checks against building standards.
///
/// Absent checks deserialize to false (not met); the scorer never errors on
/// these, they only ever reduce the compliance sub-score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceChecks {
    #[serde(default)]
    pub heating: bool,
    #[serde(default)]
    pub windows: bool,
    #[serde(default)]
    pub energy: bool,
}

impl ComplianceChecks {
    pub const COUNT: usize = 3;

    pub fn met_count(&self) -> usize {
        [self.heating, self.windows, self.energy]
            .iter()
            .filter(|c| **c)
            .count()
    }
}

/// Which tier or actor supplied a resolved field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Cadastral,
    PlanningScheme,
    Estimated,
    UserOverride,
}

/// Per-field provenance for a lot resolution.
///
/// Downstream consumers use this to flag estimated (tier-4) values to the
/// end user instead of presenting them as authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub zone: Source,
    pub overlays: Source,
    #[serde(rename = "lotWidth")]
    pub lot_width: Source,
    #[serde(rename = "lotDepth")]
    pub lot_depth: Source,
    #[serde(rename = "lotArea")]
    pub lot_area: Source,
}

impl Provenance {
    /// True if any field was filled by statistical estimation
    pub fn any_estimated(&self) -> bool {
        [self.zone, self.overlays, self.lot_width, self.lot_depth, self.lot_area]
            .iter()
            .any(|s| *s == Source::Estimated)
    }
}

/// Fully resolved zoning and lot data for a coordinate.
///
/// Every field is populated; the resolver degrades to estimation rather
/// than returning gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotResolution {
    pub zone: ZoneClass,
    pub overlays: Vec<OverlayFlag>,
    #[serde(rename = "lotWidthM")]
    pub lot_width_m: f64,
    #[serde(rename = "lotDepthM")]
    pub lot_depth_m: f64,
    #[serde(rename = "lotAreaSqm")]
    pub lot_area_sqm: f64,
    pub provenance: Provenance,
    #[serde(rename = "resolvedAt")]
    pub resolved_at: DateTime<Utc>,
}

/// Tri-state viability verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViabilityStatus {
    Suitable,
    Conditional,
    Unsuitable,
}

/// Unweighted sub-scores, each on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub zone: f64,
    pub transport: f64,
    pub physical: f64,
    pub compliance: f64,
}

/// Scorer output: weighted total, per-category breakdown, verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViabilityScore {
    pub total: f64,
    pub breakdown: ScoreBreakdown,
    pub status: ViabilityStatus,
}

/// The unit of work: one parcel assessment.
///
/// Created when a coordinate is resolved, mutated by front-end overrides and
/// by the scorer. Score, breakdown and status are always recomputed, never
/// carried over stale from a previous version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub address: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub zone: Option<ZoneClass>,
    #[serde(default)]
    pub overlays: Vec<OverlayFlag>,
    #[serde(rename = "lotWidthM", default)]
    pub lot_width_m: Option<f64>,
    #[serde(rename = "lotDepthM", default)]
    pub lot_depth_m: Option<f64>,
    #[serde(rename = "lotAreaSqm", default)]
    pub lot_area_sqm: Option<f64>,
    #[serde(rename = "transportDistanceM", default)]
    pub transport_distance_m: Option<f64>,
    #[serde(default)]
    pub compliance: ComplianceChecks,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub score: Option<ViabilityScore>,
    #[serde(default)]
    pub provenance: Option<Provenance>,
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl AssessmentRecord {
    /// Build a record from a resolver result, before any user overrides
    pub fn from_resolution(
        address: String,
        coordinates: Coordinates,
        resolution: &LotResolution,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            coordinates,
            zone: Some(resolution.zone),
            overlays: resolution.overlays.clone(),
            lot_width_m: Some(resolution.lot_width_m),
            lot_depth_m: Some(resolution.lot_depth_m),
            lot_area_sqm: Some(resolution.lot_area_sqm),
            transport_distance_m: None,
            compliance: ComplianceChecks::default(),
            notes: None,
            score: None,
            provenance: Some(resolution.provenance),
            created_at: Utc::now(),
        }
    }
}

/// Point-of-interest category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    Transit,
    School,
    Park,
    Shop,
    Heritage,
}

impl PoiCategory {
    pub const ALL: [PoiCategory; 5] = [
        PoiCategory::Transit,
        PoiCategory::School,
        PoiCategory::Park,
        PoiCategory::Shop,
        PoiCategory::Heritage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoiCategory::Transit => "transit",
            PoiCategory::School => "school",
            PoiCategory::Park => "park",
            PoiCategory::Shop => "shop",
            PoiCategory::Heritage => "heritage",
        }
    }
}

impl std::fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point of interest as returned by a live source or snapshot.
///
/// Only name and position are ever persisted; distance is always computed
/// against the current query site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoi {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A categorized point of interest with its distance from the query site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub category: PoiCategory,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "distanceM")]
    pub distance_m: f64,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}
