use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::domain::{
    AssessmentRecord, LotResolution, PoiCategory, PointOfInterest, ViabilityScore,
};

/// Response for the full assessment endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessResponse {
    pub record: AssessmentRecord,
    pub pois: BTreeMap<PoiCategory, Vec<PointOfInterest>>,
    /// Categories served from the weekly snapshot instead of live data
    #[serde(rename = "degradedCategories")]
    pub degraded_categories: Vec<PoiCategory>,
}

/// Response for the resolve endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub resolution: LotResolution,
    /// True if any field came from statistical estimation rather than an
    /// authoritative source
    pub estimated: bool,
}

/// Response for the score endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: ViabilityScore,
}

/// Response for the POI query endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiQueryResponse {
    pub pois: BTreeMap<PoiCategory, Vec<PointOfInterest>>,
    #[serde(rename = "degradedCategories")]
    pub degraded_categories: Vec<PoiCategory>,
}

/// Response for the snapshot refresh endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRefreshResponse {
    /// Points persisted per category; categories whose live fetch failed are
    /// reported with their previous snapshot untouched
    pub stored: BTreeMap<PoiCategory, usize>,
    pub failed: Vec<PoiCategory>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
