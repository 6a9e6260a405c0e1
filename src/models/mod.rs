// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AssessmentRecord, BoundingBox, ComplianceChecks, Coordinates, LotResolution, OverlayFlag,
    PoiCategory, PointOfInterest, Provenance, RawPoi, ScoreBreakdown, Source, ViabilityScore,
    ViabilityStatus, ZoneClass,
};
pub use requests::{AssessRequest, PoiQueryRequest, RecordOverrides, ResolveRequest, SnapshotRefreshRequest};
pub use responses::{
    AssessResponse, ErrorResponse, HealthResponse, PoiQueryResponse, ResolveResponse,
    ScoreResponse, SnapshotRefreshResponse,
};
