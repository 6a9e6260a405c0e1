//! Parcelscore - Site viability assessment service for residential conversions
//!
//! This library resolves zoning and lot attributes for a coordinate, gathers
//! nearby points of interest, and scores the resulting assessment record on
//! a weighted 0-100 viability scale.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    distance::{calculate_bounding_box, haversine_distance_m},
    proximity::ProximityEngine,
    resolver::Resolver,
    scoring::score_assessment,
};
pub use models::{AssessmentRecord, Coordinates, LotResolution, ViabilityScore, ViabilityStatus};
