pub mod distance;
pub mod proximity;
pub mod resolver;
pub mod scoring;

pub use proximity::{PoiQueryOutcome, ProximityEngine};
pub use resolver::Resolver;
pub use scoring::{score_assessment, ScoringError};
