use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::config::Settings;
use crate::core::scoring::score_assessment;
use crate::core::{ProximityEngine, Resolver};
use crate::models::{
    AssessRequest, AssessResponse, AssessmentRecord, Coordinates, ErrorResponse, HealthResponse,
    PoiQueryRequest, PoiQueryResponse, ResolveRequest, ResolveResponse, ScoreResponse,
    SnapshotRefreshRequest, SnapshotRefreshResponse,
};
use crate::services::SnapshotStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub resolver: Arc<Resolver>,
    pub proximity: Arc<ProximityEngine>,
    pub snapshots: Option<Arc<SnapshotStore>>,
}

/// Configure all assessment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/assess", web::post().to(assess))
        .route("/resolve", web::post().to(resolve))
        .route("/score", web::post().to(score))
        .route("/poi/query", web::post().to(poi_query))
        .route("/poi/snapshot", web::post().to(poi_snapshot));
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    tracing::info!("Request validation failed: {:?}", errors);
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = match &state.snapshots {
        Some(store) => {
            if store.health_check().await.unwrap_or(false) {
                "healthy"
            } else {
                "degraded"
            }
        }
        None => "healthy",
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Full assessment endpoint
///
/// POST /api/v1/assess
///
/// Resolves the lot, gathers nearby POIs, applies user overrides, then
/// scores the record. Transport distance comes from the nearest transit
/// stop unless overridden.
async fn assess(state: web::Data<AppState>, req: web::Json<AssessRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let coords = Coordinates::new(req.latitude, req.longitude);
    let radius_m = req.radius_m.unwrap_or(state.settings.poi.default_radius_m);

    let resolution = state.resolver.resolve(coords).await;
    let outcome = state.proximity.query_all(coords, radius_m).await;

    let mut record = AssessmentRecord::from_resolution(req.address.clone(), coords, &resolution);
    record.transport_distance_m =
        Some(outcome.nearest_transit_m(state.settings.poi.no_transit_distance_m));
    req.overrides.apply_to(&mut record);

    match score_assessment(&record, &state.settings.scoring) {
        Ok(score) => {
            record.score = Some(score);
            HttpResponse::Ok().json(AssessResponse {
                record,
                pois: outcome.pois,
                degraded_categories: outcome.degraded,
            })
        }
        Err(e) => {
            tracing::info!("Assessment not scorable: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: "Scoring failed".to_string(),
                message: e.to_string(),
                status_code: 400,
            })
        }
    }
}

/// Lot resolution endpoint
///
/// POST /api/v1/resolve
async fn resolve(state: web::Data<AppState>, req: web::Json<ResolveRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let coords = Coordinates::new(req.latitude, req.longitude);
    let resolution = state.resolver.resolve(coords).await;
    let estimated = resolution.provenance.any_estimated();

    HttpResponse::Ok().json(ResolveResponse { resolution, estimated })
}

/// Scoring endpoint for an already-populated record
///
/// POST /api/v1/score
async fn score(state: web::Data<AppState>, req: web::Json<AssessmentRecord>) -> impl Responder {
    match score_assessment(&req, &state.settings.scoring) {
        Ok(score) => HttpResponse::Ok().json(ScoreResponse { score }),
        Err(e) => {
            tracing::info!("Record not scorable: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: "Scoring failed".to_string(),
                message: e.to_string(),
                status_code: 400,
            })
        }
    }
}

/// POI query endpoint
///
/// POST /api/v1/poi/query
async fn poi_query(state: web::Data<AppState>, req: web::Json<PoiQueryRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let coords = Coordinates::new(req.latitude, req.longitude);
    let radius_m = req.radius_m.unwrap_or(state.settings.poi.default_radius_m);
    let outcome = state.proximity.query_all(coords, radius_m).await;

    HttpResponse::Ok().json(PoiQueryResponse {
        pois: outcome.pois,
        degraded_categories: outcome.degraded,
    })
}

/// Snapshot refresh endpoint
///
/// POST /api/v1/poi/snapshot
///
/// Fetches every category live around the reference point and persists the
/// raw results for later fallback use.
async fn poi_snapshot(
    state: web::Data<AppState>,
    req: web::Json<SnapshotRefreshRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    if state.snapshots.is_none() {
        return HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "Snapshot store unavailable".to_string(),
            message: "No database configured for POI snapshots".to_string(),
            status_code: 503,
        });
    }

    let coords = Coordinates::new(req.latitude, req.longitude);
    let radius_m = req.radius_m.unwrap_or(state.settings.poi.default_radius_m);
    let (stored, failed) = state.proximity.refresh_snapshots(coords, radius_m).await;

    HttpResponse::Ok().json(SnapshotRefreshResponse { stored, failed })
}
