mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use config::Settings;
use core::{ProximityEngine, Resolver};
use routes::assess::AppState;
use services::{CacheManager, GeodataClient, PoiClient, SnapshotStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap_or_default())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration first so the [logging] section can drive the
    // subscriber; RUST_LOG still wins over the configured level
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level)),
        )
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting parcelscore assessment service...");
    info!("Configuration loaded successfully");

    // Initialize cache manager: Redis L2 if configured, L1-only otherwise
    let l1_cache_size = settings.cache.l1_cache_size;
    let cache = match &settings.cache.redis_url {
        Some(url) => match CacheManager::with_redis(url, l1_cache_size).await {
            Ok(c) => {
                info!("Cache manager initialized with Redis (L1: {} entries)", l1_cache_size);
                Arc::new(c)
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), running with in-process cache only", e);
                Arc::new(CacheManager::in_memory(l1_cache_size))
            }
        },
        None => {
            info!("No Redis configured, running with in-process cache only");
            Arc::new(CacheManager::in_memory(l1_cache_size))
        }
    };

    // Initialize the snapshot store (optional - POI fallback degrades without it)
    let snapshots = match &settings.database.url {
        Some(url) => match SnapshotStore::from_settings(
            url,
            settings.database.max_connections,
            settings.database.min_connections,
        )
        .await
        {
            Ok(store) => {
                info!("Snapshot store initialized");
                Some(Arc::new(store))
            }
            Err(e) => {
                warn!("Failed to connect to PostgreSQL ({}), POI snapshot fallback disabled", e);
                None
            }
        },
        None => {
            info!("No database configured, POI snapshot fallback disabled");
            None
        }
    };

    // Initialize the resolver and proximity engine
    let resolver = Arc::new(Resolver::new(
        GeodataClient::new(&settings.geodata),
        cache.clone(),
        settings.estimation.clone(),
        Duration::from_secs(settings.cache.geodata_ttl_secs),
    ));

    let proximity = Arc::new(ProximityEngine::new(
        PoiClient::new(&settings.poi),
        cache.clone(),
        snapshots.clone(),
        settings.poi.clone(),
        Duration::from_secs(settings.cache.poi_ttl_secs),
    ));

    info!(
        "Scoring weights: zone={} transport={} physical={} compliance={}",
        settings.scoring.weights.zone,
        settings.scoring.weights.transport,
        settings.scoring.weights.physical,
        settings.scoring.weights.compliance,
    );

    // Build application state
    let settings = Arc::new(settings);
    let app_state = AppState {
        settings: settings.clone(),
        resolver,
        proximity,
        snapshots,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
