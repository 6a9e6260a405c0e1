use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::ZoneClass;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub geodata: GeodataSettings,
    #[serde(default)]
    pub poi: PoiSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub estimation: EstimationSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), workers: None }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Endpoints and timeouts for the authoritative geodata services
#[derive(Debug, Clone, Deserialize)]
pub struct GeodataSettings {
    /// Cadastral parcel WFS endpoint
    #[serde(default = "default_parcel_url")]
    pub parcel_url: String,
    /// Planning-scheme zoning query endpoint
    #[serde(default = "default_zoning_url")]
    pub zoning_url: String,
    #[serde(default = "default_parcel_timeout")]
    pub parcel_timeout_secs: u64,
    #[serde(default = "default_zoning_timeout")]
    pub zoning_timeout_secs: u64,
}

impl Default for GeodataSettings {
    fn default() -> Self {
        Self {
            parcel_url: default_parcel_url(),
            zoning_url: default_zoning_url(),
            parcel_timeout_secs: default_parcel_timeout(),
            zoning_timeout_secs: default_zoning_timeout(),
        }
    }
}

fn default_parcel_url() -> String {
    "https://services.land.vic.gov.au/catalogue/publicproxy/wfs".to_string()
}
fn default_zoning_url() -> String {
    "https://services.land.vic.gov.au/catalogue/publicproxy/arcgis/rest/services/Planning/VIC_PLANNING_SCHEME_ZONES/FeatureServer/0/query".to_string()
}
fn default_parcel_timeout() -> u64 { 5 }
fn default_zoning_timeout() -> u64 { 3 }

/// POI source endpoint and proximity engine tunables
#[derive(Debug, Clone, Deserialize)]
pub struct PoiSettings {
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
    #[serde(default = "default_poi_timeout")]
    pub timeout_secs: u64,
    /// Default search radius in meters when a request does not specify one
    #[serde(default = "default_poi_radius")]
    pub default_radius_m: f64,
    /// Maximum entries kept per category after dedup and sort
    #[serde(default = "default_poi_cap")]
    pub per_category_cap: usize,
    /// Two same-category POIs closer than this with matching names collapse
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold_m: f64,
    /// Sentinel transport distance when no transit stop is found in radius;
    /// beyond the catchment, so it scores zero rather than erroring
    #[serde(default = "default_no_transit_distance")]
    pub no_transit_distance_m: f64,
}

impl Default for PoiSettings {
    fn default() -> Self {
        Self {
            overpass_url: default_overpass_url(),
            timeout_secs: default_poi_timeout(),
            default_radius_m: default_poi_radius(),
            per_category_cap: default_poi_cap(),
            dedup_threshold_m: default_dedup_threshold(),
            no_transit_distance_m: default_no_transit_distance(),
        }
    }
}

fn default_overpass_url() -> String { "https://overpass-api.de/api/interpreter".to_string() }
fn default_poi_timeout() -> u64 { 10 }
fn default_poi_radius() -> f64 { 1000.0 }
fn default_poi_cap() -> usize { 15 }
fn default_dedup_threshold() -> f64 { 30.0 }
fn default_no_transit_distance() -> f64 { 9999.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Optional Redis L2; the service runs with L1 only when unset
    pub redis_url: Option<String>,
    #[serde(default = "default_l1_size")]
    pub l1_cache_size: u64,
    /// Geodata resolutions expire after this many seconds (7 days)
    #[serde(default = "default_geodata_ttl")]
    pub geodata_ttl_secs: u64,
    /// Live POI query results expire after this many seconds (7 days)
    #[serde(default = "default_poi_ttl")]
    pub poi_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            l1_cache_size: default_l1_size(),
            geodata_ttl_secs: default_geodata_ttl(),
            poi_ttl_secs: default_poi_ttl(),
        }
    }
}

fn default_l1_size() -> u64 { 1000 }
fn default_geodata_ttl() -> u64 { 7 * 24 * 3600 }
fn default_poi_ttl() -> u64 { 7 * 24 * 3600 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    /// Postgres URL for the POI snapshot store; snapshot fallback is
    /// disabled when unset
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// Statistical tier-estimation table: representative lot geometry by
/// distance band from the regional CBD reference point
#[derive(Debug, Clone, Deserialize)]
pub struct EstimationSettings {
    #[serde(default = "default_cbd_lat")]
    pub cbd_latitude: f64,
    #[serde(default = "default_cbd_lon")]
    pub cbd_longitude: f64,
    /// Sites closer than this to the CBD fall in the inner band (km)
    #[serde(default = "default_inner_radius_km")]
    pub inner_radius_km: f64,
    /// Sites closer than this (but outside inner) fall in the middle band (km)
    #[serde(default = "default_middle_radius_km")]
    pub middle_radius_km: f64,
    #[serde(default = "default_inner_tier")]
    pub inner: TierProfile,
    #[serde(default = "default_middle_tier")]
    pub middle: TierProfile,
    #[serde(default = "default_outer_tier")]
    pub outer: TierProfile,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            cbd_latitude: default_cbd_lat(),
            cbd_longitude: default_cbd_lon(),
            inner_radius_km: default_inner_radius_km(),
            middle_radius_km: default_middle_radius_km(),
            inner: default_inner_tier(),
            middle: default_middle_tier(),
            outer: default_outer_tier(),
        }
    }
}

/// Representative lot geometry for one distance band
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TierProfile {
    pub lot_area_sqm: f64,
    /// depth = width * ratio
    pub depth_ratio: f64,
    pub default_zone: ZoneClass,
}

fn default_cbd_lat() -> f64 { -37.8136 }
fn default_cbd_lon() -> f64 { 144.9631 }
fn default_inner_radius_km() -> f64 { 5.0 }
fn default_middle_radius_km() -> f64 { 10.0 }
fn default_inner_tier() -> TierProfile {
    TierProfile { lot_area_sqm: 520.0, depth_ratio: 1.6, default_zone: ZoneClass::ResidentialGrowth }
}
fn default_middle_tier() -> TierProfile {
    TierProfile { lot_area_sqm: 700.0, depth_ratio: 1.7, default_zone: ZoneClass::GeneralResidential }
}
fn default_outer_tier() -> TierProfile {
    TierProfile { lot_area_sqm: 950.0, depth_ratio: 1.7, default_zone: ZoneClass::NeighbourhoodResidential }
}

/// Scoring weights, thresholds and banding; all jurisdictionally retunable
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub zone_scores: ZoneScoreTable,
    /// Zone sub-score when any restrictive overlay is present; a hard
    /// constraint, not an averaged penalty
    #[serde(default = "default_overlay_floor")]
    pub overlay_floor: f64,
    /// Transport sub-score hits zero at and beyond this distance
    #[serde(default = "default_transport_catchment")]
    pub transport_catchment_m: f64,
    #[serde(default = "default_min_lot_width")]
    pub min_lot_width_m: f64,
    #[serde(default = "default_min_lot_depth")]
    pub min_lot_depth_m: f64,
    #[serde(default = "default_min_lot_area")]
    pub min_lot_area_sqm: f64,
    /// Inclusive lower bound of the suitable band
    #[serde(default = "default_suitable_min")]
    pub suitable_min: f64,
    /// Inclusive lower bound of the conditional band
    #[serde(default = "default_conditional_min")]
    pub conditional_min: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: WeightsConfig::default(),
            zone_scores: ZoneScoreTable::default(),
            overlay_floor: default_overlay_floor(),
            transport_catchment_m: default_transport_catchment(),
            min_lot_width_m: default_min_lot_width(),
            min_lot_depth_m: default_min_lot_depth(),
            min_lot_area_sqm: default_min_lot_area(),
            suitable_min: default_suitable_min(),
            conditional_min: default_conditional_min(),
        }
    }
}

fn default_overlay_floor() -> f64 { 0.0 }
fn default_transport_catchment() -> f64 { 800.0 }
fn default_min_lot_width() -> f64 { 14.0 }
fn default_min_lot_depth() -> f64 { 24.0 }
fn default_min_lot_area() -> f64 { 336.0 }
fn default_suitable_min() -> f64 { 75.0 }
fn default_conditional_min() -> f64 { 50.0 }

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_zone_weight")]
    pub zone: f64,
    #[serde(default = "default_transport_weight")]
    pub transport: f64,
    #[serde(default = "default_physical_weight")]
    pub physical: f64,
    #[serde(default = "default_compliance_weight")]
    pub compliance: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            zone: default_zone_weight(),
            transport: default_transport_weight(),
            physical: default_physical_weight(),
            compliance: default_compliance_weight(),
        }
    }
}

impl WeightsConfig {
    pub fn sum(&self) -> f64 {
        self.zone + self.transport + self.physical + self.compliance
    }
}

fn default_zone_weight() -> f64 { 0.40 }
fn default_transport_weight() -> f64 { 0.25 }
fn default_physical_weight() -> f64 { 0.25 }
fn default_compliance_weight() -> f64 { 0.10 }

/// Base desirability score (0-100) per zone classification
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ZoneScoreTable {
    #[serde(default = "default_rgz_score")]
    pub residential_growth: f64,
    #[serde(default = "default_grz_score")]
    pub general_residential: f64,
    #[serde(default = "default_muz_score")]
    pub mixed_use: f64,
    #[serde(default = "default_nrz_score")]
    pub neighbourhood_residential: f64,
    #[serde(default = "default_ldrz_score")]
    pub low_density_residential: f64,
    #[serde(default = "default_unclassified_score")]
    pub unclassified: f64,
}

impl Default for ZoneScoreTable {
    fn default() -> Self {
        Self {
            residential_growth: default_rgz_score(),
            general_residential: default_grz_score(),
            mixed_use: default_muz_score(),
            neighbourhood_residential: default_nrz_score(),
            low_density_residential: default_ldrz_score(),
            unclassified: default_unclassified_score(),
        }
    }
}

impl ZoneScoreTable {
    pub fn base_score(&self, zone: ZoneClass) -> f64 {
        match zone {
            ZoneClass::ResidentialGrowth => self.residential_growth,
            ZoneClass::GeneralResidential => self.general_residential,
            ZoneClass::MixedUse => self.mixed_use,
            ZoneClass::NeighbourhoodResidential => self.neighbourhood_residential,
            ZoneClass::LowDensityResidential => self.low_density_residential,
            ZoneClass::Unclassified => self.unclassified,
        }
    }
}

fn default_rgz_score() -> f64 { 100.0 }
fn default_grz_score() -> f64 { 90.0 }
fn default_muz_score() -> f64 { 80.0 }
fn default_nrz_score() -> f64 { 55.0 }
fn default_ldrz_score() -> f64 { 40.0 }
fn default_unclassified_score() -> f64 { 40.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with PARCEL__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with PARCEL__)
            // e.g., PARCEL__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("PARCEL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PARCEL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Substitute well-known environment variables into config values.
/// DATABASE_URL and REDIS_URL are checked before their PARCEL__-prefixed forms.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("PARCEL__DATABASE__URL"))
        .ok();

    let redis_url = env::var("REDIS_URL")
        .or_else(|_| env::var("PARCEL__CACHE__REDIS_URL"))
        .ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = database_url {
        builder = builder.set_override("database.url", url)?;
    }
    if let Some(url) = redis_url {
        builder = builder.set_override("cache.redis_url", url)?;
    }

    builder.build()
}
