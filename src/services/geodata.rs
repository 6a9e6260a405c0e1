use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::GeodataSettings;
use crate::models::{Coordinates, OverlayFlag, ZoneClass};

/// Errors that can occur when querying the external geodata services.
///
/// The resolver catches all of these and treats the tier as empty; they
/// never propagate out of a resolve call.
#[derive(Debug, Error)]
pub enum GeodataError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// A cadastral parcel hit: authoritative area, dimensions when derivable
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    pub area_sqm: f64,
    pub width_m: Option<f64>,
    pub depth_m: Option<f64>,
}

/// A planning-scheme hit: zone classification and overlay flags
#[derive(Debug, Clone, PartialEq)]
pub struct ZoningRecord {
    pub zone: ZoneClass,
    pub overlays: Vec<OverlayFlag>,
}

/// Client for the two authoritative geodata services:
/// a cadastral parcel WFS and a planning-scheme zone query endpoint.
///
/// Each query carries its own bounded timeout so a slow upstream costs at
/// most that tier's budget.
pub struct GeodataClient {
    parcel_url: String,
    zoning_url: String,
    parcel_timeout: Duration,
    zoning_timeout: Duration,
    client: Client,
}

impl GeodataClient {
    pub fn new(settings: &GeodataSettings) -> Self {
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            parcel_url: settings.parcel_url.clone(),
            zoning_url: settings.zoning_url.clone(),
            parcel_timeout: Duration::from_secs(settings.parcel_timeout_secs),
            zoning_timeout: Duration::from_secs(settings.zoning_timeout_secs),
            client,
        }
    }

    /// Query the cadastral parcel intersecting the given point.
    ///
    /// Returns Ok(None) when the service answers but has no parcel there.
    pub async fn query_parcel(
        &self,
        coords: Coordinates,
    ) -> Result<Option<ParcelRecord>, GeodataError> {
        let cql = format!("INTERSECTS(Shape, Point({} {}))", coords.longitude, coords.latitude);
        let url = format!(
            "{}?service=WFS&version=2.0.0&request=GetFeature&typeNames=Cadastral_Parcel&outputFormat=application/json&srsName=EPSG:4326&cql_filter={}",
            self.parcel_url.trim_end_matches('/'),
            urlencoding::encode(&cql)
        );

        tracing::debug!("Querying cadastral parcel at: {}", coords.rounded_key());

        let response = self
            .client
            .get(&url)
            .timeout(self.parcel_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeodataError::ApiError(format!(
                "Parcel query failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let features = json
            .get("features")
            .and_then(|f| f.as_array())
            .ok_or_else(|| GeodataError::InvalidResponse("Missing features array".into()))?;

        let Some(feature) = features.first() else {
            return Ok(None);
        };

        let props = feature.get("properties").cloned().unwrap_or(Value::Null);

        let area_sqm = props
            .get("area")
            .and_then(|a| a.as_f64())
            .filter(|a| *a > 0.0);

        let Some(area_sqm) = area_sqm else {
            return Ok(None);
        };

        // Frontage and depth when the feature carries them; otherwise the
        // resolver derives both from the area
        let width_m = props.get("frontage").and_then(|w| w.as_f64()).filter(|w| *w > 0.0);
        let depth_m = props.get("depth").and_then(|d| d.as_f64()).filter(|d| *d > 0.0);

        Ok(Some(ParcelRecord { area_sqm, width_m, depth_m }))
    }

    /// Query the planning-scheme zone containing the given point.
    ///
    /// Returns Ok(None) when the service answers but has no zone polygon there.
    pub async fn query_zoning(
        &self,
        coords: Coordinates,
    ) -> Result<Option<ZoningRecord>, GeodataError> {
        let geometry = serde_json::json!({ "x": coords.longitude, "y": coords.latitude });

        tracing::debug!("Querying planning zone at: {}", coords.rounded_key());

        let response = self
            .client
            .get(&self.zoning_url)
            .query(&[
                ("f", "json"),
                ("geometry", &geometry.to_string()),
                ("geometryType", "esriGeometryPoint"),
                ("spatialRel", "esriSpatialRelIntersects"),
                ("inSR", "4326"),
                ("outSR", "4326"),
            ])
            .timeout(self.zoning_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeodataError::ApiError(format!(
                "Zoning query failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let features = json
            .get("features")
            .and_then(|f| f.as_array())
            .ok_or_else(|| GeodataError::InvalidResponse("Missing features array".into()))?;

        let Some(feature) = features.first() else {
            return Ok(None);
        };

        let attrs = feature.get("attributes").cloned().unwrap_or(Value::Null);

        let zone_name = attrs
            .get("ZONE_NAME")
            .or_else(|| attrs.get("ZONE_CODE"))
            .and_then(|z| z.as_str())
            .ok_or_else(|| GeodataError::InvalidResponse("Missing zone name".into()))?;

        let overlays = attrs
            .get("OVERLAYS")
            .and_then(|o| o.as_array())
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str())
                    .filter_map(OverlayFlag::from_name)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(ZoningRecord {
            zone: ZoneClass::from_name(zone_name),
            overlays,
        }))
    }
}
