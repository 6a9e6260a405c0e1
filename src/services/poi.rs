use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::PoiSettings;
use crate::core::distance::calculate_bounding_box;
use crate::models::{Coordinates, PoiCategory, RawPoi};

/// Errors from the live POI data source.
///
/// The proximity engine recovers from all of these via the weekly snapshot;
/// a category's failure never surfaces out of a query call.
#[derive(Debug, Error)]
pub enum PoiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Client for an Overpass-style POI data source.
///
/// One query per category, each scoped to a bounding box around the site
/// and bounded by the configured timeout.
pub struct PoiClient {
    endpoint: String,
    timeout: Duration,
    client: Client,
}

impl PoiClient {
    pub fn new(settings: &PoiSettings) -> Self {
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: settings.overpass_url.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            client,
        }
    }

    /// Fetch raw POIs of one category around a site.
    ///
    /// Returned points carry name and position only; distances are always
    /// computed by the caller against the current site.
    pub async fn fetch_category(
        &self,
        coords: Coordinates,
        radius_m: f64,
        category: PoiCategory,
    ) -> Result<Vec<RawPoi>, PoiError> {
        let query = build_overpass_query(coords, radius_m, category);

        tracing::debug!("Fetching {} POIs near {}", category, coords.rounded_key());

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PoiError::ApiError(format!(
                "{} query failed: {}",
                category,
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let elements = json
            .get("elements")
            .and_then(|e| e.as_array())
            .ok_or_else(|| PoiError::InvalidResponse("Missing elements array".into()))?;

        let pois = elements
            .iter()
            .filter_map(|element| {
                // Ways carry a center; nodes carry lat/lon directly
                let (lat, lon) = if let Some(center) = element.get("center") {
                    (center.get("lat")?.as_f64()?, center.get("lon")?.as_f64()?)
                } else {
                    (element.get("lat")?.as_f64()?, element.get("lon")?.as_f64()?)
                };

                let name = element
                    .get("tags")
                    .and_then(|t| t.get("name"))
                    .and_then(|n| n.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback_name(category));

                Some(RawPoi { name, latitude: lat, longitude: lon })
            })
            .collect::<Vec<_>>();

        tracing::debug!("Fetched {} {} POIs", pois.len(), category);

        Ok(pois)
    }
}

/// Unnamed features still get a stable placeholder label
fn fallback_name(category: PoiCategory) -> String {
    match category {
        PoiCategory::Transit => "Transit Stop",
        PoiCategory::School => "School",
        PoiCategory::Park => "Park",
        PoiCategory::Shop => "Shop",
        PoiCategory::Heritage => "Heritage Site",
    }
    .to_string()
}

/// Build the per-category Overpass QL query for a bounding box around the site
fn build_overpass_query(coords: Coordinates, radius_m: f64, category: PoiCategory) -> String {
    let bbox = calculate_bounding_box(coords.latitude, coords.longitude, radius_m);
    let bbox = format!("{},{},{},{}", bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon);

    let selectors = match category {
        PoiCategory::Transit => concat!(
            "node[\"public_transport\"=\"platform\"];",
            "node[\"public_transport\"=\"stop_position\"];",
            "node[\"railway\"=\"station\"];",
            "node[\"highway\"=\"bus_stop\"];"
        ),
        PoiCategory::School => "node[\"amenity\"=\"school\"];way[\"amenity\"=\"school\"];",
        PoiCategory::Park => concat!(
            "node[\"leisure\"=\"park\"];",
            "node[\"leisure\"=\"playground\"];",
            "way[\"leisure\"=\"park\"];",
            "way[\"leisure\"=\"playground\"];"
        ),
        PoiCategory::Shop => concat!(
            "node[\"shop\"];",
            "node[\"amenity\"=\"supermarket\"];",
            "node[\"amenity\"=\"convenience\"];"
        ),
        PoiCategory::Heritage => concat!(
            "node[\"historic\"];",
            "way[\"historic\"];",
            "node[\"heritage\"];",
            "way[\"heritage\"];"
        ),
    };

    format!("[out:json][bbox:{}];({});out center;", bbox, selectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_contains_bbox_and_selectors() {
        let coords = Coordinates::new(-37.8136, 144.9631);
        let query = build_overpass_query(coords, 1000.0, PoiCategory::Transit);

        assert!(query.contains("[out:json]"));
        assert!(query.contains("bus_stop"));
        assert!(query.contains("railway"));
        assert!(query.ends_with("out center;"));
    }

    #[test]
    fn test_each_category_has_distinct_selectors() {
        let coords = Coordinates::new(-37.8136, 144.9631);
        let queries: Vec<String> = PoiCategory::ALL
            .iter()
            .map(|c| build_overpass_query(coords, 1000.0, *c))
            .collect();

        for (i, a) in queries.iter().enumerate() {
            for b in queries.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_fallback_names() {
        assert_eq!(fallback_name(PoiCategory::Transit), "Transit Stop");
        assert_eq!(fallback_name(PoiCategory::Heritage), "Heritage Site");
    }
}
