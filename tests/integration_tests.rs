// Integration tests for parcelscore: resolver cascade and proximity engine
// against mocked upstream services

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;

use parcelscore::config::{EstimationSettings, GeodataSettings, PoiSettings};
use parcelscore::core::proximity::ProximityEngine;
use parcelscore::core::resolver::Resolver;
use parcelscore::models::{Coordinates, OverlayFlag, PoiCategory, Source, ZoneClass};
use parcelscore::services::cache::CacheManager;
use parcelscore::services::geodata::GeodataClient;
use parcelscore::services::poi::PoiClient;

const GEODATA_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

fn geodata_settings(server: &mockito::ServerGuard) -> GeodataSettings {
    GeodataSettings {
        parcel_url: server.url(),
        zoning_url: format!("{}/zoning", server.url()),
        parcel_timeout_secs: 5,
        zoning_timeout_secs: 3,
    }
}

fn make_resolver(server: &mockito::ServerGuard) -> Resolver {
    Resolver::new(
        GeodataClient::new(&geodata_settings(server)),
        Arc::new(CacheManager::in_memory(100)),
        EstimationSettings::default(),
        GEODATA_TTL,
    )
}

fn parcel_body() -> String {
    json!({
        "features": [{
            "properties": { "area": 650.0, "frontage": 15.2, "depth": 42.0 }
        }]
    })
    .to_string()
}

fn zoning_body() -> String {
    json!({
        "features": [{
            "attributes": {
                "ZONE_NAME": "General Residential Zone - Schedule 1",
                "OVERLAYS": ["Heritage Overlay HO42"]
            }
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_resolver_uses_authoritative_sources() {
    let mut server = mockito::Server::new_async().await;

    let _parcel = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(parcel_body())
        .create_async()
        .await;

    let _zoning = server
        .mock("GET", "/zoning")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(zoning_body())
        .create_async()
        .await;

    let resolver = make_resolver(&server);
    let resolution = resolver.resolve(Coordinates::new(-37.7667, 144.9612)).await;

    assert_eq!(resolution.zone, ZoneClass::GeneralResidential);
    assert_eq!(resolution.overlays, vec![OverlayFlag::Heritage]);
    assert_eq!(resolution.lot_area_sqm, 650.0);
    assert_eq!(resolution.lot_width_m, 15.2);
    assert_eq!(resolution.lot_depth_m, 42.0);

    assert_eq!(resolution.provenance.zone, Source::PlanningScheme);
    assert_eq!(resolution.provenance.lot_area, Source::Cadastral);
    assert!(!resolution.provenance.any_estimated());
}

#[tokio::test]
async fn test_resolver_second_call_is_served_from_cache() {
    let mut server = mockito::Server::new_async().await;

    let parcel = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(parcel_body())
        .expect(1)
        .create_async()
        .await;

    let zoning = server
        .mock("GET", "/zoning")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(zoning_body())
        .expect(1)
        .create_async()
        .await;

    let resolver = make_resolver(&server);
    let site = Coordinates::new(-37.7667, 144.9612);

    let first = resolver.resolve(site).await;
    let second = resolver.resolve(site).await;

    // Same payload, no second round of upstream queries
    assert_eq!(first.zone, second.zone);
    assert_eq!(first.lot_area_sqm, second.lot_area_sqm);
    assert_eq!(first.provenance, second.provenance);
    parcel.assert_async().await;
    zoning.assert_async().await;
}

#[tokio::test]
async fn test_resolver_estimates_when_upstreams_fail() {
    let mut server = mockito::Server::new_async().await;

    // Both upstreams down; the estimated result is still cached, so the
    // second resolve makes no further upstream calls
    let parcel = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let zoning = server
        .mock("GET", "/zoning")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let resolver = make_resolver(&server);

    // ~11km from the CBD: outer tier defaults
    let site = Coordinates::new(-37.9126, 144.9631);
    let resolution = resolver.resolve(site).await;

    assert_eq!(resolution.zone, ZoneClass::NeighbourhoodResidential);
    assert_eq!(resolution.lot_area_sqm, 950.0);
    assert!(resolution.lot_width_m > 0.0);
    assert_eq!(resolution.provenance.zone, Source::Estimated);
    assert_eq!(resolution.provenance.lot_area, Source::Estimated);

    let _ = resolver.resolve(site).await;
    parcel.assert_async().await;
    zoning.assert_async().await;
}

#[tokio::test]
async fn test_resolver_partial_failure_fills_gaps() {
    let mut server = mockito::Server::new_async().await;

    let _parcel = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let _zoning = server
        .mock("GET", "/zoning")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(zoning_body())
        .create_async()
        .await;

    let resolver = make_resolver(&server);
    let resolution = resolver.resolve(Coordinates::new(-37.7667, 144.9612)).await;

    // Zone is authoritative, dimensions fell through to estimation
    assert_eq!(resolution.provenance.zone, Source::PlanningScheme);
    assert_eq!(resolution.provenance.lot_area, Source::Estimated);
    assert!(resolution.lot_area_sqm > 0.0);
    assert!(resolution.provenance.any_estimated());
}

fn poi_settings(server: &mockito::ServerGuard) -> PoiSettings {
    PoiSettings {
        overpass_url: server.url(),
        ..Default::default()
    }
}

fn make_engine(server: &mockito::ServerGuard) -> ProximityEngine {
    let settings = poi_settings(server);
    ProximityEngine::new(
        PoiClient::new(&settings),
        Arc::new(CacheManager::in_memory(100)),
        None,
        settings,
        Duration::from_secs(3600),
    )
}

fn overpass_body() -> String {
    json!({
        "elements": [
            {
                "type": "node",
                "id": 1,
                "lat": -37.8119,
                "lon": 144.9566,
                "tags": { "name": "Flagstaff Station" }
            },
            {
                "type": "way",
                "id": 2,
                "center": { "lat": -37.8100, "lon": 144.9628 },
                "tags": { "name": "Melbourne Central" }
            }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_proximity_live_fetch_then_cache() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(overpass_body())
        .expect(1)
        .create_async()
        .await;

    let engine = make_engine(&server);
    let site = Coordinates::new(-37.8136, 144.9631);

    let (first, degraded) = engine.query_category(site, 2000.0, PoiCategory::Transit).await;
    assert!(!degraded);
    assert_eq!(first.len(), 2);
    assert!(first[0].distance_m <= first[1].distance_m);

    // Second query hits the cache; distances are still computed fresh
    let (second, degraded) = engine.query_category(site, 2000.0, PoiCategory::Transit).await;
    assert!(!degraded);
    assert_eq!(second.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_wider_radius_refetches_instead_of_replaying_cache() {
    let mut server = mockito::Server::new_async().await;

    // One fetch for the narrow query, a second for the wider one: the
    // cached narrow window must not answer a query beyond its radius
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(overpass_body())
        .expect(2)
        .create_async()
        .await;

    let engine = make_engine(&server);
    let site = Coordinates::new(-37.8136, 144.9631);

    let (narrow, degraded) = engine.query_category(site, 500.0, PoiCategory::Transit).await;
    assert!(!degraded);
    assert!(narrow.iter().all(|p| p.distance_m <= 500.0));

    let (wide, degraded) = engine.query_category(site, 5000.0, PoiCategory::Transit).await;
    assert!(!degraded);
    assert_eq!(wide.len(), 2);

    // The wide fetch is cached in turn and now serves narrower queries
    let (narrow_again, _) = engine.query_category(site, 500.0, PoiCategory::Transit).await;
    assert_eq!(narrow_again.len(), narrow.len());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_proximity_failure_without_snapshot_degrades_to_empty() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(503)
        .create_async()
        .await;

    let engine = make_engine(&server);
    let site = Coordinates::new(-37.8136, 144.9631);

    let (pois, degraded) = engine.query_category(site, 1000.0, PoiCategory::School).await;
    assert!(pois.is_empty());
    assert!(degraded);
}

#[tokio::test]
async fn test_query_all_covers_every_category() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(overpass_body())
        .expect(5)
        .create_async()
        .await;

    let engine = make_engine(&server);
    let outcome = engine.query_all(Coordinates::new(-37.8136, 144.9631), 2000.0).await;

    assert_eq!(outcome.pois.len(), PoiCategory::ALL.len());
    assert!(outcome.degraded.is_empty());
    for category in PoiCategory::ALL {
        assert!(outcome.pois.contains_key(&category));
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_degraded_category_is_isolated() {
    let mut server = mockito::Server::new_async().await;

    // The shared mock endpoint fails for everything; all five categories
    // degrade independently instead of failing the query
    let _mock = server
        .mock("POST", "/")
        .with_status(500)
        .create_async()
        .await;

    let engine = make_engine(&server);
    let outcome = engine.query_all(Coordinates::new(-37.8136, 144.9631), 1000.0).await;

    assert_eq!(outcome.degraded.len(), PoiCategory::ALL.len());
    assert!(outcome.pois.values().all(|v| v.is_empty()));
    assert_eq!(outcome.nearest_transit_m(9999.0), 9999.0);
}
