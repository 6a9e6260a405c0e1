// Unit tests for parcelscore

use parcelscore::config::{EstimationSettings, PoiSettings, ScoringSettings};
use parcelscore::core::{
    distance::{calculate_bounding_box, haversine_distance_m, is_within_bounding_box},
    proximity::{dedup_points, postprocess},
    resolver::{estimate_by_tier, rectangle_from_area, tier_profile},
    scoring::score_assessment,
};
use parcelscore::models::{
    AssessmentRecord, ComplianceChecks, Coordinates, OverlayFlag, PoiCategory, RawPoi,
    RecordOverrides, Source, ViabilityStatus, ZoneClass,
};
use chrono::Utc;
use uuid::Uuid;

const CBD_LAT: f64 = -37.8136;
const CBD_LON: f64 = 144.9631;

fn test_record() -> AssessmentRecord {
    AssessmentRecord {
        id: Uuid::new_v4(),
        address: "12 Example St, Brunswick".to_string(),
        coordinates: Coordinates::new(-37.7667, 144.9612),
        zone: Some(ZoneClass::ResidentialGrowth),
        overlays: vec![],
        lot_width_m: Some(18.0),
        lot_depth_m: Some(36.0),
        lot_area_sqm: Some(648.0),
        transport_distance_m: Some(240.0),
        compliance: ComplianceChecks { heating: true, windows: true, energy: false },
        notes: None,
        score: None,
        provenance: None,
        created_at: Utc::now(),
    }
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance_m(CBD_LAT, CBD_LON, CBD_LAT, CBD_LON);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_cbd_to_richmond() {
    // Melbourne CBD to Richmond is roughly 3km
    let distance = haversine_distance_m(CBD_LAT, CBD_LON, -37.8183, 144.9980);
    assert!(distance > 2000.0 && distance < 4500.0);
}

#[test]
fn test_bounding_box_creation() {
    let bbox = calculate_bounding_box(CBD_LAT, CBD_LON, 1000.0);

    assert!(bbox.min_lat < CBD_LAT);
    assert!(bbox.max_lat > CBD_LAT);
    assert!(bbox.min_lon < CBD_LON);
    assert!(bbox.max_lon > CBD_LON);

    // 1km radius is roughly 0.018 degrees of latitude
    let lat_span = bbox.max_lat - bbox.min_lat;
    assert!((lat_span - 0.018).abs() < 0.002);
}

#[test]
fn test_point_within_bbox() {
    let bbox = calculate_bounding_box(CBD_LAT, CBD_LON, 1000.0);

    assert!(is_within_bounding_box(CBD_LAT, CBD_LON, &bbox));
    assert!(!is_within_bounding_box(-38.5, 145.5, &bbox));
    assert!(!is_within_bounding_box(bbox.max_lat + 0.01, CBD_LON, &bbox));
}

#[test]
fn test_full_assessment_score() {
    // RGZ with no overlays, 240m to transit, compliant dimensions, two of
    // three compliance checks: 0.4*100 + 0.25*70 + 0.25*100 + 0.1*66.67
    let score = score_assessment(&test_record(), &ScoringSettings::default()).unwrap();

    assert_eq!(score.breakdown.zone, 100.0);
    assert!((score.breakdown.transport - 70.0).abs() < 1e-9);
    assert_eq!(score.breakdown.physical, 100.0);
    assert!((score.breakdown.compliance - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(score.total, 89.2);
    assert_eq!(score.status, ViabilityStatus::Suitable);
}

#[test]
fn test_heritage_overlay_floors_zone_score() {
    let mut record = test_record();
    record.overlays = vec![OverlayFlag::Heritage];

    let score = score_assessment(&record, &ScoringSettings::default()).unwrap();
    assert_eq!(score.breakdown.zone, 0.0);
    assert_ne!(score.status, ViabilityStatus::Suitable);
}

#[test]
fn test_overrides_win_and_mark_provenance() {
    let settings = EstimationSettings::default();
    let resolution = estimate_by_tier(Coordinates::new(-37.90, 145.05), &settings);

    let mut record = AssessmentRecord::from_resolution(
        "1 Test Rd".to_string(),
        Coordinates::new(-37.90, 145.05),
        &resolution,
    );

    let overrides = RecordOverrides {
        lot_width_m: Some(16.5),
        notes: Some("measured on site".to_string()),
        ..Default::default()
    };
    overrides.apply_to(&mut record);

    assert_eq!(record.lot_width_m, Some(16.5));
    assert_eq!(record.notes.as_deref(), Some("measured on site"));
    let provenance = record.provenance.unwrap();
    assert_eq!(provenance.lot_width, Source::UserOverride);
    assert_eq!(provenance.lot_area, Source::Estimated);
}

#[test]
fn test_outer_tier_estimation_geometry() {
    let settings = EstimationSettings::default();

    // ~11km south of the CBD falls in the outer tier: 950sqm at 1.7 ratio
    let site = Coordinates::new(-37.9126, CBD_LON);
    let profile = tier_profile(site, &settings);
    assert_eq!(profile.lot_area_sqm, 950.0);

    let resolution = estimate_by_tier(site, &settings);
    assert!((resolution.lot_width_m - 23.6).abs() < 0.1);
    assert!((resolution.lot_depth_m - 40.2).abs() < 0.1);
    assert_eq!(resolution.zone, ZoneClass::NeighbourhoodResidential);
}

#[test]
fn test_rectangle_area_roundtrip() {
    for (area, ratio) in [(520.0, 1.6), (700.0, 1.7), (950.0, 1.7)] {
        let (width, depth) = rectangle_from_area(area, ratio);
        assert!((width * depth - area).abs() < 1e-9);
    }
}

#[test]
fn test_zone_parsing_from_upstream_names() {
    assert_eq!(
        ZoneClass::from_name("Neighbourhood Residential Zone - Schedule 3"),
        ZoneClass::NeighbourhoodResidential
    );
    assert_eq!(ZoneClass::from_name("Commercial 1 Zone"), ZoneClass::Unclassified);
    assert_eq!(OverlayFlag::from_name("Heritage Overlay HO123"), Some(OverlayFlag::Heritage));
    assert_eq!(OverlayFlag::from_name("Development Plan Overlay"), None);
}

#[test]
fn test_poi_pipeline_dedup_and_ordering() {
    let settings = PoiSettings::default();
    let site = Coordinates::new(CBD_LAT, CBD_LON);

    let raw = vec![
        RawPoi { name: "Flagstaff Station".into(), latitude: -37.8119, longitude: 144.9566 },
        // Second listing of the same station, ~10m away
        RawPoi { name: "flagstaff  station".into(), latitude: -37.81195, longitude: 144.9567 },
        RawPoi { name: "Melbourne Central".into(), latitude: -37.8100, longitude: 144.9628 },
    ];

    let pois = postprocess(raw, site, 2000.0, PoiCategory::Transit, &settings);

    assert_eq!(pois.len(), 2);
    assert!(pois[0].distance_m <= pois[1].distance_m);
    assert!(pois.iter().filter(|p| p.name.to_lowercase().contains("flagstaff")).count() == 1);
}

#[test]
fn test_dedup_threshold_is_strict() {
    // Same name, ~45m apart: outside the 30m threshold, both kept
    let points = vec![
        RawPoi { name: "Bus Stop".into(), latitude: -37.8136, longitude: 144.9631 },
        RawPoi { name: "Bus Stop".into(), latitude: -37.8140, longitude: 144.9631 },
    ];

    assert_eq!(dedup_points(points, 30.0).len(), 2);
}

#[test]
fn test_record_serde_round_trip() {
    let record = test_record();
    let json = serde_json::to_string(&record).unwrap();

    // Field names follow the front-end convention
    assert!(json.contains("lotWidthM"));
    assert!(json.contains("transportDistanceM"));

    let parsed: AssessmentRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.lot_width_m, record.lot_width_m);
    assert_eq!(parsed.zone, record.zone);
}
