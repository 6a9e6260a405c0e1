use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::core::distance::haversine_distance_m;
use crate::models::{Coordinates, PoiCategory, RawPoi};

/// Errors that can occur when interacting with the snapshot store
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// One persisted weekly snapshot: all raw POIs of one category around a
/// reference point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiSnapshot {
    pub category: PoiCategory,
    pub ref_latitude: f64,
    pub ref_longitude: f64,
    pub radius_m: f64,
    pub points: Vec<RawPoi>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
}

impl PoiSnapshot {
    /// True if this snapshot's covered area contains the given site
    pub fn covers(&self, coords: Coordinates) -> bool {
        haversine_distance_m(self.ref_latitude, self.ref_longitude, coords.latitude, coords.longitude)
            <= self.radius_m
    }
}

/// Postgres-backed store for the weekly POI snapshots.
///
/// The proximity engine reads from here when a live category query fails;
/// the snapshot refresh endpoint writes here. Deliberately unbounded in
/// age: a stale snapshot still beats an empty category.
pub struct SnapshotStore {
    pool: PgPool,
}

impl SnapshotStore {
    /// Create a new snapshot store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, SnapshotError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new snapshot store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, SnapshotError> {
        tracing::info!("Connecting to snapshot store");

        Self::new(url, max_connections.unwrap_or(10), min_connections.unwrap_or(1)).await
    }

    /// Persist (or replace) one category's snapshot around a reference point.
    ///
    /// Upserts on (category, reference key), so re-running the weekly refresh
    /// for the same area replaces the previous snapshot in place.
    pub async fn store(
        &self,
        category: PoiCategory,
        reference: Coordinates,
        radius_m: f64,
        points: &[RawPoi],
    ) -> Result<(), SnapshotError> {
        let query = r#"
            INSERT INTO poi_snapshots (category, ref_key, ref_latitude, ref_longitude, radius_m, points, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (category, ref_key)
            DO UPDATE SET
                ref_latitude = EXCLUDED.ref_latitude,
                ref_longitude = EXCLUDED.ref_longitude,
                radius_m = EXCLUDED.radius_m,
                points = EXCLUDED.points,
                fetched_at = EXCLUDED.fetched_at
        "#;

        sqlx::query(query)
            .bind(category.as_str())
            .bind(reference.rounded_key())
            .bind(reference.latitude)
            .bind(reference.longitude)
            .bind(radius_m)
            .bind(serde_json::to_value(points)?)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Stored {} snapshot: {} points around {}",
            category,
            points.len(),
            reference.rounded_key()
        );

        Ok(())
    }

    /// Most recent snapshot of one category whose covered area contains the
    /// given site, if any.
    pub async fn latest_covering(
        &self,
        category: PoiCategory,
        coords: Coordinates,
    ) -> Result<Option<PoiSnapshot>, SnapshotError> {
        let query = r#"
            SELECT category, ref_latitude, ref_longitude, radius_m, points, fetched_at
            FROM poi_snapshots
            WHERE category = $1
            ORDER BY fetched_at DESC
            LIMIT 50
        "#;

        let rows = sqlx::query(query)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let snapshot = PoiSnapshot {
                category,
                ref_latitude: row.get("ref_latitude"),
                ref_longitude: row.get("ref_longitude"),
                radius_m: row.get("radius_m"),
                points: serde_json::from_value(row.get("points"))?,
                fetched_at: row.get("fetched_at"),
            };

            if snapshot.covers(coords) {
                return Ok(Some(snapshot));
            }
        }

        Ok(None)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, SnapshotError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
