// src/database.rs
//! Read access to the scanner's PostgreSQL database

mod models;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::{
    config::DatabaseConfig,
    errors::MapError,
    models::{BoundingBox, Gym, ScannedCell, Sighting, Stop},
};
use models::{GymRow, ScannedRow, SightingRow, StopRow};

/// Source of map entities
///
/// The scanner owns the data; implementations only read it.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Sightings that have not yet disappeared, optionally limited to a
    /// viewport and to an allowlist of species identifiers
    async fn active_sightings(
        &self,
        bounds: Option<BoundingBox>,
        ids: Option<&[i32]>,
    ) -> Result<Vec<Sighting>, MapError>;

    async fn stops(&self, bounds: Option<BoundingBox>) -> Result<Vec<Stop>, MapError>;

    async fn gyms(&self, bounds: Option<BoundingBox>) -> Result<Vec<Gym>, MapError>;

    /// Cells scanned within the configured recency window
    async fn recent_scanned(&self, bounds: Option<BoundingBox>)
        -> Result<Vec<ScannedCell>, MapError>;
}

/// PostgreSQL-backed data source
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    scanned_window: Duration,
}

impl Database {
    /// Wrap an existing pool
    pub fn new(pool: PgPool, scanned_window: Duration) -> Self {
        Self {
            pool,
            scanned_window,
        }
    }

    /// Connect using database configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, MapError> {
        info!(
            "Connecting to database, max_connections={}",
            config.max_connections
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| MapError::DatabaseConnectionError(e.to_string()))?;

        let database = Self::new(pool, config.scanned_window);
        if config.run_migrations {
            database.migrate().await?;
        }
        Ok(database)
    }

    /// Apply bundled schema migrations
    pub async fn migrate(&self) -> Result<(), MapError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Append a viewport filter; the query must already contain a WHERE clause
fn push_bounds(query: &mut QueryBuilder<'_, Postgres>, bounds: Option<BoundingBox>) {
    if let Some(bounds) = bounds {
        query
            .push(" AND latitude >= ")
            .push_bind(bounds.south_west.latitude)
            .push(" AND latitude <= ")
            .push_bind(bounds.north_east.latitude)
            .push(" AND longitude >= ")
            .push_bind(bounds.south_west.longitude)
            .push(" AND longitude <= ")
            .push_bind(bounds.north_east.longitude);
    }
}

#[async_trait]
impl DataSource for Database {
    async fn active_sightings(
        &self,
        bounds: Option<BoundingBox>,
        ids: Option<&[i32]>,
    ) -> Result<Vec<Sighting>, MapError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT encounter_id, spawnpoint_id, pokemon_id, pokemon_name,
                    latitude, longitude, disappear_time
             FROM pokemon WHERE disappear_time > ",
        );
        query.push_bind(Utc::now());
        push_bounds(&mut query, bounds);
        if let Some(ids) = ids {
            query.push(" AND pokemon_id = ANY(").push_bind(ids.to_vec()).push(")");
        }

        let rows: Vec<SightingRow> = query.build_query_as().fetch_all(&self.pool).await?;
        debug!("Fetched {} active sightings", rows.len());
        Ok(rows.into_iter().map(Sighting::from).collect())
    }

    async fn stops(&self, bounds: Option<BoundingBox>) -> Result<Vec<Stop>, MapError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT pokestop_id, enabled, latitude, longitude, last_modified, lure_expiration
             FROM pokestop WHERE TRUE",
        );
        push_bounds(&mut query, bounds);

        let rows: Vec<StopRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Stop::from).collect())
    }

    async fn gyms(&self, bounds: Option<BoundingBox>) -> Result<Vec<Gym>, MapError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT gym_id, team_id, guard_pokemon_id, gym_points, enabled,
                    latitude, longitude, last_modified
             FROM gym WHERE TRUE",
        );
        push_bounds(&mut query, bounds);

        let rows: Vec<GymRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Gym::from).collect())
    }

    async fn recent_scanned(
        &self,
        bounds: Option<BoundingBox>,
    ) -> Result<Vec<ScannedCell>, MapError> {
        let window = chrono::Duration::from_std(self.scanned_window).map_err(|e| {
            MapError::ConfigurationError {
                message: format!("Scanned window out of range: {}", e),
            }
        })?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT scanned_id, latitude, longitude, last_modified
             FROM scannedlocation WHERE last_modified >= ",
        );
        query.push_bind(Utc::now() - window);
        push_bounds(&mut query, bounds);

        let rows: Vec<ScannedRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ScannedCell::from).collect())
    }
}
