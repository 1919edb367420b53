// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::models::{GeoPoint, Gym, ScannedCell, Sighting, Stop};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SightingRow {
    encounter_id: String,
    spawnpoint_id: String,
    pokemon_id: i32,
    pokemon_name: String,
    latitude: f64,
    longitude: f64,
    disappear_time: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct StopRow {
    pokestop_id: String,
    enabled: bool,
    latitude: f64,
    longitude: f64,
    last_modified: DateTime<Utc>,
    lure_expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct GymRow {
    gym_id: String,
    team_id: i32,
    guard_pokemon_id: i32,
    gym_points: i32,
    enabled: bool,
    latitude: f64,
    longitude: f64,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ScannedRow {
    scanned_id: String,
    latitude: f64,
    longitude: f64,
    last_modified: DateTime<Utc>,
}

impl From<SightingRow> for Sighting {
    fn from(row: SightingRow) -> Self {
        Sighting {
            encounter_id: row.encounter_id,
            spawnpoint_id: row.spawnpoint_id,
            pokemon_id: row.pokemon_id,
            pokemon_name: row.pokemon_name,
            position: GeoPoint::new(row.latitude, row.longitude),
            disappear_time: row.disappear_time,
        }
    }
}

impl From<StopRow> for Stop {
    fn from(row: StopRow) -> Self {
        Stop {
            pokestop_id: row.pokestop_id,
            enabled: row.enabled,
            position: GeoPoint::new(row.latitude, row.longitude),
            last_modified: row.last_modified,
            lure_expiration: row.lure_expiration,
        }
    }
}

impl From<GymRow> for Gym {
    fn from(row: GymRow) -> Self {
        Gym {
            gym_id: row.gym_id,
            team_id: row.team_id,
            guard_pokemon_id: row.guard_pokemon_id,
            gym_points: row.gym_points,
            enabled: row.enabled,
            position: GeoPoint::new(row.latitude, row.longitude),
            last_modified: row.last_modified,
        }
    }
}

impl From<ScannedRow> for ScannedCell {
    fn from(row: ScannedRow) -> Self {
        ScannedCell {
            scanned_id: row.scanned_id,
            position: GeoPoint::new(row.latitude, row.longitude),
            last_modified: row.last_modified,
        }
    }
}
