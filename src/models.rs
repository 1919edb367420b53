//! Data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampMilliSeconds};

use crate::errors::MapError;

/// Geographic position in WGS84 decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a point, rejecting non-finite or out-of-range coordinates
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self, MapError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(MapError::InvalidParameter(format!(
                "latitude out of range: {}",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(MapError::InvalidParameter(format!(
                "longitude out of range: {}",
                longitude
            )));
        }
        Ok(Self::new(latitude, longitude))
    }
}

/// Axis-aligned map viewport, given by its south-west and north-east corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl BoundingBox {
    /// Build a box from the four viewport query values
    ///
    /// Returns `Ok(None)` when no corner is given. A partially specified box is
    /// rejected, as is one whose south-west corner lies north of its north-east
    /// corner.
    pub fn from_corners(
        sw_lat: Option<f64>,
        sw_lng: Option<f64>,
        ne_lat: Option<f64>,
        ne_lng: Option<f64>,
    ) -> Result<Option<Self>, MapError> {
        match (sw_lat, sw_lng, ne_lat, ne_lng) {
            (None, None, None, None) => Ok(None),
            (Some(sw_lat), Some(sw_lng), Some(ne_lat), Some(ne_lng)) => {
                let south_west = GeoPoint::checked(sw_lat, sw_lng)?;
                let north_east = GeoPoint::checked(ne_lat, ne_lng)?;
                if south_west.latitude > north_east.latitude {
                    return Err(MapError::InvalidParameter(
                        "swLat must not exceed neLat".to_string(),
                    ));
                }
                Ok(Some(Self {
                    south_west,
                    north_east,
                }))
            }
            _ => Err(MapError::InvalidParameter(
                "bounding box needs all of swLat, swLng, neLat, neLng".to_string(),
            )),
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.south_west.latitude
            && point.latitude <= self.north_east.latitude
            && point.longitude >= self.south_west.longitude
            && point.longitude <= self.north_east.longitude
    }
}

/// A creature sighting reported by the scanner
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sighting {
    pub encounter_id: String,
    pub spawnpoint_id: String,
    /// Species identifier, the key matched against the suppression set
    pub pokemon_id: i32,
    pub pokemon_name: String,
    #[serde(flatten)]
    pub position: GeoPoint,
    /// Expiry instant, serialized as milliseconds since the Unix epoch
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub disappear_time: DateTime<Utc>,
}

/// Stop location
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub pokestop_id: String,
    pub enabled: bool,
    #[serde(flatten)]
    pub position: GeoPoint,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub last_modified: DateTime<Utc>,
    /// End of an active lure, None if the stop is not lured
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    pub lure_expiration: Option<DateTime<Utc>>,
}

/// Gym and its current holder
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gym {
    pub gym_id: String,
    /// Controlling team, 0 = uncontested
    pub team_id: i32,
    pub guard_pokemon_id: i32,
    pub gym_points: i32,
    pub enabled: bool,
    #[serde(flatten)]
    pub position: GeoPoint,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub last_modified: DateTime<Utc>,
}

/// Cell visited by the scanner
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannedCell {
    pub scanned_id: String,
    #[serde(flatten)]
    pub position: GeoPoint,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    pub last_modified: DateTime<Utc>,
}

/// Bookmarked location offered as a relocation target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}
