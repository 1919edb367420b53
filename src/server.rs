//! HTTP interface

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    config::{AppConfig, MapConfig, ServerConfig},
    database::DataSource,
    errors::MapError,
    models::{BoundingBox, GeoPoint, Gym, SavedLocation, ScannedCell, Sighting, Stop},
    proximity::{compute_report, ProximityReport, ReportPolicy},
};

/// State shared by all request handlers
pub struct AppState {
    /// Current map center, moved by relocation requests
    pub origin: RwLock<GeoPoint>,
    pub map: MapConfig,
    pub policy: ReportPolicy,
    pub suppressed: HashSet<i32>,
    pub locations: Vec<SavedLocation>,
    pub source: Arc<dyn DataSource>,
}

impl AppState {
    pub fn new(config: &AppConfig, source: Arc<dyn DataSource>) -> Self {
        Self {
            origin: RwLock::new(config.map.origin()),
            map: config.map.clone(),
            policy: config.report.policy(),
            suppressed: config.report.suppression_set(),
            locations: config.locations.clone(),
            source,
        }
    }
}

/// Map web server
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    pub fn new(config: &AppConfig, source: Arc<dyn DataSource>) -> Self {
        Self {
            config: config.server.clone(),
            state: Arc::new(AppState::new(config, source)),
        }
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), MapError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind).await?;
        info!("Listening on http://{}", self.config.bind);

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(map_settings))
        .route("/raw_data", get(raw_data))
        .route("/loc", get(current_location))
        .route("/next_loc", post(next_location))
        .route("/mobile", get(mobile_list))
        .route("/locations", get(saved_locations))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Settings a map page needs to initialise itself
#[derive(Debug, Serialize)]
struct MapSettings {
    lat: f64,
    lng: f64,
    gmaps_key: String,
    lang: String,
}

#[derive(Debug, Serialize)]
struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Serialize)]
struct RawData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pokemons: Option<Vec<Sighting>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pokestops: Option<Vec<Stop>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gyms: Option<Vec<Gym>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scanned: Option<Vec<ScannedCell>>,
}

#[derive(Debug, Serialize)]
struct MobileList {
    #[serde(flatten)]
    report: ProximityReport,
    origin_lat: f64,
    origin_lng: f64,
}

#[derive(Debug, Default, Deserialize)]
struct RawDataParams {
    pokemon: Option<String>,
    pokestops: Option<String>,
    gyms: Option<String>,
    scanned: Option<String>,
    #[serde(rename = "swLat")]
    sw_lat: Option<String>,
    #[serde(rename = "swLng")]
    sw_lng: Option<String>,
    #[serde(rename = "neLat")]
    ne_lat: Option<String>,
    #[serde(rename = "neLng")]
    ne_lng: Option<String>,
    /// Comma-separated species allowlist
    ids: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CoordinateParams {
    lat: Option<String>,
    lon: Option<String>,
}

impl CoordinateParams {
    fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.lat) && present(&self.lon)
    }

    /// Both coordinates if given, None if neither is given
    fn point(&self) -> Result<Option<GeoPoint>, MapError> {
        match (
            parse_number("lat", self.lat.as_deref())?,
            parse_number("lon", self.lon.as_deref())?,
        ) {
            (Some(lat), Some(lon)) => Ok(Some(GeoPoint::checked(lat, lon)?)),
            (None, None) => Ok(None),
            _ => Err(MapError::InvalidParameter(
                "lat and lon must be given together".to_string(),
            )),
        }
    }
}

/// A query flag is on only when its value is exactly "true"
fn flag(value: Option<&str>, default: bool) -> bool {
    value.map_or(default, |v| v == "true")
}

/// Parse an optional numeric parameter; empty counts as absent
fn parse_number(name: &str, value: Option<&str>) -> Result<Option<f64>, MapError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| MapError::InvalidParameter(format!("{} is not a number: {}", name, raw))),
    }
}

fn parse_ids(value: Option<&str>) -> Result<Option<Vec<i32>>, MapError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .split(',')
            .map(|id| {
                id.trim()
                    .parse::<i32>()
                    .map_err(|_| MapError::InvalidParameter(format!("invalid id: {}", id)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn map_settings(State(state): State<Arc<AppState>>) -> Json<MapSettings> {
    let origin = *state.origin.read().await;
    Json(MapSettings {
        lat: origin.latitude,
        lng: origin.longitude,
        gmaps_key: state.map.gmaps_key.clone(),
        lang: state.map.locale.clone(),
    })
}

async fn current_location(State(state): State<Arc<AppState>>) -> Json<Location> {
    let origin = *state.origin.read().await;
    Json(Location {
        lat: origin.latitude,
        lng: origin.longitude,
    })
}

async fn saved_locations(State(state): State<Arc<AppState>>) -> Json<Vec<SavedLocation>> {
    Json(state.locations.clone())
}

async fn raw_data(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RawDataParams>, QueryRejection>,
) -> Result<Json<RawData>, MapError> {
    let Query(params) = query?;
    let bounds = BoundingBox::from_corners(
        parse_number("swLat", params.sw_lat.as_deref())?,
        parse_number("swLng", params.sw_lng.as_deref())?,
        parse_number("neLat", params.ne_lat.as_deref())?,
        parse_number("neLng", params.ne_lng.as_deref())?,
    )?;
    let ids = parse_ids(params.ids.as_deref())?;

    let mut data = RawData::default();
    if flag(params.pokemon.as_deref(), true) {
        data.pokemons = Some(state.source.active_sightings(bounds, ids.as_deref()).await?);
    }
    if flag(params.pokestops.as_deref(), false) {
        data.pokestops = Some(state.source.stops(bounds).await?);
    }
    if flag(params.gyms.as_deref(), true) {
        data.gyms = Some(state.source.gyms(bounds).await?);
    }
    if flag(params.scanned.as_deref(), true) {
        data.scanned = Some(state.source.recent_scanned(bounds).await?);
    }

    Ok(Json(data))
}

/// Move the map origin
///
/// Coordinates come from the form body when it carries both, otherwise from
/// the query string.
async fn next_location(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CoordinateParams>, QueryRejection>,
    form: Result<Form<CoordinateParams>, FormRejection>,
) -> Result<&'static str, MapError> {
    if state.map.fixed_location {
        warn!("Rejected relocation: location is fixed");
        return Err(MapError::OperationDisabled(
            "relocation is disabled for a fixed location".to_string(),
        ));
    }

    let params = match (form, query) {
        (Ok(Form(form)), _) if form.is_complete() => form,
        (_, Ok(Query(query))) => query,
        (_, Err(rejection)) => {
            let e = MapError::from(rejection);
            warn!("Invalid next location: {}", e);
            return Err(e);
        }
    };
    let point = match params.point() {
        Ok(Some(point)) => point,
        Ok(None) => {
            warn!("Invalid next location: {:?},{:?}", params.lat, params.lon);
            return Err(MapError::InvalidParameter(
                "lat and lon are required".to_string(),
            ));
        }
        Err(e) => {
            warn!("Invalid next location: {}", e);
            return Err(e);
        }
    };

    *state.origin.write().await = point;
    info!(
        "Moved origin to {:.6},{:.6}",
        point.latitude, point.longitude
    );
    Ok("ok")
}

async fn mobile_list(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CoordinateParams>, QueryRejection>,
) -> Result<Json<MobileList>, MapError> {
    let Query(params) = query?;
    let origin = match params.point()? {
        Some(point) => point,
        None => *state.origin.read().await,
    };

    let sightings = state.source.active_sightings(None, None).await?;
    let report = compute_report(
        origin,
        &sightings,
        &state.suppressed,
        &state.policy,
        Utc::now(),
    );

    Ok(Json(MobileList {
        report,
        origin_lat: origin.latitude,
        origin_lng: origin.longitude,
    }))
}
