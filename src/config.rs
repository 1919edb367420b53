//! Application configuration

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::MapError;
use crate::models::{GeoPoint, SavedLocation};
use crate::proximity::ReportPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub map: MapConfig,
    #[serde(default)]
    pub report: ReportConfig,
    pub database: DatabaseConfig,
    /// Bookmarks listed by the locations endpoint
    #[serde(default)]
    pub locations: Vec<SavedLocation>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// Initial map center and proximity origin
    pub origin_lat: f64,
    pub origin_lng: f64,
    /// Refuse relocation requests
    #[serde(default)]
    pub fixed_location: bool,
    #[serde(default)]
    pub gmaps_key: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Cutoff in meters for the prominent list, inclusive
    #[serde(default = "default_max_distance")]
    pub max_distance: u32,
    /// Cutoff in meters for the suppressed list, exclusive
    #[serde(default = "default_suppressed_max_distance")]
    pub suppressed_max_distance: u32,
    /// Species identifiers demoted to the suppressed list
    #[serde(default)]
    pub suppressed: Vec<i32>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_distance: default_max_distance(),
            suppressed_max_distance: default_suppressed_max_distance(),
            suppressed: Vec::new(),
        }
    }
}

fn default_max_distance() -> u32 {
    ReportPolicy::default().max_distance
}

fn default_suppressed_max_distance() -> u32 {
    ReportPolicy::default().suppressed_max_distance
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How far back scanned cells are reported
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_scanned_window")]
    pub scanned_window: Duration,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_scanned_window() -> Duration {
    Duration::from_secs(15 * 60)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/default")
    }

    /// Load from the named file (extension optional, file optional) overlaid
    /// with `SIGHTINGMAP__`-prefixed environment variables
    pub fn load_from(name: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(
                Environment::with_prefix("SIGHTINGMAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("report.suppressed"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), MapError> {
        self.map.validate()?;
        self.database.validate()?;
        for location in &self.locations {
            GeoPoint::checked(location.latitude, location.longitude).map_err(|e| {
                MapError::ConfigurationError {
                    message: format!("Saved location '{}': {}", location.name, e),
                }
            })?;
        }
        Ok(())
    }
}

impl MapConfig {
    pub fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.origin_lat, self.origin_lng)
    }

    fn validate(&self) -> Result<(), MapError> {
        GeoPoint::checked(self.origin_lat, self.origin_lng).map_err(|e| {
            MapError::ConfigurationError {
                message: format!("Map origin: {}", e),
            }
        })?;
        Ok(())
    }
}

impl ReportConfig {
    pub fn policy(&self) -> ReportPolicy {
        ReportPolicy {
            max_distance: self.max_distance,
            suppressed_max_distance: self.suppressed_max_distance,
        }
    }

    pub fn suppression_set(&self) -> HashSet<i32> {
        self.suppressed.iter().copied().collect()
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), MapError> {
        if self.url.trim().is_empty() {
            return Err(MapError::ConfigurationError {
                message: "Database url cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(MapError::ConfigurationError {
                message: "Database max_connections must be greater than zero".to_string(),
            });
        }
        if self.scanned_window.is_zero() {
            return Err(MapError::ConfigurationError {
                message: "Scanned window must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn database_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://localhost/map".to_string(),
            max_connections: 5,
            scanned_window: Duration::from_secs(900),
            run_migrations: false,
        }
    }

    fn map_config(lat: f64, lng: f64) -> MapConfig {
        MapConfig {
            origin_lat: lat,
            origin_lng: lng,
            fixed_location: false,
            gmaps_key: String::new(),
            locale: default_locale(),
        }
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("settings.toml"),
            r#"
            [map]
            origin_lat = 60.1699
            origin_lng = 24.9384
            gmaps_key = "file-key"

            [report]
            max_distance = 500

            [database]
            url = "postgres://file/map"
            scanned_window = 300

            [[locations]]
            latitude = 60.17
            longitude = 24.94
            name = "Market square"
            "#,
        )
        .unwrap();

        env::set_var("SIGHTINGMAP__DATABASE__URL", "postgres://env/map");
        env::set_var("SIGHTINGMAP__REPORT__SUPPRESSED", "16,19,41");
        env::set_var("SIGHTINGMAP__MAP__FIXED_LOCATION", "true");

        let name = dir.path().join("settings");
        let config = AppConfig::load_from(name.to_str().unwrap()).unwrap();

        assert_eq!(config.map.origin_lat, 60.1699);
        assert_eq!(config.map.gmaps_key, "file-key");
        assert_eq!(config.map.locale, "en");
        assert!(config.map.fixed_location);
        assert_eq!(config.report.max_distance, 500);
        assert_eq!(config.report.suppressed_max_distance, 150);
        assert_eq!(config.report.suppressed, vec![16, 19, 41]);
        assert_eq!(config.database.url, "postgres://env/map");
        assert_eq!(config.database.scanned_window, Duration::from_secs(300));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.server.bind, SocketAddr::from(([127, 0, 0, 1], 5000)));
        assert_eq!(config.locations.len(), 1);
        assert_eq!(config.locations[0].name, "Market square");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_validate() {
        assert!(database_config().validate().is_ok());
    }

    #[test]
    fn test_database_config_validate_empty_url() {
        let config = DatabaseConfig {
            url: " ".to_string(),
            ..database_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_config_validate_zero_window() {
        let config = DatabaseConfig {
            scanned_window: Duration::from_secs(0),
            ..database_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_map_config_validate_origin() {
        assert!(map_config(45.0, 7.0).validate().is_ok());
        assert!(map_config(95.0, 7.0).validate().is_err());
        assert!(map_config(45.0, 200.0).validate().is_err());
    }

    #[test]
    fn test_suppression_set() {
        let config = ReportConfig {
            suppressed: vec![16, 19, 16],
            ..ReportConfig::default()
        };
        let set = config.suppression_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&19));
        assert_eq!(config.policy(), ReportPolicy::default());
    }
}
