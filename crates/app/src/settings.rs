//! Handles settings for the application. Configuration is written in
//! `settings.toml`, every key can be overridden with a `FLEETLEDGER__`
//! environment variable (`FLEETLEDGER__SERVER__PORT=8080`).
//!
//! See `settings.toml` for the configuration.
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use engine::{CityCoordinates, DEFAULT_CIRCUITY_FACTOR};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub timezone: Tz,
    pub distance_timeout_ms: u64,
    pub lock_wait_ms: u64,
    pub max_pipeline_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            distance_timeout_ms: 3000,
            lock_wait_ms: 5000,
            max_pipeline_attempts: 3,
        }
    }
}

impl EngineSettings {
    pub fn distance_timeout(&self) -> Duration {
        Duration::from_millis(self.distance_timeout_ms)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Distance {
    pub circuity_factor: f64,
    pub cities: Vec<CityCoordinates>,
}

impl Default for Distance {
    fn default() -> Self {
        Self {
            circuity_factor: DEFAULT_CIRCUITY_FACTOR,
            cities: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub distance: Distance,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .add_source(Environment::with_prefix("FLEETLEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn full_settings() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            port = 3000
            database = { sqlite = "fleet.db" }

            [engine]
            timezone = "America/Chicago"
            lock_wait_ms = 250

            [distance]
            circuity_factor = 1.3
            [[distance.cities]]
            city = "Dallas"
            state = "TX"
            lat = 32.7767
            lon = -96.7970
            "#,
        );

        let server = settings.server.unwrap();
        assert!(matches!(server.database, Database::Sqlite(ref path) if path == "fleet.db"));
        assert_eq!(settings.engine.timezone, chrono_tz::America::Chicago);
        assert_eq!(settings.engine.lock_wait(), Duration::from_millis(250));
        assert_eq!(settings.engine.distance_timeout(), Duration::from_secs(3));
        assert_eq!(settings.distance.cities.len(), 1);
        assert_eq!(settings.distance.circuity_factor, 1.3);
    }

    #[test]
    fn engine_and_distance_sections_are_optional() {
        let settings = parse(
            r#"
            [app]
            level = "info"

            [server]
            port = 3000
            database = "memory"
            "#,
        );

        assert!(matches!(settings.server.unwrap().database, Database::Memory));
        assert_eq!(settings.engine.timezone, Tz::UTC);
        assert_eq!(settings.engine.max_pipeline_attempts, 3);
        assert!(settings.distance.cities.is_empty());
    }
}
