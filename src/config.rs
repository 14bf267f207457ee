use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub data: DataConfig,
    pub location: LocationConfig,
    pub search: SearchConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DataConfig {
    pub locations_url: String,        // Location reference collection
    pub events_url: String,           // Event collection
    pub request_timeout_seconds: u64, // Per-request HTTP timeout
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LocationConfig {
    pub probe_address: String, // IP handed to the geolocation service
    pub fix_timeout_ms: u64,   // Budget for the live fix
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SearchConfig {
    pub default_limit: usize, // Results shown when no limit is given
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        let config_path = "config.toml";

        if let Ok(content) = fs::read_to_string(config_path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to parse config.toml: {}. Using defaults.", e),
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(config_path, toml_string).is_err() {
                    warn!("Could not write default config.toml to disk.");
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                locations_url: "http://localhost:8080/locations.json".to_string(),
                events_url: "http://localhost:8080/classes.json".to_string(),
                request_timeout_seconds: 10,
            },
            location: LocationConfig {
                probe_address: "1.1.1.1".to_string(),
                fix_timeout_ms: 5000,
            },
            search: SearchConfig { default_limit: 3 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&serialized).expect("parse");
        assert_eq!(parsed.location.fix_timeout_ms, 5000);
        assert_eq!(parsed.search.default_limit, 3);
    }
}
