use clap::ArgMatches;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_PATH: &str = "/modbus-explorer/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Service identification
    pub service_name: String,
    pub version: String,

    // HTTP API settings
    pub api: ApiConfig,

    // Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,      // actix default (one per core) when unset
    pub base_path: String,
    pub json_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: None,
            base_path: DEFAULT_BASE_PATH.to_string(),
            json_limit_bytes: 64 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "Modbus Explorer".to_string(),
            version: crate::VERSION.to_string(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Config file named by `--config` (or defaults), then command line overrides.
    pub fn load(matches: &ArgMatches) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_matches(matches);
        Ok(config)
    }

    pub fn apply_matches(&mut self, matches: &ArgMatches) {
        if let Some(host) = matches.get_one::<String>("host") {
            self.api.host = host.clone();
        }
        if let Some(port) = matches.get_one::<u16>("port") {
            self.api.port = *port;
        }
        if let Some(level) = matches.get_one::<String>("log-level") {
            self.logging.level = level.clone();
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Set version if not present
        if config.version.is_empty() {
            config.version = crate::VERSION.to_string();
        }

        config.api.base_path = normalize_base_path(&config.api.base_path);
        debug!("⚙️  Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn base_path(&self) -> &str {
        &self.api.base_path
    }
}

/// Leading slash, no trailing slash. An empty path mounts at the root.
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
