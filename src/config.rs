use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Where habits are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database at `database_path`
    Sqlite,
    /// In-process demo data, discarded on exit
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{}' (expected sqlite or memory)", other)),
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Store backend
    pub backend: ConfigValue<Backend>,
    /// Simulated round trip for the memory backend, in milliseconds
    pub latency_ms: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    backend: Option<Backend>,
    latency_ms: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("habitrack.db"),
            ConfigSource::Default,
        );
        let mut backend = ConfigValue::new(Backend::Sqlite, ConfigSource::Default);
        let mut latency_ms = ConfigValue::new(
            habitrack_core::DEFAULT_LATENCY.as_millis() as u64,
            ConfigSource::Default,
        );
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Relative paths are relative to the config file
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(value) = file_config.backend {
                backend = ConfigValue::new(value, ConfigSource::File);
            }
            if let Some(value) = file_config.latency_ms {
                latency_ms = ConfigValue::new(value, ConfigSource::File);
            }
        }

        if let Ok(db_path) = std::env::var("HABITRACK_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("HABITRACK_BACKEND") {
            let parsed = value
                .parse::<Backend>()
                .map_err(|e| ConfigError::InvalidEnv("HABITRACK_BACKEND", e))?;
            backend = ConfigValue::new(parsed, ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("HABITRACK_LATENCY_MS") {
            let parsed = value.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnv("HABITRACK_LATENCY_MS", e.to_string())
            })?;
            latency_ms = ConfigValue::new(parsed, ConfigSource::Environment);
        }

        Ok(Self {
            database_path,
            backend,
            latency_ms,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/habitrack/
    /// - macOS: ~/Library/Application Support/habitrack/
    /// - Windows: %APPDATA%/habitrack/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("habitrack")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/habitrack/
    /// - macOS: ~/Library/Application Support/habitrack/
    /// - Windows: %APPDATA%/habitrack/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("habitrack")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(var, e) => {
                write!(f, "Invalid value for {}: {}", var, e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
