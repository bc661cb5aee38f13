//! Process configuration: defaults, an optional JSON file, then
//! `HOTEL_OPS_*` environment overrides.

use hotel_access::{AccessConfig, OutOfScopePolicy};
use hotel_history::{is_valid_date_format, FormatterOptions, HistoryConfig};
use hotel_types::User;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen: String,
    /// Upper bound on every storage and directory call.
    pub store_timeout_ms: u64,
    /// JSON array of users to seed the in-memory directory with.
    pub users_file: Option<PathBuf>,
    /// JSON object of raw id -> display name used by the history formatter.
    pub display_names_file: Option<PathBuf>,
    pub access: AccessConfig,
    pub history: HistoryConfig,
    pub formatter: FormatterOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8002".to_string(),
            store_timeout_ms: 5000,
            users_file: None,
            display_names_file: None,
            access: AccessConfig::default(),
            history: HistoryConfig::default(),
            formatter: FormatterOptions::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; `HOTEL_OPS_CONFIG` names a JSON file
    /// applied before the individual overrides.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("HOTEL_OPS_CONFIG") {
            Some(path) => read_json(Path::new(&path))?,
            None => AppConfig::default(),
        };
        if let Some(v) = lookup("HOTEL_OPS_LISTEN") {
            cfg.listen = v;
        }
        if let Some(v) = lookup("HOTEL_OPS_STORE_TIMEOUT_MS") {
            cfg.store_timeout_ms = parse_num("HOTEL_OPS_STORE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("HOTEL_OPS_USERS_FILE") {
            cfg.users_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HOTEL_OPS_DISPLAY_NAMES_FILE") {
            cfg.display_names_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HOTEL_OPS_CACHE_TTL_SECS") {
            cfg.access.cache_ttl_secs = parse_num("HOTEL_OPS_CACHE_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("HOTEL_OPS_OUT_OF_SCOPE") {
            cfg.access.out_of_scope =
                OutOfScopePolicy::parse(&v).ok_or(ConfigError::InvalidValue {
                    key: "HOTEL_OPS_OUT_OF_SCOPE",
                    value: v,
                })?;
        }
        if let Some(v) = lookup("HOTEL_OPS_UTC_OFFSET_MINUTES") {
            cfg.formatter.utc_offset_minutes = parse_num("HOTEL_OPS_UTC_OFFSET_MINUTES", &v)?;
        }
        if !is_valid_date_format(&cfg.formatter.date_format) {
            return Err(ConfigError::InvalidValue {
                key: "formatter.date_format",
                value: cfg.formatter.date_format,
            });
        }
        Ok(cfg)
    }

    pub fn load_users(&self) -> Result<Vec<User>, ConfigError> {
        match &self.users_file {
            Some(path) => read_json(path),
            None => Ok(Vec::new()),
        }
    }

    pub fn load_display_names(&self) -> Result<HashMap<String, String>, ConfigError> {
        match &self.display_names_file {
            Some(path) => read_json(path),
            None => Ok(HashMap::new()),
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_num<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
