use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const KEY_VAR: &str = "SUPABASE_KEY";
pub const TIMEOUT_VAR: &str = "TASKDECK_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub url: String,
    pub api_key: String,
    pub timeout: Duration,
}

// config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskdeck").join("config.toml"))
}

impl Config {
    /// Reads `.env`, the user config file and the process environment, in
    /// increasing order of precedence.
    pub fn load() -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();

        let file = match config_path() {
            Some(path) => FileConfig::read(&path)?,
            None => None,
        };

        Config::from_sources(|name| env::var(name).ok(), file.unwrap_or_default())
    }

    pub fn from_sources<F>(lookup: F, file: FileConfig) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let url = non_empty(lookup(URL_VAR))
            .or(non_empty(file.url))
            .ok_or(ConfigError::Missing(URL_VAR))?;
        let api_key = non_empty(lookup(KEY_VAR))
            .or(non_empty(file.api_key))
            .ok_or(ConfigError::Missing(KEY_VAR))?;

        let url = url.trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url));
        }

        let timeout_secs = match non_empty(lookup(TIMEOUT_VAR)) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Config {
            url,
            api_key: api_key.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
