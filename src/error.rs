use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by the remote gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("rejected by backend: {0}")]
    Validation(String),
    #[error("{table} {id} not found")]
    NotFound { table: &'static str, id: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("record has no id")]
    MissingId,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid backend url {0:?}, expected http:// or https://")]
    InvalidUrl(String),
    #[error("invalid timeout {0:?}")]
    InvalidTimeout(String),
}
