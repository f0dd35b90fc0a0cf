use std::net::IpAddr;
use std::path::PathBuf;

/// Invalid server environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults matching the care form's expectations, so the
/// server runs with no environment at all.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: IpAddr,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Directory holding one JSON file per submission.
    pub data_dir: PathBuf,
    /// Root for static files such as the care form page.
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var         | Default              |
    /// |-----------------|----------------------|
    /// | `HOST`          | `0.0.0.0`            |
    /// | `PORT`          | `8080`               |
    /// | `CARE_DATA_DIR` | `hedgehog_care_data` |
    /// | `STATIC_DIR`    | `.`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host_raw = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let host = host_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "HOST",
            expected: "an IP address",
            value: host_raw.clone(),
        })?;

        let port_raw = std::env::var("PORT").unwrap_or_else(|_| "8080".into());
        let port = port_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "PORT",
            expected: "a valid u16",
            value: port_raw.clone(),
        })?;

        let data_dir = std::env::var("CARE_DATA_DIR")
            .unwrap_or_else(|_| "hedgehog_care_data".into())
            .into();

        let static_dir = std::env::var("STATIC_DIR")
            .unwrap_or_else(|_| ".".into())
            .into();

        Ok(Self {
            host,
            port,
            data_dir,
            static_dir,
        })
    }
}
