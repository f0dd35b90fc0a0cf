//! Monitor configuration.
//!
//! The monitor shares the host application's `asm3.conf`: a flat
//! `key=value` file. The file is located once at startup, turned into a
//! [`MonitorConfig`], and that struct is handed to the monitor.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use shelter_core::units::{UnitPolicy, DEFAULT_GRAM_THRESHOLD};
use sqlx::postgres::PgConnectOptions;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ASM3_CONF";

/// Config file name next to the executable.
const INSTALL_CONFIG_NAME: &str = "asm3.conf";

/// Config file name in the home directory.
const HOME_CONFIG_NAME: &str = ".asm3.conf";

/// System-wide config file.
const SYSTEM_CONFIG_PATH: &str = "/etc/asm3.conf";

/// Default delay between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default limit on opening the per-tick database connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Error reading config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Flat key=value file
// ---------------------------------------------------------------------------

/// Parsed contents of an `asm3.conf` file.
#[derive(Debug, Clone, Default)]
pub struct AsmConfig {
    values: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl AsmConfig {
    /// Parse config text.
    ///
    /// A `#` starts a comment unless the line contains `{` (JSON values may
    /// legitimately contain `#`). Lines without `=` are ignored. Keys and
    /// values are split on the first `=` and trimmed.
    pub fn parse(contents: &str) -> Self {
        let mut values = HashMap::new();

        for raw in contents.lines() {
            let line = match raw.find('#') {
                Some(idx) if !raw.contains('{') => &raw[..idx],
                _ => raw,
            };
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Self {
            values,
            source: None,
        }
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents);
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Locate and load the config file, falling back to an empty config.
    ///
    /// Never fails: a missing or unreadable file is logged and every key
    /// then takes its default.
    pub fn load(search: &ConfigSearch) -> Self {
        let Some(path) = search.locate() else {
            tracing::warn!("No config file found, using defaults");
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// File the values came from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Parse a value, returning `default` when the key is absent or empty.
    pub fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.values.get(key).map(String::as_str) {
            None | Some("") => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Like [`get_parsed`](Self::get_parsed), but logs invalid values and
    /// falls back to `default`.
    fn get_or_default<T: FromStr + fmt::Display + Copy>(&self, key: &str, default: T) -> T {
        self.get_parsed(key, default).unwrap_or_else(|e| {
            tracing::warn!(error = %e, %default, "Ignoring invalid config value");
            default
        })
    }
}

// ---------------------------------------------------------------------------
// Config file search
// ---------------------------------------------------------------------------

/// Where to look for the config file.
///
/// Order: the `ASM3_CONF` path (if set and non-empty, used even when it
/// does not exist), then the first existing of `asm3.conf` next to the
/// executable, `~/.asm3.conf` and `/etc/asm3.conf`.
#[derive(Debug, Clone, Default)]
pub struct ConfigSearch {
    pub explicit: Option<PathBuf>,
    pub fallbacks: Vec<PathBuf>,
}

impl ConfigSearch {
    /// Build the search list from the process environment.
    pub fn from_environment() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let mut fallbacks = Vec::new();
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            fallbacks.push(dir.join(INSTALL_CONFIG_NAME));
        }
        if let Some(home) = dirs::home_dir() {
            fallbacks.push(home.join(HOME_CONFIG_NAME));
        }
        fallbacks.push(PathBuf::from(SYSTEM_CONFIG_PATH));

        Self {
            explicit,
            fallbacks,
        }
    }

    /// Resolve the config file to read, if any.
    pub fn locate(&self) -> Option<PathBuf> {
        if let Some(explicit) = &self.explicit {
            return Some(explicit.clone());
        }
        self.fallbacks.iter().find(|p| p.is_file()).cloned()
    }
}

// ---------------------------------------------------------------------------
// Typed monitor configuration
// ---------------------------------------------------------------------------

/// Database connection settings.
#[derive(Clone)]
pub struct DbSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
    /// How long a tick keeps retrying the connection before giving up.
    pub connect_timeout: Duration,
}

impl DbSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.username)
            .password(&self.password)
    }
}

impl Default for DbSettings {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            name: "asm".into(),
            username: "asm3".into(),
            password: "asm3".into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl fmt::Debug for DbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Everything the monitor needs to run.
///
/// | Key                         | Default     |
/// |-----------------------------|-------------|
/// | `db_host`                   | `localhost` |
/// | `db_port`                   | `5432`      |
/// | `db_name`                   | `asm`       |
/// | `db_username`               | `asm3`      |
/// | `db_password`               | `asm3`      |
/// | `db_connect_timeout_secs`   | `30`        |
/// | `weight_poll_interval_secs` | `60`        |
/// | `weight_gram_threshold`     | `10`        |
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub db: DbSettings,
    pub poll_interval: Duration,
    pub unit_policy: UnitPolicy,
}

impl MonitorConfig {
    pub fn from_asm_config(cfg: &AsmConfig) -> Self {
        let defaults = DbSettings::default();

        let db = DbSettings {
            host: cfg.get_string("db_host", &defaults.host),
            port: cfg.get_or_default("db_port", defaults.port),
            name: cfg.get_string("db_name", &defaults.name),
            username: cfg.get_string("db_username", &defaults.username),
            password: cfg.get_string("db_password", &defaults.password),
            connect_timeout: Duration::from_secs(cfg.get_or_default(
                "db_connect_timeout_secs",
                defaults.connect_timeout.as_secs(),
            )),
        };

        let poll_secs = cfg.get_or_default(
            "weight_poll_interval_secs",
            DEFAULT_POLL_INTERVAL.as_secs(),
        );

        let threshold = cfg.get_or_default("weight_gram_threshold", DEFAULT_GRAM_THRESHOLD);
        let unit_policy = UnitPolicy::with_gram_threshold(threshold).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring invalid gram threshold");
            UnitPolicy::default()
        });

        Self {
            db,
            poll_interval: Duration::from_secs(poll_secs),
            unit_policy,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db: DbSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            unit_policy: UnitPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_keys_and_strips_comments() {
        let cfg = AsmConfig::parse(
            "# database\n\
             db_host = db.shelter.local   # primary\n\
             db_port=5433\n\
             not a setting\n\
             db_password = p=ss\n",
        );
        assert_eq!(cfg.get_string("db_host", ""), "db.shelter.local");
        assert_eq!(cfg.get_parsed("db_port", 0u16).unwrap(), 5433);
        assert_eq!(cfg.get_string("db_password", ""), "p=ss");
        assert_eq!(cfg.get_string("not a setting", "absent"), "absent");
    }

    #[test]
    fn brace_lines_keep_hashes() {
        let cfg = AsmConfig::parse("colours = {\"accent\": \"#ff0000\"}\n");
        assert_eq!(cfg.get_string("colours", ""), "{\"accent\": \"#ff0000\"}");
    }

    #[test]
    fn empty_value_uses_default() {
        let cfg = AsmConfig::parse("db_port=\n");
        assert_eq!(cfg.get_parsed("db_port", 5432u16).unwrap(), 5432);
    }

    #[test]
    fn invalid_number_is_an_error() {
        let cfg = AsmConfig::parse("db_port=fivefourthree\n");
        assert_matches!(
            cfg.get_parsed("db_port", 5432u16),
            Err(ConfigError::InvalidValue { key, .. }) if key == "db_port"
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let search = ConfigSearch {
            explicit: None,
            fallbacks: vec![dir.path().join("asm3.conf"), dir.path().join(".asm3.conf")],
        };

        let cfg = AsmConfig::load(&search);
        assert!(cfg.source().is_none());

        let monitor = MonitorConfig::from_asm_config(&cfg);
        assert_eq!(monitor.db.host, "localhost");
        assert_eq!(monitor.db.port, 5432);
        assert_eq!(monitor.db.name, "asm");
        assert_eq!(monitor.db.username, "asm3");
        assert_eq!(monitor.db.password, "asm3");
        assert_eq!(monitor.poll_interval, Duration::from_secs(60));
        assert_eq!(monitor.unit_policy, UnitPolicy::default());
    }

    #[test]
    fn unreadable_explicit_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let search = ConfigSearch {
            explicit: Some(dir.path().join("missing.conf")),
            fallbacks: Vec::new(),
        };
        let cfg = AsmConfig::load(&search);
        assert!(cfg.source().is_none());
        assert_eq!(cfg.get_string("db_host", "localhost"), "localhost");
    }

    #[test]
    fn first_existing_fallback_wins() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join(".asm3.conf");
        let system = dir.path().join("etc.conf");
        std::fs::write(&home, "db_name=home\n").unwrap();
        std::fs::write(&system, "db_name=system\n").unwrap();

        let search = ConfigSearch {
            explicit: None,
            fallbacks: vec![dir.path().join("asm3.conf"), home.clone(), system],
        };
        assert_eq!(search.locate(), Some(home.clone()));

        let cfg = AsmConfig::load(&search);
        assert_eq!(cfg.source(), Some(home.as_path()));
        assert_eq!(cfg.get_string("db_name", ""), "home");
    }

    #[test]
    fn explicit_path_takes_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db_host=explicit").unwrap();

        let fallback = tempfile::NamedTempFile::new().unwrap();
        let search = ConfigSearch {
            explicit: Some(file.path().to_path_buf()),
            fallbacks: vec![fallback.path().to_path_buf()],
        };
        let cfg = AsmConfig::load(&search);
        assert_eq!(cfg.get_string("db_host", ""), "explicit");
    }

    #[test]
    fn monitor_settings_from_file() {
        let cfg = AsmConfig::parse(
            "db_host=pg\ndb_port=6543\ndb_connect_timeout_secs=5\n\
             weight_poll_interval_secs=300\nweight_gram_threshold=25\n",
        );
        let monitor = MonitorConfig::from_asm_config(&cfg);
        assert_eq!(monitor.db.host, "pg");
        assert_eq!(monitor.db.port, 6543);
        assert_eq!(monitor.db.connect_timeout, Duration::from_secs(5));
        assert_eq!(monitor.poll_interval, Duration::from_secs(300));
        assert_eq!(monitor.unit_policy.gram_threshold(), 25.0);
    }

    #[test]
    fn invalid_values_degrade_to_defaults() {
        let cfg = AsmConfig::parse("db_port=abc\nweight_gram_threshold=-3\n");
        let monitor = MonitorConfig::from_asm_config(&cfg);
        assert_eq!(monitor.db.port, 5432);
        assert_eq!(monitor.unit_policy, UnitPolicy::default());
    }

    #[test]
    fn debug_redacts_password() {
        let settings = DbSettings {
            password: "hunter2".into(),
            ..DbSettings::default()
        };
        let rendered = format!("{settings:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }
}
