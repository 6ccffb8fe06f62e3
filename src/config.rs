use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "wardboard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_CACHE_CAPACITY: usize = 200;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Extra lock wait past the query timeout, so a locked database surfaces as
/// a timeout rather than an early `SQLITE_BUSY`.
pub const LOCK_WAIT_MARGIN: Duration = Duration::from_secs(2);

/// SQLite busy timeout for request connections bounded by `query_timeout`.
pub fn busy_timeout_for(query_timeout: Duration) -> Duration {
    query_timeout.saturating_add(LOCK_WAIT_MARGIN)
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "wardboard=info,tower_http=warn"
}

/// Default database location: `<data_dir>/wardboard/wardboard.db`.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_NAME).join("wardboard.db"))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Cannot determine a data directory; set WARDBOARD_DB_PATH")]
    NoDataDir,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    pub unit_code: String,
    pub admin_code: String,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub query_timeout: Duration,
    pub serve_stale: bool,
    pub utc_offset_hours: i32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind: SocketAddr = parse_or(
            "WARDBOARD_BIND",
            get("WARDBOARD_BIND"),
            DEFAULT_BIND.parse().ok(),
        )?;
        let db_path = match get("WARDBOARD_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path().ok_or(ConfigError::NoDataDir)?,
        };
        let unit_code =
            get("WARDBOARD_UNIT_CODE").ok_or(ConfigError::Missing("WARDBOARD_UNIT_CODE"))?;
        let admin_code =
            get("WARDBOARD_ADMIN_CODE").ok_or(ConfigError::Missing("WARDBOARD_ADMIN_CODE"))?;

        let ttl_secs: u64 = parse_or(
            "WARDBOARD_CACHE_TTL_SECS",
            get("WARDBOARD_CACHE_TTL_SECS"),
            Some(DEFAULT_CACHE_TTL_SECS),
        )?;
        let cache_capacity: usize = parse_or(
            "WARDBOARD_CACHE_CAPACITY",
            get("WARDBOARD_CACHE_CAPACITY"),
            Some(DEFAULT_CACHE_CAPACITY),
        )?;
        let timeout_secs: u64 = parse_or(
            "WARDBOARD_QUERY_TIMEOUT_SECS",
            get("WARDBOARD_QUERY_TIMEOUT_SECS"),
            Some(DEFAULT_QUERY_TIMEOUT_SECS),
        )?;
        let serve_stale: bool =
            parse_or("WARDBOARD_SERVE_STALE", get("WARDBOARD_SERVE_STALE"), Some(true))?;
        let utc_offset_hours: i32 = parse_or(
            "WARDBOARD_UTC_OFFSET_HOURS",
            get("WARDBOARD_UTC_OFFSET_HOURS"),
            Some(DEFAULT_UTC_OFFSET_HOURS),
        )?;

        if cache_capacity == 0 {
            return Err(invalid("WARDBOARD_CACHE_CAPACITY", "0"));
        }
        if timeout_secs == 0 {
            return Err(invalid("WARDBOARD_QUERY_TIMEOUT_SECS", "0"));
        }
        if !(-12..=14).contains(&utc_offset_hours) {
            return Err(invalid("WARDBOARD_UTC_OFFSET_HOURS", &utc_offset_hours.to_string()));
        }

        Ok(Self {
            bind,
            db_path,
            unit_code,
            admin_code,
            cache_ttl: Duration::from_secs(ttl_secs),
            cache_capacity,
            query_timeout: Duration::from_secs(timeout_secs),
            serve_stale,
            utc_offset_hours,
        })
    }
}

fn invalid(name: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| invalid(name, &value)),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}
