use std::path::PathBuf;

use chrono_tz::Tz;

use crate::schedule::GridOptions;

/// Application-level constants
pub const APP_NAME: &str = "Slotbook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TIMEZONE: Tz = Tz::UTC;
/// Page size of range fetches.
pub const DEFAULT_PER_PAGE: u32 = 100;
const MAX_PER_PAGE: u32 = 1000;

/// Get the application data directory
/// ~/Slotbook/ on all platforms. `None` when no home directory is known.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Where the login token is kept between runs.
pub fn session_file() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("session.json"))
}

/// Default log filter. Crate logs at debug in debug builds.
pub fn default_log_filter() -> String {
    let level = if cfg!(debug_assertions) { "debug" } else { "info" };
    format!("slotbook={level},slotbook_lib={level},warn")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} is not valid: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Runtime settings, read from `SLOTBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub timezone: Tz,
    pub grid: GridOptions,
    pub per_page: u32,
    /// Credentials for a non-interactive login when no session is saved.
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            timezone: DEFAULT_TIMEZONE,
            grid: GridOptions::default(),
            per_page: DEFAULT_PER_PAGE,
            email: None,
            password: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get("SLOTBOOK_API_URL") {
            reqwest::Url::parse(&url).map_err(|e| invalid("SLOTBOOK_API_URL", &url, e))?;
            config.api_url = url;
        }
        if let Some(raw) = get("SLOTBOOK_TIMEOUT_SECS") {
            config.timeout_secs = match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                Ok(_) => return Err(invalid("SLOTBOOK_TIMEOUT_SECS", &raw, "must be positive")),
                Err(e) => return Err(invalid("SLOTBOOK_TIMEOUT_SECS", &raw, e)),
            };
        }
        if let Some(raw) = get("SLOTBOOK_TIMEZONE") {
            config.timezone = raw
                .parse::<Tz>()
                .map_err(|e| invalid("SLOTBOOK_TIMEZONE", &raw, e))?;
        }
        if let Some(raw) = get("SLOTBOOK_FIRST_HOUR") {
            config.grid.first_hour = parse_hour("SLOTBOOK_FIRST_HOUR", &raw)?;
        }
        if let Some(raw) = get("SLOTBOOK_LAST_HOUR") {
            config.grid.last_hour = parse_hour("SLOTBOOK_LAST_HOUR", &raw)?;
        }
        if config.grid.first_hour > config.grid.last_hour {
            return Err(invalid(
                "SLOTBOOK_FIRST_HOUR",
                &config.grid.first_hour.to_string(),
                format!("must not be after last hour {}", config.grid.last_hour),
            ));
        }
        if let Some(raw) = get("SLOTBOOK_PER_PAGE") {
            config.per_page = match raw.parse::<u32>() {
                Ok(n) if (1..=MAX_PER_PAGE).contains(&n) => n,
                Ok(_) => {
                    return Err(invalid(
                        "SLOTBOOK_PER_PAGE",
                        &raw,
                        format!("must be between 1 and {MAX_PER_PAGE}"),
                    ))
                }
                Err(e) => return Err(invalid("SLOTBOOK_PER_PAGE", &raw, e)),
            };
        }
        config.email = get("SLOTBOOK_EMAIL");
        config.password = lookup("SLOTBOOK_PASSWORD").filter(|p| !p.is_empty());

        Ok(config)
    }
}

fn parse_hour(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(hour) if hour <= 23 => Ok(hour),
        Ok(_) => Err(invalid(key, raw, "must be 0-23")),
        Err(e) => Err(invalid(key, raw, e)),
    }
}
