//! Application-level configuration loading: rate limit budgets, timeouts and join code policy.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "YELL_BACK_CONFIG_PATH";

const DEFAULT_SOCKET_POINTS: u32 = 100;
const DEFAULT_API_POINTS: u32 = 30;
const DEFAULT_WINDOW_SECS: u64 = 60;
const DEFAULT_TRANSITION_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_JOIN_CODE_ATTEMPTS: u32 = 16;

/// Budget of events allowed per key inside a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Number of events accepted per window.
    pub points: u32,
    /// Length of the window.
    pub window: Duration,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Budget applied to every WebSocket connection.
    pub socket_rate_limit: RateLimitConfig,
    /// Budget applied to REST callers, keyed by IP.
    pub api_rate_limit: RateLimitConfig,
    /// Upper bound for a single session transition (lock + store I/O + apply).
    pub transition_timeout: Duration,
    /// How many join codes are drawn before session creation gives up.
    pub join_code_attempts: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        socket_points = app_config.socket_rate_limit.points,
                        api_points = app_config.api_rate_limit.points,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            socket_rate_limit: RateLimitConfig {
                points: DEFAULT_SOCKET_POINTS,
                window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            },
            api_rate_limit: RateLimitConfig {
                points: DEFAULT_API_POINTS,
                window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            },
            transition_timeout: Duration::from_millis(DEFAULT_TRANSITION_TIMEOUT_MS),
            join_code_attempts: DEFAULT_JOIN_CODE_ATTEMPTS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    socket_rate_limit: Option<RawRateLimit>,
    #[serde(default)]
    api_rate_limit: Option<RawRateLimit>,
    #[serde(default)]
    transition_timeout_ms: Option<u64>,
    #[serde(default)]
    join_code_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawRateLimit {
    points: u32,
    window_secs: u64,
}

impl From<RawRateLimit> for RateLimitConfig {
    fn from(value: RawRateLimit) -> Self {
        Self {
            points: value.points,
            window: Duration::from_secs(value.window_secs.max(1)),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            socket_rate_limit: value
                .socket_rate_limit
                .map(Into::into)
                .unwrap_or(defaults.socket_rate_limit),
            api_rate_limit: value
                .api_rate_limit
                .map(Into::into)
                .unwrap_or(defaults.api_rate_limit),
            transition_timeout: value
                .transition_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.transition_timeout),
            join_code_attempts: value
                .join_code_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.join_code_attempts),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
