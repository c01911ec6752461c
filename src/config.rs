//! Application-level configuration loading: storage bounds, run queue sizing and paging limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PRESENTATION_TIMER_CONFIG_PATH";

const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_COMMAND_BUFFER: usize = 32;
const DEFAULT_SECTION_CLEAN_INTERVAL_SECS: u64 = 60;
const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Upper bound on every storage call, including the section load when a run is created.
    pub storage_timeout: Duration,
    /// Capacity of each run's command queue.
    pub command_buffer: usize,
    /// Period of the position compaction task; `None` disables it.
    pub section_clean_interval: Option<Duration>,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: u64,
    /// Largest page size a listing may ask for.
    pub max_page_size: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        storage_timeout_ms = app_config.storage_timeout.as_millis() as u64,
                        command_buffer = app_config.command_buffer,
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

    /// Parse a configuration document; absent keys keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    storage_timeout_ms: u64,
    command_buffer: usize,
    section_clean_interval_secs: u64,
    default_page_size: u64,
    max_page_size: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            storage_timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            section_clean_interval_secs: DEFAULT_SECTION_CLEAN_INTERVAL_SECS,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let max_page_size = value.max_page_size.max(1);
        Self {
            storage_timeout: Duration::from_millis(value.storage_timeout_ms.max(1)),
            // mpsc::channel panics on a zero capacity
            command_buffer: value.command_buffer.max(1),
            section_clean_interval: (value.section_clean_interval_secs > 0)
                .then(|| Duration::from_secs(value.section_clean_interval_secs)),
            default_page_size: value.default_page_size.clamp(1, max_page_size),
            max_page_size,
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
