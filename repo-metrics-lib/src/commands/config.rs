use crate::Result;
use crate::facts::CollectorSettings;
use crate::facts::hosting::MAX_PAGE_SIZE;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "repo-metrics.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the GitHub REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Length in days of the trailing activity window
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Items per page when walking listings
    #[serde(default = "default_page_size")]
    pub page_size: u8,

    /// Maximum number of pages read from the issue search endpoint
    #[serde(default = "default_max_search_pages")]
    pub max_search_pages: u32,

    /// Attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts of a failed request
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Timeout of a single HTTP request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Column of the input CSV file holding repository links
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,
}

fn default_api_base_url() -> String {
    crate::facts::hosting::DEFAULT_API_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    crate::facts::hosting::DEFAULT_USER_AGENT.to_string()
}

/// Longest accepted activity window, roughly a century.
const MAX_WINDOW_DAYS: u32 = 36_500;

const fn default_window_days() -> u32 {
    180
}

const fn default_page_size() -> u8 {
    MAX_PAGE_SIZE
}

const fn default_max_search_pages() -> u32 {
    10
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_retry_delay() -> Duration {
    Duration::from_millis(1500)
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_identifier_column() -> String {
    "Github_links".to_string()
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// An explicit `config_path` must exist. Otherwise `repo-metrics.toml` is looked up
    /// in `base_dir`, and the defaults are used when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds invalid values
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading repo-metrics configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // No config file found, use defaults
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading repo-metrics configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Build the collector settings for a run starting at `now`.
    #[must_use]
    pub fn to_settings(&self, token: Option<String>, now: DateTime<Utc>) -> CollectorSettings {
        CollectorSettings {
            token,
            api_base_url: self.api_base_url.clone(),
            user_agent: self.user_agent.clone(),
            window_days: self.window_days,
            page_size: self.page_size,
            max_search_pages: self.max_search_pages,
            max_attempts: self.max_attempts,
            retry_delay: self.retry_delay,
            request_timeout: self.request_timeout,
            now,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range
    fn validate(&self) -> Result<()> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(app_err!("page_size must be between 1 and {MAX_PAGE_SIZE}, got {}", self.page_size));
        }

        if self.max_attempts == 0 {
            return Err(app_err!("max_attempts must be at least 1"));
        }

        if self.max_search_pages == 0 {
            return Err(app_err!("max_search_pages must be at least 1"));
        }

        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(app_err!("window_days must be between 1 and {MAX_WINDOW_DAYS}, got {}", self.window_days));
        }

        if url::Url::parse(&self.api_base_url).is_err() {
            return Err(app_err!("api_base_url is not a valid URL: '{}'", self.api_base_url));
        }

        if self.identifier_column.trim().is_empty() {
            return Err(app_err!("identifier_column must not be empty"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
