//! Configuration types for landscape-dl

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};
use crate::product::Product;

/// Environment variable overriding [`PollConfig::max_attempts`]
pub const ENV_MAX_TRIES: &str = "LCP_MAX_DOWNLOAD_TRIES";
/// Environment variable overriding [`PollConfig::interval`] (seconds)
pub const ENV_DOWNLOAD_WAIT: &str = "LCP_DOWNLOAD_WAIT";
/// Environment variable overriding [`OutputConfig::keep_archive`]
pub const ENV_KEEP_ARCHIVE: &str = "LCP_KEEP_ARCHIVE";
/// Environment variable overriding [`ServiceConfig::base_url`]
pub const ENV_BASE_URL: &str = "LANDFIRE_BASE_URL";

/// Remote service connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Scheme and host of the extraction service (default: "https://landfire.cr.usgs.gov")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for each service call and for connecting (default: 60 seconds)
    ///
    /// The artifact transfer is not bounded by it; use [`Config::deadline`].
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Area validation request settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// CHUNK_SIZE sent with the validation request (default: 250)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Product code to request (None = choose by region)
    #[serde(default)]
    pub product: Option<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            product: None,
        }
    }
}

/// Job status polling policy
///
/// Fixed interval, fixed attempt cap. No backoff and no jitter: the service
/// reports progress on its own schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of status queries (default: 30)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between status queries (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval: default_poll_interval(),
        }
    }
}

/// Output and scratch file handling
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// EPSG code for the output rasters (None = UTM zone of the area centre)
    #[serde(default)]
    pub target_epsg: Option<u32>,

    /// Keep the downloaded archive after extraction (default: false)
    #[serde(default)]
    pub keep_archive: bool,

    /// Directory for the scratch archive (None = system temp dir)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

/// Main configuration for [`LandscapeClient`](crate::LandscapeClient)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service connection settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Validation request settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Status polling policy
    #[serde(default)]
    pub poll: PollConfig,

    /// Output handling
    #[serde(default)]
    pub output: OutputConfig,

    /// Deadline for a whole acquisition (None = bounded only by the poll budget)
    #[serde(default, with = "optional_duration_serde")]
    pub deadline: Option<Duration>,
}

impl Config {
    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.service.base_url)
            .map_err(|e| Error::config("service.base_url", format!("invalid URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::config(
                "service.base_url",
                "URL cannot be used as a base",
            ));
        }
        if self.poll.max_attempts == 0 {
            return Err(Error::config(
                "poll.max_attempts",
                "at least one status check is required",
            ));
        }
        if self.validation.chunk_size == 0 {
            return Err(Error::config(
                "validation.chunk_size",
                "chunk size must be positive",
            ));
        }
        if let Some(product) = &self.validation.product
            && product.trim().is_empty()
        {
            return Err(Error::config("validation.product", "product code is empty"));
        }
        if let Some(product) = &self.validation.product
            && Product::by_code(product.trim()).is_none()
        {
            return Err(Error::config(
                "validation.product",
                format!("unknown product code: {product:?}"),
            ));
        }
        Ok(())
    }

    /// Overlay settings from the process environment
    ///
    /// Reads [`ENV_MAX_TRIES`], [`ENV_DOWNLOAD_WAIT`], [`ENV_KEEP_ARCHIVE`] and
    /// [`ENV_BASE_URL`]. Unset variables leave the current value untouched.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// [`Config::default`] with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_MAX_TRIES) {
            self.poll.max_attempts = value.trim().parse().map_err(|_| {
                Error::config(ENV_MAX_TRIES, format!("not a positive integer: {value:?}"))
            })?;
        }

        if let Some(value) = lookup(ENV_DOWNLOAD_WAIT) {
            let secs: f64 = value
                .trim()
                .parse()
                .map_err(|_| Error::config(ENV_DOWNLOAD_WAIT, format!("not a number: {value:?}")))?;
            self.poll.interval = Duration::try_from_secs_f64(secs).map_err(|_| {
                Error::config(
                    ENV_DOWNLOAD_WAIT,
                    format!("not a valid duration: {value:?}"),
                )
            })?;
        }

        if let Some(value) = lookup(ENV_KEEP_ARCHIVE) {
            self.output.keep_archive = parse_bool(&value)
                .ok_or_else(|| Error::config(ENV_KEEP_ARCHIVE, format!("not a boolean: {value:?}")))?;
        }

        if let Some(value) = lookup(ENV_BASE_URL) {
            self.service.base_url = value.trim().to_string();
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://landfire.cr.usgs.gov".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    concat!("landscape-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_chunk_size() -> u32 {
    250
}

fn default_max_attempts() -> u32 {
    30
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

// Durations travel as (possibly fractional) seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(D::Error::custom)
    }
}
