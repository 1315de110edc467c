use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::map::{ImageSize, StaticMapParams, DEFAULT_MAX_URL_LENGTH};
use crate::poller::PollSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cannot read map API key from {path}: {source}")]
    ApiKeyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base: BaseConfig,
    #[serde(default)]
    pub poll: PollConfig,
    pub map: MapConfig,
    #[serde(default)]
    pub frame_log: FrameLogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

/// Serial-to-TCP bridge in front of the base's UART.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseConfig {
    pub address: String,
    #[serde(
        default = "default_read_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub read_timeout: Duration,
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(250)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval", deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    #[serde(
        default = "default_gnss_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub gnss_timeout: Duration,
    #[serde(
        default = "default_beacon_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub beacon_timeout: Duration,
    #[serde(default = "default_tick", deserialize_with = "deserialize_duration")]
    pub tick: Duration,
    #[serde(
        default = "default_first_poll_delay",
        deserialize_with = "deserialize_duration"
    )]
    pub first_poll_delay: Duration,
}

fn default_interval() -> Duration {
    Duration::from_secs(120)
}

fn default_gnss_timeout() -> Duration {
    Duration::from_secs(35)
}

fn default_beacon_timeout() -> Duration {
    Duration::from_secs(65)
}

fn default_tick() -> Duration {
    Duration::from_millis(250)
}

fn default_first_poll_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            gnss_timeout: default_gnss_timeout(),
            beacon_timeout: default_beacon_timeout(),
            tick: default_tick(),
            first_poll_delay: default_first_poll_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_pixel_radius")]
    pub pixel_radius: u32,
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
    #[serde(default = "default_maptype")]
    pub maptype: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub placeholder: Option<PathBuf>,
    #[serde(
        default = "default_fetch_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub fetch_timeout: Duration,
}

fn default_base_url() -> String {
    "https://maps.googleapis.com/maps/api/staticmap".to_string()
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_pixel_radius() -> u32 {
    200
}

fn default_max_url_length() -> usize {
    DEFAULT_MAX_URL_LENGTH
}

fn default_maptype() -> String {
    "hybrid".to_string()
}

fn default_format() -> String {
    "png".to_string()
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

impl MapConfig {
    /// Inline key first, then the key file with newlines removed.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        if let Some(key) = self.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(Some(key.to_string()));
            }
        }
        let Some(path) = &self.api_key_file else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ApiKeyFile {
            path: path.clone(),
            source,
        })?;
        let key = content.replace('\n', "").trim().to_string();
        Ok(if key.is_empty() { None } else { Some(key) })
    }

    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameLogConfig {
    #[serde(default = "default_log_folder")]
    pub folder: PathBuf,
}

fn default_log_folder() -> PathBuf {
    PathBuf::from(".")
}

impl Default for FrameLogConfig {
    fn default() -> Self {
        Self {
            folder: default_log_folder(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewTelemetry,
    FlushQueue,
    ControlMap,
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }

    /// Reports every problem found, not just the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let positive = [
            ("poll.interval", self.poll.interval),
            ("poll.gnss_timeout", self.poll.gnss_timeout),
            ("poll.beacon_timeout", self.poll.beacon_timeout),
            ("poll.tick", self.poll.tick),
            ("base.read_timeout", self.base.read_timeout),
            ("map.fetch_timeout", self.map.fetch_timeout),
        ];
        for (name, value) in positive {
            if value.is_zero() {
                problems.push(format!("{} must be greater than zero", name));
            }
        }

        if self.base.address.trim().is_empty() {
            problems.push("base.address is empty".to_string());
        }
        if self.map.width == 0 || self.map.height == 0 {
            problems.push(format!(
                "map size {}x{} is empty",
                self.map.width, self.map.height
            ));
        }
        if self.map.pixel_radius == 0 {
            problems.push("map.pixel_radius must be greater than zero".to_string());
        }
        if log::LevelFilter::from_str(&self.logging.level).is_err() {
            problems.push(format!("unknown logging.level {:?}", self.logging.level));
        }

        match self.map.resolve_api_key() {
            Ok(Some(_)) => {}
            Ok(None) => problems.push("map API key missing (map.api_key or map.api_key_file)".to_string()),
            Err(e) => problems.push(e.to_string()),
        }

        let mut seen = HashSet::new();
        for key in &self.api_keys {
            if !seen.insert(key.key.as_str()) {
                problems.push(format!("duplicate API key for {}", key.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            default_interval: self.poll.interval,
            first_poll_delay: self.poll.first_poll_delay,
            gnss_timeout: self.poll.gnss_timeout,
            beacon_timeout: self.poll.beacon_timeout,
            pixel_radius: self.map.pixel_radius,
        }
    }

    pub fn static_map_params(&self) -> Result<StaticMapParams, ConfigError> {
        let api_key = self.map.resolve_api_key()?.ok_or_else(|| {
            ConfigError::Invalid(vec!["map API key missing".to_string()])
        })?;
        Ok(StaticMapParams {
            base_url: self.map.base_url.clone(),
            api_key,
            size: self.map.size(),
            maptype: self.map.maptype.clone(),
            format: self.map.format.clone(),
            max_url_length: self.map.max_url_length,
        })
    }
}
