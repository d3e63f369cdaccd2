use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use armview_lib::ImageSize;
use derive_more::{Display, From};
use simplelog::LevelFilter;
use yaml_rust::{ScanError, Yaml, YamlLoader};

use crate::source::{FileSource, HttpSource, SnapshotSource};
use crate::viewport::ImageDimensions;

const DEFAULT_URL: &str = "http://127.0.0.1:8000/server/outputs/right_arm_latest.json";

/// Upper bound for any configured period, one day.
const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Where snapshots come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    Http(String),
    File(PathBuf),
}

impl SourceSpec {
    pub fn open(&self, request_timeout: Duration) -> Box<dyn SnapshotSource + Send> {
        match self {
            Self::Http(url) => Box::new(HttpSource::new(url.clone(), request_timeout)),
            Self::File(path) => Box::new(FileSource::new(path.clone())),
        }
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub source: SourceSpec,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Exponential smoothing constant, in 1/seconds.
    pub smoothing_rate: f64,
    /// Image size assumed until a snapshot announces one.
    pub default_image: ImageDimensions,
    pub max_canvas_width: f64,
    pub window_size: [f32; 2],
    pub log_level: LevelFilter,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            source: SourceSpec::Http(DEFAULT_URL.to_string()),
            poll_interval: Duration::from_millis(500),
            request_timeout: Duration::from_millis(2000),
            smoothing_rate: 10.0,
            default_image: ImageDimensions::DEFAULT,
            max_canvas_width: 640.0,
            window_size: [760.0, 720.0],
            log_level: LevelFilter::Info,
        }
    }
}

#[derive(Debug, Display, From)]
pub enum ConfigError {
    #[display("invalid YAML: {_0}")]
    #[from]
    Yaml(ScanError),
    #[display("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Yaml(e) => Some(e),
            Self::Invalid { .. } => None,
        }
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

/// Parses the optional first command line arg as path to a yaml config file.
/// With no argument, every setting takes its default.
pub fn config_from_command_line() -> Result<ClientConfig> {
    match std::env::args().nth(1) {
        Some(path) => load_config(PathBuf::from(path)),
        None => Ok(ClientConfig::default()),
    }
}

/// Load and parse the config file at path.
pub fn load_config(path: PathBuf) -> Result<ClientConfig> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("parsing config file {}", path.display()))
}

pub fn parse_config(text: &str) -> Result<ClientConfig, ConfigError> {
    let docs = YamlLoader::load_from_str(text)?;
    let mut cfg = ClientConfig::default();
    let Some(doc) = docs.first() else {
        return Ok(cfg);
    };
    if doc.is_null() {
        return Ok(cfg);
    }
    if doc.as_hash().is_none() {
        return Err(invalid("config", "expected a mapping of settings"));
    }

    if let Some(url) = string(doc, "url")? {
        cfg.source = SourceSpec::Http(url);
    }
    if let Some(path) = string(doc, "file")? {
        cfg.source = SourceSpec::File(PathBuf::from(path));
    }
    if let Some(period) = millis(doc, "poll_interval_ms")? {
        cfg.poll_interval = period;
    }
    if let Some(period) = millis(doc, "request_timeout_ms")? {
        cfg.request_timeout = period;
    }
    if let Some(rate) = positive(doc, "smoothing_rate")? {
        cfg.smoothing_rate = rate;
    }
    let width = positive(doc, "default_image_width")?;
    let height = positive(doc, "default_image_height")?;
    if width.is_some() || height.is_some() {
        let size = ImageSize::new(
            width.unwrap_or(cfg.default_image.width()),
            height.unwrap_or(cfg.default_image.height()),
        )
        .ok_or_else(|| invalid("default_image_width", "image size out of range"))?;
        cfg.default_image = ImageDimensions::new(size);
    }
    if let Some(width) = positive(doc, "max_canvas_width")? {
        cfg.max_canvas_width = width;
    }
    if let Some(width) = positive(doc, "window_width")? {
        cfg.window_size[0] = width as f32;
    }
    if let Some(height) = positive(doc, "window_height")? {
        cfg.window_size[1] = height as f32;
    }
    if let Some(level) = string(doc, "log_level")? {
        cfg.log_level = LevelFilter::from_str(&level)
            .map_err(|_| invalid("log_level", format!("unknown level \"{}\"", level)))?;
    }
    Ok(cfg)
}

/// A trimmed string setting, if set.
fn string(doc: &Yaml, key: &'static str) -> Result<Option<String>, ConfigError> {
    match &doc[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::String(s) => Ok(Some(s.trim().to_string())),
        other => Err(invalid(key, format!("expected a string, got {:?}", other))),
    }
}

/// A positive period given in milliseconds, no longer than MAX_PERIOD.
fn millis(doc: &Yaml, key: &'static str) -> Result<Option<Duration>, ConfigError> {
    let Some(ms) = positive(doc, key)? else {
        return Ok(None);
    };
    match Duration::try_from_secs_f64(ms / 1000.0) {
        Ok(period) if period <= MAX_PERIOD => Ok(Some(period)),
        _ => Err(invalid(
            key,
            format!("must be at most {} ms, got {}", MAX_PERIOD.as_millis(), ms),
        )),
    }
}

/// A finite, strictly positive number setting, if set.
fn positive(doc: &Yaml, key: &'static str) -> Result<Option<f64>, ConfigError> {
    let value = match &doc[key] {
        Yaml::BadValue | Yaml::Null => return Ok(None),
        Yaml::Integer(i) => *i as f64,
        real @ Yaml::Real(_) => real
            .as_f64()
            .ok_or_else(|| invalid(key, "unparseable number"))?,
        other => return Err(invalid(key, format!("expected a number, got {:?}", other))),
    };
    if value.is_finite() && value > 0.0 {
        Ok(Some(value))
    } else {
        Err(invalid(key, format!("must be positive, got {}", value)))
    }
}
