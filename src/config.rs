//! Configuration loader and validator for the photo review stack.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::gesture::GestureThresholds;

static EVENT_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,62}$").expect("valid slug regex"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub gestures: GestureThresholds,
    pub upload: Upload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Holds the staging database and captured files.
    pub data_dir: String,
    /// Event slug; photos are uploaded under this namespace.
    pub event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Upload {
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Cap on simultaneous uploads. Unset means unbounded.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl App {
    /// `data_dir` with a leading `~/` expanded.
    pub fn resolved_data_dir(&self) -> String {
        match (self.data_dir.strip_prefix("~/"), std::env::var("HOME")) {
            (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
            _ => self.data_dir.clone(),
        }
    }

    pub fn database_url(&self) -> String {
        format!("sqlite://{}/staging.db", self.resolved_data_dir())
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.app.resolved_data_dir())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if !EVENT_SLUG.is_match(&cfg.app.event) {
        return Err(ConfigError::Invalid(
            "app.event must be a lowercase slug (a-z, 0-9, '-')",
        ));
    }

    let g = &cfg.gestures;
    if !(g.commit_fraction > 0.0 && g.commit_fraction <= 1.0) {
        return Err(ConfigError::Invalid("gestures.commit_fraction must be in (0, 1]"));
    }
    if !(g.activation_fraction > 0.0 && g.activation_fraction <= g.commit_fraction) {
        return Err(ConfigError::Invalid(
            "gestures.activation_fraction must be in (0, commit_fraction]",
        ));
    }
    if !(g.velocity > 0.0) {
        return Err(ConfigError::Invalid("gestures.velocity must be > 0"));
    }
    if !(g.navigate_distance > 0.0) {
        return Err(ConfigError::Invalid("gestures.navigate_distance must be > 0"));
    }

    let endpoint = cfg.upload.endpoint.trim();
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(ConfigError::Invalid("upload.endpoint must be an http(s) URL"));
    }
    if cfg.upload.timeout_secs == 0 {
        return Err(ConfigError::Invalid("upload.timeout_secs must be > 0"));
    }
    if cfg.upload.max_concurrent == Some(0) {
        return Err(ConfigError::Invalid("upload.max_concurrent must be > 0 when set"));
    }
    if matches!(&cfg.upload.token, Some(t) if t.trim().is_empty()) {
        return Err(ConfigError::Invalid("upload.token must be non-empty when set"));
    }

    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  event: "summer-wedding"

gestures:
  commit_fraction: 0.25
  activation_fraction: 0.15
  velocity: 400
  navigate_distance: 100

upload:
  endpoint: "https://media.example.com/api/"
  token: "YOUR_UPLOAD_TOKEN"
  timeout_secs: 30
"#
}
