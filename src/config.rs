//! Configuration loading and validation for genbench.
//!
//! A single `Settings` describes one benchmark target: the backend to hit
//! and the scheduler knobs that bound how hard to hit it. Settings load
//! from a file (TOML or YAML, sniffed by extension), then are overridden
//! by `GENBENCH_*` environment variables, then by CLI flags — in that
//! order, last writer wins.

use genbench_backend::BackendConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported config file extension: {0} (expected .toml, .yaml, or .yml)")]
    UnsupportedExtension(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Scheduler-level knobs, independent of any one backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub max_worker_processes: usize,
    pub max_concurrency: Option<usize>,
    pub default_async_loop_sleep: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_worker_processes: 16,
            max_concurrency: None,
            default_async_loop_sleep: Duration::from_micros(500),
            request_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// The full configuration surface for a benchmark run: one backend target
/// plus the scheduler knobs that bound it. Mirrors
/// `genbench_backend::BackendConfig` field-for-field so loading never
/// needs a lossy translation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub target: String,
    pub model: String,
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub http2: bool,
    pub follow_redirects: bool,
    pub max_output_tokens: Option<u32>,
    pub extra_query: HashMap<String, HashMap<String, String>>,
    pub extra_body: serde_json::Map<String, serde_json::Value>,
    pub connect_timeout: Duration,

    #[serde(flatten)]
    pub scheduler: SchedulerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let backend = BackendConfig::default();
        Self {
            target: backend.target,
            model: "default".to_string(),
            api_key: backend.api_key,
            organization: backend.organization,
            project: backend.project,
            http2: backend.http2,
            follow_redirects: backend.follow_redirects,
            max_output_tokens: backend.max_output_tokens,
            extra_query: backend.extra_query,
            extra_body: backend.extra_body,
            connect_timeout: backend.connect_timeout,
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the first default location found
    /// (`./genbench.toml`, `./.genbench.toml`, then
    /// `$XDG_CONFIG_HOME/genbench/config.toml`), falling back to defaults
    /// if none exist.
    pub fn load_default() -> Result<Self> {
        for candidate in Self::default_locations() {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![
            PathBuf::from("genbench.toml"),
            PathBuf::from(".genbench.toml"),
            PathBuf::from("genbench.yaml"),
            PathBuf::from(".genbench.yaml"),
        ];
        if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
            locations.push(Path::new(&config_home).join("genbench").join("config.toml"));
        } else if let Some(home) = std::env::var_os("HOME") {
            locations.push(
                Path::new(&home)
                    .join(".config")
                    .join("genbench")
                    .join("config.toml"),
            );
        }
        locations
    }

    /// Loads settings from an explicit path, sniffing format by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            }),
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })
            }
            other => Err(ConfigError::UnsupportedExtension(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Applies `GENBENCH_*` environment variable overrides on top of
    /// whatever was loaded from file.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("GENBENCH_TARGET") {
            self.target = v;
        }
        if let Ok(v) = std::env::var("GENBENCH_MODEL") {
            self.model = v;
        }
        if let Ok(v) = std::env::var("GENBENCH_API_KEY") {
            self.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("GENBENCH_ORGANIZATION") {
            self.organization = Some(v);
        }
        if let Ok(v) = std::env::var("GENBENCH_PROJECT") {
            self.project = Some(v);
        }
        if let Ok(v) = std::env::var("GENBENCH_MAX_CONCURRENCY") {
            self.scheduler.max_concurrency = v.parse().ok();
        }
        self
    }

    pub fn to_backend_config(&self) -> BackendConfig {
        BackendConfig {
            target: self.target.clone(),
            api_key: self.api_key.clone(),
            organization: self.organization.clone(),
            project: self.project.clone(),
            http2: self.http2,
            follow_redirects: self.follow_redirects,
            max_output_tokens: self.max_output_tokens,
            extra_query: self.extra_query.clone(),
            extra_body: self.extra_body.clone(),
            connect_timeout: self.connect_timeout,
        }
    }

    /// Checks structural sanity before a run starts: non-empty target,
    /// positive timeouts, sane concurrency bounds.
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::Invalid("target must not be empty".into()));
        }
        if reqwest::Url::parse(&self.target).is_err() {
            return Err(ConfigError::Invalid(format!(
                "target '{}' is not a valid URL",
                self.target
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "connect_timeout must be greater than zero".into(),
            ));
        }
        if self.scheduler.max_worker_processes == 0 {
            return Err(ConfigError::Invalid(
                "max_worker_processes must be greater than zero".into(),
            ));
        }
        if let Some(0) = self.scheduler.max_concurrency {
            return Err(ConfigError::Invalid(
                "max_concurrency must be greater than zero when set".into(),
            ));
        }
        if let Some(timeout) = self.scheduler.request_timeout {
            if timeout.is_zero() {
                return Err(ConfigError::Invalid(
                    "request_timeout must be greater than zero when set".into(),
                ));
            }
        }
        Ok(())
    }
}
