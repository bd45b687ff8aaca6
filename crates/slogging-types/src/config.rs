//! Initializer configuration.
//!
//! [`Options`] is deliberately forgiving: every field has a default, and the
//! accessors that interpret a field (`log_level`, `render_mode`, ...) degrade
//! bad values instead of rejecting them.
//!
//! ## Configuration Layers
//!
//! Values are resolved in this priority order:
//! 1. Environment variables (`SLOGGING_*`, see [`Options::with_env_overrides`])
//! 2. Values loaded from a file ([`Options::from_file`])
//! 3. Default values

use crate::enums::{LogLevel, RenderMode};
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read by [`Options::with_env_overrides`].
pub const ENV_PREFIX: &str = "SLOGGING_";

/// Environment names for which structured output is enforced.
const PRODUCTION_ENVIRONMENTS: &[&str] = &["prod", "production", "live"];

/// Configuration accepted by the global logger initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Service name, attached to every event as `service`
    pub service: String,

    /// Deployment environment, attached to every event as `env`
    pub environment: String,

    /// Human-readable console rendering instead of JSON
    pub pretty: bool,

    /// Minimum severity; unknown or empty means `info`
    pub level: String,

    /// Attach the originating `file:line` to every event
    pub with_caller: bool,

    /// Keep one event in N; values up to 1 disable sampling
    pub sample_every: u32,

    /// Rotating log file; standard output is used when unset or empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Roll the file over once it would grow past this many MiB
    pub max_size_mb: u64,

    /// Rolled files to keep; 0 keeps all
    pub max_backups: usize,

    /// Delete rolled files older than this many days; 0 disables
    pub max_age_days: u64,

    /// Gzip rolled files
    pub compress: bool,

    /// Tee file output to standard output
    pub also_stdout: bool,

    /// Write through a background worker thread
    pub non_blocking: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            service: String::new(),
            environment: String::new(),
            pretty: false,
            level: String::new(),
            with_caller: false,
            sample_every: 0,
            file_path: None,
            max_size_mb: 100,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
            also_stdout: false,
            non_blocking: false,
        }
    }
}

impl Options {
    /// Load options from a YAML (or JSON) file.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// parsed is an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "logging options file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let options: Options = serde_yaml::from_str(&content)?;

        tracing::debug!(path = %path.display(), "loaded logging options");
        Ok(options)
    }

    /// Overlay `SLOGGING_*` environment variables on top of these options.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Overlay values produced by `lookup`, which is called with the full
    /// variable name (e.g. `SLOGGING_LEVEL`). Values that do not parse are
    /// ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(&format!("{}{}", ENV_PREFIX, key));

        if let Some(v) = get("SERVICE") {
            self.service = v;
        }
        if let Some(v) = get("ENVIRONMENT") {
            self.environment = v;
        }
        if let Some(v) = get("LEVEL") {
            self.level = v;
        }
        if let Some(v) = get("PRETTY").and_then(|v| parse_bool(&v)) {
            self.pretty = v;
        }
        if let Some(v) = get("WITH_CALLER").and_then(|v| parse_bool(&v)) {
            self.with_caller = v;
        }
        if let Some(v) = get("SAMPLE_EVERY").and_then(|v| v.trim().parse().ok()) {
            self.sample_every = v;
        }
        if let Some(v) = get("FILE_PATH") {
            self.file_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("ALSO_STDOUT").and_then(|v| parse_bool(&v)) {
            self.also_stdout = v;
        }

        self
    }

    /// The severity threshold, `info` when `level` does not parse.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse_or_default(&self.level)
    }

    /// Rendering mode. Production-like environments always render
    /// structured output.
    pub fn render_mode(&self) -> RenderMode {
        if self.pretty && !self.is_production() {
            RenderMode::Console
        } else {
            RenderMode::Structured
        }
    }

    /// Whether `environment` names a production deployment.
    pub fn is_production(&self) -> bool {
        let env = self.environment.trim().to_lowercase();
        PRODUCTION_ENVIRONMENTS.contains(&env.as_str())
    }

    /// Sampling period, or `None` when every event is kept.
    pub fn effective_sample_every(&self) -> Option<u32> {
        (self.sample_every > 1).then_some(self.sample_every)
    }

    /// The log file path, if one is configured.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Size threshold in bytes, never below 1 MiB.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.max(1).saturating_mul(1024 * 1024)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
