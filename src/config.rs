//! # Configuration
//!
//! One [`UltraConfig`] is built at process start and handed (by reference or
//! `Arc`) to the resolver, the render assembler and the HTTP service. Nothing
//! else in the crate reads the environment.
//!
//! Values come from, in increasing precedence:
//!
//! 1. built-in defaults
//! 2. an optional YAML file ([`UltraConfig::load`])
//! 3. `ULTRA_*` environment variables ([`UltraConfig::with_env_overrides`])
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! | --- | --- |
//! | `ULTRA_SOURCE` | `source_dir` |
//! | `ULTRA_VENDOR` | `vendor_dir` |
//! | `ULTRA_API` | `api_dir` |
//! | `ULTRA_ROOT` | `root` |
//! | `ULTRA_LANG` | `lang` |
//! | `ULTRA_DISABLE_STREAMING` | `disable_streaming` |
//! | `ULTRA_CHUNK_SIZE` | `chunk_size` |
//! | `ULTRA_FLUSH_IDLE_MS` | `flush_idle_ms` |
//! | `ULTRA_ERROR_MODE` | `error_mode` (`legacy` or `status`) |
//! | `ULTRA_DEV` | `dev` |
//! | `ULTRA_PORT` | `port` |
//! | `ULTRA_STACK_SIZE` | `stack_size`, decimal or `0x` hex |
//!
//! Unparseable values are ignored with a warning and the previous value kept.
//!
//! ```bash
//! export ULTRA_ROOT=https://example.com
//! export ULTRA_STACK_SIZE=0x10000
//! ultrarender serve --config ultra.yaml
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// How a render setup failure is reported to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Status 200 with the error text as the whole body
    #[default]
    Legacy,
    /// Status 500 with the error text as the whole body
    Status,
}

impl ErrorMode {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorMode::Legacy => 200,
            ErrorMode::Status => 500,
        }
    }
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ErrorMode::Legacy),
            "status" => Ok(ErrorMode::Status),
            other => Err(format!("unknown error mode '{other}' (expected legacy or status)")),
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMode::Legacy => f.write_str("legacy"),
            ErrorMode::Status => f.write_str("status"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UltraConfig {
    /// Application source directory (static files, app entry)
    pub source_dir: String,
    /// Vendored dependency directory, served with long cache lifetimes
    pub vendor_dir: String,
    /// Directory of API route modules under the source dir
    pub api_dir: String,
    /// Build output directory
    pub build_dir: String,
    /// Public origin of the site
    pub root: String,
    /// Default `lang` attribute when a job carries no locale
    pub lang: String,
    pub disable_streaming: bool,
    pub chunk_size: usize,
    pub flush_idle_ms: u64,
    pub error_mode: ErrorMode,
    /// Enables the live-reload socket script and the app watcher
    pub dev: bool,
    pub port: u16,
    /// Coroutine stack size in bytes
    pub stack_size: usize,
    /// Import map file, relative to the working directory
    pub import_map: String,
}

impl Default for UltraConfig {
    fn default() -> Self {
        Self {
            source_dir: "src".to_string(),
            vendor_dir: "x".to_string(),
            api_dir: "api".to_string(),
            build_dir: ".ultra".to_string(),
            root: "http://localhost:8000".to_string(),
            lang: "en".to_string(),
            disable_streaming: false,
            chunk_size: 8 * 1024,
            flush_idle_ms: 1,
            error_mode: ErrorMode::Legacy,
            dev: false,
            port: 8000,
            stack_size: 0x8000,
            import_map: "importMap.json".to_string(),
        }
    }
}

impl UltraConfig {
    /// Read a YAML config file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: UltraConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `ULTRA_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ULTRA_SOURCE") {
            self.source_dir = v;
        }
        if let Some(v) = lookup("ULTRA_VENDOR") {
            self.vendor_dir = v;
        }
        if let Some(v) = lookup("ULTRA_API") {
            self.api_dir = v;
        }
        if let Some(v) = lookup("ULTRA_ROOT") {
            self.root = v;
        }
        if let Some(v) = lookup("ULTRA_LANG") {
            self.lang = v;
        }
        if let Some(v) = lookup("ULTRA_DISABLE_STREAMING") {
            self.disable_streaming = parse_flag(&v);
        }
        if let Some(v) = lookup("ULTRA_DEV") {
            self.dev = parse_flag(&v);
        }
        override_parsed(&mut self.chunk_size, "ULTRA_CHUNK_SIZE", lookup("ULTRA_CHUNK_SIZE"));
        override_parsed(&mut self.flush_idle_ms, "ULTRA_FLUSH_IDLE_MS", lookup("ULTRA_FLUSH_IDLE_MS"));
        override_parsed(&mut self.error_mode, "ULTRA_ERROR_MODE", lookup("ULTRA_ERROR_MODE"));
        override_parsed(&mut self.port, "ULTRA_PORT", lookup("ULTRA_PORT"));
        if let Some(v) = lookup("ULTRA_STACK_SIZE") {
            match parse_size(&v) {
                Some(size) => self.stack_size = size,
                None => warn!(value = %v, "Ignoring invalid ULTRA_STACK_SIZE"),
            }
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.root_url()?;
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        Ok(())
    }

    pub fn root_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.root).with_context(|| format!("invalid root URL '{}'", self.root))
    }

    pub fn flush_idle(&self) -> Duration {
        Duration::from_millis(self.flush_idle_ms)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn override_parsed<T>(field: &mut T, key: &str, value: Option<String>)
where
    T: FromStr,
{
    if let Some(raw) = value {
        match raw.trim().parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => warn!(key, value = %raw, "Ignoring invalid config override"),
        }
    }
}
