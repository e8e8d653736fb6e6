//! opgraph Configuration Module
//!
//! Per-network execution policy. Config is stored in `~/.config/opgraph/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`OPGRAPH_INPUT_OVERLAP`, `OPGRAPH_SKIP_EVICTIONS`,
//!    `OPGRAPH_PARALLEL`, `OPGRAPH_THREADS`)
//! 2. Config file (`~/.config/opgraph/config.toml`)
//! 3. Defaults
//!
//! ```toml
//! input_overlap = "reject"
//! skip_evictions = false
//! parallel = true
//! threads = 4
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GraphError, Result};

pub const ENV_INPUT_OVERLAP: &str = "OPGRAPH_INPUT_OVERLAP";
pub const ENV_SKIP_EVICTIONS: &str = "OPGRAPH_SKIP_EVICTIONS";
pub const ENV_PARALLEL: &str = "OPGRAPH_PARALLEL";
pub const ENV_THREADS: &str = "OPGRAPH_THREADS";

/// What to do when a supplied input is also provided by an operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOverlap {
    /// The supplied value wins and the producing operation is skipped on that path
    #[default]
    ShortCircuit,
    /// Compiling fails with `AmbiguousInput`
    Reject,
}

impl FromStr for InputOverlap {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "short_circuit" | "shortcircuit" => Ok(Self::ShortCircuit),
            "reject" | "error" => Ok(Self::Reject),
            other => Err(format!("unknown input overlap policy '{}'", other)),
        }
    }
}

impl fmt::Display for InputOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortCircuit => f.write_str("short_circuit"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Execution policy for one network
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetConfig {
    /// Policy for inputs that shadow an operation's provides
    pub input_overlap: InputOverlap,

    /// Never plan `Evict` steps, even when specific outputs are asked
    pub skip_evictions: bool,

    /// Run independent operations of each plan level on a worker pool
    pub parallel: bool,

    /// Worker pool size for parallel runs (0 = one per CPU)
    pub threads: usize,
}

impl NetConfig {
    /// Returns `~/.config/opgraph/` on Unix, `%APPDATA%/opgraph/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("opgraph")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default location
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from an explicit path (same missing-file rule as `load`)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GraphError::ConfigError {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GraphError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Save configuration, creating parent directories if needed
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| GraphError::ConfigError {
                    reason: format!("Failed to create config directory: {}", e),
                })?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(|e| GraphError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| GraphError::ConfigError {
            reason: format!("Failed to write config file: {}", e),
        })?;

        Ok(())
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    /// Unparseable values are ignored with a warning.
    pub fn with_env(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENV_INPUT_OVERLAP) {
            if !raw.is_empty() {
                match raw.parse() {
                    Ok(policy) => self.input_overlap = policy,
                    Err(reason) => warn!(var = ENV_INPUT_OVERLAP, %reason, "ignoring env override"),
                }
            }
        }

        if let Some(flag) = env_flag(ENV_SKIP_EVICTIONS) {
            self.skip_evictions = flag;
        }

        if let Some(flag) = env_flag(ENV_PARALLEL) {
            self.parallel = flag;
        }

        if let Ok(raw) = std::env::var(ENV_THREADS) {
            if !raw.trim().is_empty() {
                match raw.trim().parse() {
                    Ok(threads) => self.threads = threads,
                    Err(e) => warn!(var = ENV_THREADS, error = %e, "ignoring env override"),
                }
            }
        }

        self
    }

    pub fn with_input_overlap(mut self, policy: InputOverlap) -> Self {
        self.input_overlap = policy;
        self
    }

    pub fn with_skip_evictions(mut self, skip: bool) -> Self {
        self.skip_evictions = skip;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

fn env_flag(var: &str) -> Option<bool> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            warn!(var, value = other, "ignoring env override, expected a boolean");
            None
        }
    }
}
