//! Daimon configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup; a missing
//! file falls back to defaults, but a file that fails to parse or validate is
//! a deployment mistake and stops startup.

use daimon_core::{Error, Result};
use daimon_sink::http::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Hard ceiling for the interactive quick-check call.
pub const MAX_QUICK_CHECK_TIMEOUT_MS: u64 = 500;

/// Environment variable overriding `remote.base_url`.
pub const URL_ENV: &str = "DAIMON_URL";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaimonConfig {
    /// Remote service endpoint and call budgets.
    pub remote: RemoteConfig,
    /// Keyword tiers and mode thresholds.
    pub classifier: ClassifierConfig,
    /// Heartbeat batching.
    pub aggregator: AggregatorConfig,
    /// Bind address for `daimon serve`.
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Budget for the interactive quick-check (at most 500).
    pub quick_check_timeout_ms: u64,
    /// Budget for one background batch delivery.
    pub batch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Salience when nothing matches.
    pub floor: f64,
    /// Salience at or above this is `subtle`.
    pub subtle_threshold: f64,
    /// Salience at or above this is `emerge`.
    pub emerge_threshold: f64,
    pub high: TierConfig,
    pub medium: TierConfig,
}

/// One keyword tier. Keywords are matched as case-insensitive substrings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub score: f64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Periodic flush window in seconds.
    pub flush_interval_secs: u64,
    /// Substrings that force an immediate flush.
    pub significant_markers: Vec<String>,
    /// Failures per batch needed to flag an error streak.
    pub error_streak_threshold: usize,
    /// Pending events that force a flush regardless of time.
    pub max_pending: usize,
    /// Flushed batches allowed to wait for delivery before new ones are dropped.
    pub delivery_queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

// ============================================================
// Defaults
// ============================================================

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            quick_check_timeout_ms: MAX_QUICK_CHECK_TIMEOUT_MS,
            batch_timeout_ms: 3_000,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            floor: 0.1,
            subtle_threshold: 0.5,
            emerge_threshold: 0.85,
            high: TierConfig {
                score: 0.9,
                keywords: to_strings(&[
                    "delete", "drop", "rm -rf", "truncate", "production", "destroy", "wipe", "purge",
                    "credential", "secret", "password",
                ]),
            },
            medium: TierConfig {
                score: 0.6,
                keywords: to_strings(&[
                    "refactor", "migrate", "architecture", "auth", "security", "payment", "deploy",
                    "database", "schema", "api",
                ]),
            },
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 30,
            significant_markers: to_strings(&["git push", "git commit", "rm -rf", "docker"]),
            error_streak_threshold: 3,
            max_pending: 500,
            delivery_queue: 8,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1".into(), port: 8001 }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================
// Loading
// ============================================================

impl DaimonConfig {
    /// Load config from a TOML file, falling back to defaults when the file
    /// does not exist. Environment overrides are applied before validation.
    pub fn load(path: &Path) -> Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)
                    .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without applying environment overrides or validating.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(URL_ENV) {
            if !url.trim().is_empty() {
                self.remote.base_url = url;
            }
        }
        self
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        self.remote.validate()?;
        self.classifier.validate()?;
        self.aggregator.validate()
    }
}

impl RemoteConfig {
    pub fn quick_check_timeout(&self) -> Duration {
        Duration::from_millis(self.quick_check_timeout_ms)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::config(format!("remote.base_url must be http(s): {:?}", self.base_url)));
        }
        if self.quick_check_timeout_ms == 0 || self.quick_check_timeout_ms > MAX_QUICK_CHECK_TIMEOUT_MS {
            return Err(Error::config(format!(
                "remote.quick_check_timeout_ms must be in 1..={}, got {}",
                MAX_QUICK_CHECK_TIMEOUT_MS, self.quick_check_timeout_ms
            )));
        }
        if self.batch_timeout_ms == 0 {
            return Err(Error::config("remote.batch_timeout_ms must be positive"));
        }
        Ok(())
    }
}

impl ClassifierConfig {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("floor", self.floor),
            ("subtle_threshold", self.subtle_threshold),
            ("emerge_threshold", self.emerge_threshold),
            ("high.score", self.high.score),
            ("medium.score", self.medium.score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!("classifier.{} must be in [0, 1], got {}", name, value)));
            }
        }
        if self.subtle_threshold >= self.emerge_threshold {
            return Err(Error::config("classifier.subtle_threshold must be below emerge_threshold"));
        }
        if !(self.high.score > self.medium.score && self.medium.score > self.floor) {
            return Err(Error::config("classifier scores must satisfy high > medium > floor"));
        }
        for (name, tier) in [("high", &self.high), ("medium", &self.medium)] {
            if tier.keywords.is_empty() {
                return Err(Error::config(format!("classifier.{}.keywords is empty", name)));
            }
            if tier.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(Error::config(format!("classifier.{}.keywords contains a blank entry", name)));
            }
        }
        Ok(())
    }
}

impl AggregatorConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.flush_interval_secs == 0 {
            return Err(Error::config("aggregator.flush_interval_secs must be positive"));
        }
        if self.error_streak_threshold == 0 {
            return Err(Error::config("aggregator.error_streak_threshold must be at least 1"));
        }
        if self.max_pending == 0 || self.delivery_queue == 0 {
            return Err(Error::config("aggregator.max_pending and delivery_queue must be at least 1"));
        }
        if self.significant_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(Error::config("aggregator.significant_markers contains a blank entry"));
        }
        Ok(())
    }
}
