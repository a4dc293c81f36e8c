//! Core types for Daimon: events, classifications, and batch patterns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

/// Where an event was observed.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    #[default]
    Shell,
    Prompt,
    ToolUse,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Shell => "shell",
            EventSource::Prompt => "prompt",
            EventSource::ToolUse => "tool-use",
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single heartbeat: one observed piece of local activity.
///
/// The payload is the command line, prompt text, or tool name/args. On the
/// wire it is `command`, and `exit_code`, `pwd` and `git_branch` are always
/// present (`0`, `""` and `""` when unknown) as the batch endpoint requires.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Event {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source: EventSource,
    #[serde(rename = "command", alias = "payload")]
    pub payload: String,
    #[serde(default, serialize_with = "or_default")]
    pub exit_code: Option<i32>,
    /// Execution duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, serialize_with = "or_default")]
    pub pwd: Option<String>,
    #[serde(default, serialize_with = "or_default")]
    pub git_branch: Option<String>,
}

fn or_default<T, S>(value: &Option<T>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: Default + Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => T::default().serialize(serializer),
    }
}

impl Event {
    pub fn new(source: EventSource, payload: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            payload: payload.into(),
            exit_code: None,
            duration: None,
            pwd: None,
            git_branch: None,
        }
    }

    pub fn shell(command: impl Into<String>) -> Self {
        Self::new(EventSource::Shell, command)
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(EventSource::Prompt, text)
    }

    pub fn tool_use(description: impl Into<String>) -> Self {
        Self::new(EventSource::ToolUse, description)
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    pub fn with_pwd(mut self, pwd: impl Into<String>) -> Self {
        self.pwd = Some(pwd.into());
        self
    }

    pub fn with_git_branch(mut self, branch: impl Into<String>) -> Self {
        self.git_branch = Some(branch.into());
        self
    }

    /// True when the event carries a non-zero exit code.
    pub fn is_failure(&self) -> bool {
        self.exit_code.is_some_and(|code| code != 0)
    }

    /// Parse one newline-delimited JSON heartbeat.
    pub fn from_json_line(line: &str) -> Result<Self> {
        let event: Event = serde_json::from_str(line.trim())?;
        if event.payload.trim().is_empty() {
            return Err(Error::InvalidEvent("empty payload".into()));
        }
        Ok(event)
    }
}

/// How loudly to surface a classified input.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Silent,
    Subtle,
    Emerge,
}

impl Mode {
    /// Map a salience onto a mode. `emerge` at or above `emerge_threshold`,
    /// `silent` below `subtle_threshold`, `subtle` in between.
    pub fn from_salience(salience: f64, subtle_threshold: f64, emerge_threshold: f64) -> Self {
        if salience >= emerge_threshold {
            Mode::Emerge
        } else if salience >= subtle_threshold {
            Mode::Subtle
        } else {
            Mode::Silent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Silent => "silent",
            Mode::Subtle => "subtle",
            Mode::Emerge => "emerge",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse local risk tier from the keyword scan.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one text input.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub salience: f64,
    pub mode: Mode,
    pub risk: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub detected_keywords: Vec<String>,
}

impl Classification {
    pub fn should_emerge(&self) -> bool {
        self.mode == Mode::Emerge
    }
}

/// Signals derived from a single batch. Absent keys mean "not detected".
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patterns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_streak: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub possible_frustration: bool,
}

impl Patterns {
    pub fn is_empty(&self) -> bool {
        self.error_streak.is_none() && !self.possible_frustration
    }
}
