//! Wire protocol between local hooks/collectors and the Daimon service.
//!
//! All bodies are JSON. Paths are relative to the service base URL.

use serde::{Deserialize, Serialize};

use crate::types::{Classification, Event, Mode, Patterns};

pub const QUICK_CHECK_PATH: &str = "/api/daimon/quick-check";
pub const SHELL_BATCH_PATH: &str = "/api/daimon/shell/batch";
pub const CLAUDE_EVENT_PATH: &str = "/api/daimon/claude/event";
pub const SESSION_END_PATH: &str = "/api/daimon/session/end";
pub const HEALTH_PATH: &str = "/api/daimon/health";

/// Upper bound on prompt length accepted by the quick-check endpoint.
pub const MAX_PROMPT_CHARS: usize = 10_000;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuickCheckRequest {
    pub prompt: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuickCheckResponse {
    pub salience: f64,
    pub should_emerge: bool,
    pub mode: Mode,
    #[serde(default)]
    pub emergence_reason: Option<String>,
    #[serde(default)]
    pub detected_keywords: Vec<String>,
}

impl QuickCheckResponse {
    /// Salience must be a finite value in [0, 1], and `should_emerge` must
    /// agree with `mode`.
    pub fn is_well_formed(&self) -> bool {
        self.salience.is_finite()
            && (0.0..=1.0).contains(&self.salience)
            && self.should_emerge == (self.mode == Mode::Emerge)
    }
}

impl From<&Classification> for QuickCheckResponse {
    fn from(c: &Classification) -> Self {
        Self {
            salience: c.salience,
            should_emerge: c.should_emerge(),
            mode: c.mode,
            emergence_reason: c.reason.clone(),
            detected_keywords: c.detected_keywords.clone(),
        }
    }
}

/// A flushed batch of heartbeats plus the patterns detected over it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchRequest {
    pub heartbeats: Vec<Event>,
    #[serde(default)]
    pub patterns: Patterns,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    pub status: String,
    pub stored: usize,
    #[serde(default)]
    pub insights: Vec<String>,
}

/// Session metadata from the coding assistant. Carries intent, never content.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaudeEvent {
    pub event_type: String,
    pub timestamp: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub files_touched: Vec<String>,
    #[serde(default)]
    pub intention: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaudeEventResponse {
    pub status: String,
    pub stored: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionEndRequest {
    pub session_id: String,
    pub summary: String,
    #[serde(default = "default_outcome")]
    pub outcome: String,
    #[serde(default)]
    pub duration_minutes: f64,
    #[serde(default)]
    pub files_changed: u32,
}

fn default_outcome() -> String {
    "success".into()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEndResponse {
    pub status: String,
    pub precedent_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
}
