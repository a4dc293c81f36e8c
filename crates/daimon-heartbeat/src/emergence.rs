//! Emergence policy - whether to interrupt the user, and with what
//!
//! Two-tier gate on the prompt path: the local keyword scan decides whether
//! the remote quick-check is worth asking at all. Low risk never leaves the
//! process. Medium and high risk ask the remote service under a hard timeout;
//! anything other than a well-formed answer resolves to silence.

use crate::classifier::RiskClassifier;
use daimon_core::{Classification, QuickCheckResponse, RiskLevel};
use daimon_sink::{RemoteClassifier, SinkError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Tool name whose `command` input is screened on the tool-use path.
pub const SHELL_TOOL: &str = "Bash";

/// What happened on the remote leg of a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCheck {
    /// Local risk was low; no request was made.
    Skipped,
    Answered(QuickCheckResponse),
    Failed(SinkError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmergenceDecision {
    pub should_notify: bool,
    pub message: Option<String>,
    /// Local classification that gated the decision.
    pub local: Classification,
    pub remote: RemoteCheck,
}

impl EmergenceDecision {
    pub fn silent(local: Classification, remote: RemoteCheck) -> Self {
        Self { should_notify: false, message: None, local, remote }
    }
}

/// User-facing interruption text.
pub fn compose_message(salience: f64, reason: Option<&str>) -> String {
    format!(
        "DAIMON (salience {:.2}): {}. Pause and confirm intent before proceeding.",
        salience,
        reason.unwrap_or("significant action detected")
    )
}

pub struct EmergencePolicy {
    classifier: Arc<RiskClassifier>,
    remote: Arc<dyn RemoteClassifier>,
    timeout: Duration,
}

impl EmergencePolicy {
    pub fn new(classifier: Arc<RiskClassifier>, remote: Arc<dyn RemoteClassifier>, timeout: Duration) -> Self {
        Self { classifier, remote, timeout }
    }

    pub async fn evaluate_prompt(&self, prompt: &str) -> EmergenceDecision {
        let local = self.classifier.classify(prompt);
        if local.risk == RiskLevel::Low {
            return EmergenceDecision::silent(local, RemoteCheck::Skipped);
        }

        debug!("Local risk {} ({:?}), asking remote", local.risk, local.reason);
        let answer = match tokio::time::timeout(self.timeout, self.remote.quick_check(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(SinkError::Timeout),
        };

        match answer {
            Ok(response) if response.should_emerge => {
                let reason = response.emergence_reason.clone().or_else(|| local.reason.clone());
                let message = compose_message(response.salience, reason.as_deref());
                EmergenceDecision {
                    should_notify: true,
                    message: Some(message),
                    local,
                    remote: RemoteCheck::Answered(response),
                }
            }
            Ok(response) => EmergenceDecision::silent(local, RemoteCheck::Answered(response)),
            Err(e) => {
                debug!("Quick-check failed, staying silent: {}", e);
                EmergenceDecision::silent(local, RemoteCheck::Failed(e))
            }
        }
    }

    /// Screen a tool invocation locally. Only high-risk shell commands ask
    /// for confirmation; nothing here touches the network.
    pub fn evaluate_tool_use(&self, tool_name: &str, command: &str) -> EmergenceDecision {
        let local = self.classifier.classify(command);
        if tool_name != SHELL_TOOL || local.risk != RiskLevel::High {
            return EmergenceDecision::silent(local, RemoteCheck::Skipped);
        }
        let message = format!(
            "DAIMON: high-risk command ({}). Confirm before running.",
            local.detected_keywords.join(", ")
        );
        EmergenceDecision {
            should_notify: true,
            message: Some(message),
            local,
            remote: RemoteCheck::Skipped,
        }
    }
}
