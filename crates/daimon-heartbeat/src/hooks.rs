//! Coding-assistant hook protocol
//!
//! The host pipes one JSON object per invocation on stdin and reads an
//! optional `{"hookSpecificOutput": {...}}` object back. No output means
//! "carry on". Handlers never fail: every problem degrades to no output.

use crate::emergence::EmergencePolicy;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const USER_PROMPT_SUBMIT: &str = "UserPromptSubmit";
pub const PRE_TOOL_USE: &str = "PreToolUse";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

impl HookInput {
    /// Session id for log lines, `-` when the host sent none.
    pub fn session_label(&self) -> &str {
        self.session_id.as_deref().unwrap_or("-")
    }

    pub fn command(&self) -> Option<&str> {
        self.tool_input.get("command").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookOutput {
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Route a hook payload by its event name. Unknown events produce nothing.
pub async fn dispatch(policy: &EmergencePolicy, input: &HookInput) -> Option<HookOutput> {
    match input.hook_event_name.as_deref() {
        Some(USER_PROMPT_SUBMIT) => handle_user_prompt_submit(policy, input).await,
        Some(PRE_TOOL_USE) => handle_pre_tool_use(policy, input),
        _ => None,
    }
}

pub async fn handle_user_prompt_submit(policy: &EmergencePolicy, input: &HookInput) -> Option<HookOutput> {
    let prompt = input.prompt.as_deref().filter(|p| !p.trim().is_empty())?;
    let decision = policy.evaluate_prompt(prompt).await;
    if !decision.should_notify {
        return None;
    }
    info!(
        "Emerging on prompt (session {}): {:?}",
        input.session_label(),
        decision.local.reason
    );
    Some(HookOutput {
        hook_specific_output: HookSpecificOutput {
            hook_event_name: USER_PROMPT_SUBMIT.into(),
            additional_context: decision.message,
            decision: None,
            reason: None,
        },
    })
}

pub fn handle_pre_tool_use(policy: &EmergencePolicy, input: &HookInput) -> Option<HookOutput> {
    let tool_name = input.tool_name.as_deref()?;
    let command = input.command().filter(|c| !c.trim().is_empty())?;
    let decision = policy.evaluate_tool_use(tool_name, command);
    if !decision.should_notify {
        return None;
    }
    info!(
        "Asking before {} (session {}): {:?}",
        tool_name,
        input.session_label(),
        decision.local.detected_keywords
    );
    Some(HookOutput {
        hook_specific_output: HookSpecificOutput {
            hook_event_name: PRE_TOOL_USE.into(),
            additional_context: None,
            decision: Some("ask".into()),
            reason: decision.message,
        },
    })
}
