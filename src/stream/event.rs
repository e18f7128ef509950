//! Typed upstream events.
//!
//! Every record decoded by [`FrameDecoder`](crate::stream::codec::FrameDecoder)
//! is a JSON object whose `type` field selects one [`StreamEvent`] variant.
//!
//! | `type`                           | Variant                                  |
//! |----------------------------------|------------------------------------------|
//! | `thinking`                       | [`StreamEvent::Thinking`]                |
//! | `tool`                           | [`StreamEvent::Tool`]                    |
//! | `tool_result`                    | [`StreamEvent::ToolResult`]              |
//! | `status`, `progress`             | [`StreamEvent::Status`]                  |
//! | `text`                           | [`StreamEvent::Text`]                    |
//! | `system`                         | [`StreamEvent::System`]                  |
//! | `result`                         | [`StreamEvent::Result`]                  |
//! | `error`                          | [`StreamEvent::Error`]                   |
//! | `done`                           | [`StreamEvent::Done`]                    |
//! | `agent_spawn`                    | [`StreamEvent::AgentSpawn`]              |
//! | `agent_status`                   | [`StreamEvent::AgentStatus`]             |
//! | `agent_log`                      | [`StreamEvent::AgentLog`]                |
//! | `agent_tool`                     | [`StreamEvent::AgentTool`]               |
//! | `agent_tool_result`              | [`StreamEvent::AgentToolResult`]         |
//! | `pm_text`, `pm_tool`, `pm_status`| [`StreamEvent::PmText`] and friends      |
//! | `orchestrator_complete`, `all_complete` | [`StreamEvent::OrchestratorComplete`] |
//! | *(any other)*                    | [`StreamEvent::Unknown`]                 |

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::agent::{AgentSpec, AgentStatus};

/// One decoded upstream event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    /// Intermediate reasoning text.
    Thinking {
        /// Reasoning fragment.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// A tool invocation started.
    Tool {
        /// Tool name.
        name: String,
        /// Raw tool input.
        #[serde(default)]
        input: Value,
        /// Invocation identifier, unique within one request.
        id: String,
    },
    /// A tool invocation finished.
    ToolResult {
        /// Identifier of the matching [`StreamEvent::Tool`].
        tool_use_id: String,
        /// Result text.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
        /// Whether the tool failed.
        #[serde(default)]
        is_error: bool,
    },
    /// Free-text progress narration.
    #[serde(alias = "progress")]
    Status {
        /// Narration text.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Full cumulative answer text so far.
    Text {
        /// Complete text, not a delta.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Upstream housekeeping notice.
    System {
        /// Notice text.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Final authoritative answer text.
    Result {
        /// Complete text.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Upstream reported an error.
    Error {
        /// Error text.
        #[serde(default, alias = "message", deserialize_with = "lenient_text")]
        content: String,
    },
    /// Upstream finished the request.
    Done {
        /// Optional exit or status code.
        #[serde(default)]
        code: Option<Value>,
    },
    /// A sub-agent was created.
    AgentSpawn {
        /// Spawn payload.
        agent: AgentSpec,
    },
    /// A sub-agent reported a status change.
    AgentStatus {
        /// Sub-agent identifier.
        agent_id: String,
        /// New status.
        status: AgentStatus,
        /// Progress percentage; may be fractional or out of range.
        #[serde(default)]
        progress: Option<f64>,
    },
    /// A sub-agent emitted a log line.
    AgentLog {
        /// Sub-agent identifier.
        agent_id: String,
        /// Log text.
        #[serde(default, alias = "content", deserialize_with = "lenient_text")]
        log: String,
    },
    /// A sub-agent started a tool invocation.
    AgentTool {
        /// Sub-agent identifier.
        agent_id: String,
        /// Tool name.
        name: String,
        /// Raw tool input.
        #[serde(default)]
        input: Value,
        /// Invocation identifier.
        #[serde(default)]
        id: String,
    },
    /// A sub-agent tool invocation finished.
    AgentToolResult {
        /// Sub-agent identifier.
        agent_id: String,
        /// Identifier of the matching [`StreamEvent::AgentTool`].
        #[serde(default)]
        tool_use_id: String,
        /// Result text.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
        /// Whether the tool failed.
        #[serde(default)]
        is_error: bool,
    },
    /// Coordinating agent's cumulative narration text.
    PmText {
        /// Complete text, not a delta.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Coordinating agent started a tool invocation.
    PmTool {
        /// Tool name.
        name: String,
        /// Raw tool input.
        #[serde(default)]
        input: Value,
        /// Invocation identifier.
        id: String,
    },
    /// Coordinating agent's progress narration.
    PmStatus {
        /// Narration text.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Team run finished.
    #[serde(alias = "all_complete")]
    OrchestratorComplete {
        /// Optional upstream-provided summary.
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    /// Any kind this version does not know about.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Wire name of the event kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::Tool { .. } => "tool",
            Self::ToolResult { .. } => "tool_result",
            Self::Status { .. } => "status",
            Self::Text { .. } => "text",
            Self::System { .. } => "system",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
            Self::AgentSpawn { .. } => "agent_spawn",
            Self::AgentStatus { .. } => "agent_status",
            Self::AgentLog { .. } => "agent_log",
            Self::AgentTool { .. } => "agent_tool",
            Self::AgentToolResult { .. } => "agent_tool_result",
            Self::PmText { .. } => "pm_text",
            Self::PmTool { .. } => "pm_tool",
            Self::PmStatus { .. } => "pm_status",
            Self::OrchestratorComplete { .. } => "orchestrator_complete",
            Self::Unknown => "unknown",
        }
    }
}

/// Accept a string, `null`, or any other JSON value (rendered compactly).
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
