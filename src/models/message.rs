//! Transcript message model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Text typed by the caller.
    User,
    /// Text produced by the upstream agent.
    Assistant,
    /// Notes produced by the session itself (command replies, summaries).
    System,
}

/// Visible streaming phase of the in-flight assistant entry.
///
/// The first four are derived from what the request has received so far;
/// the last three are terminal and never change once reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing received yet.
    Idle,
    /// Reasoning text has arrived, nothing else.
    Thinking,
    /// At least one tool call is unresolved.
    ToolActive,
    /// Answer text has arrived.
    Responding,
    /// Finished normally.
    Done,
    /// Stopped by the caller.
    Cancelled,
    /// Finished with a transport or upstream error.
    Errored,
}

impl Phase {
    /// Whether this phase is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Errored)
    }
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique entry identifier.
    pub id: String,
    /// Author of the entry.
    pub role: Role,
    /// Current text. Replaced wholesale while streaming.
    pub content: String,
    /// `true` until the entry is frozen.
    pub is_streaming: bool,
}

impl Message {
    /// A complete, non-streaming entry.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            is_streaming: false,
        }
    }

    /// An empty assistant entry that is still streaming.
    #[must_use]
    pub fn streaming_assistant() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: String::new(),
            is_streaming: true,
        }
    }
}
