//! Sub-agent entries tracked in team mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a sub-agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Spawned, not yet working.
    #[serde(alias = "pending", alias = "spawned")]
    Idle,
    /// Working on its task.
    #[serde(alias = "running", alias = "in_progress")]
    Working,
    /// Finished successfully.
    #[serde(alias = "completed", alias = "done")]
    Complete,
    /// Finished with a failure.
    #[serde(alias = "failed")]
    Error,
}

impl AgentStatus {
    /// Whether the agent has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Kind of a sub-agent log line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentLogKind {
    /// Narration text.
    Text,
    /// A tool invocation started.
    Tool,
    /// A tool invocation finished.
    ToolResult,
}

/// One line in a sub-agent's activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentLogEntry {
    /// Line classification.
    pub kind: AgentLogKind,
    /// Display text.
    pub content: String,
}

impl AgentLogEntry {
    /// Build a log line.
    #[must_use]
    pub fn new(kind: AgentLogKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

/// Spawn payload carried by an `agent_spawn` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentSpec {
    /// Agent identifier, unique within one team run.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Role description (e.g. "frontend", "tester").
    #[serde(default)]
    pub role: String,
    /// Task handed to the agent.
    #[serde(default)]
    pub task: String,
    /// Initial status; `idle` when absent.
    #[serde(default)]
    pub status: Option<AgentStatus>,
}

/// A sub-agent work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentEntry {
    /// Agent identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Role description.
    pub role: String,
    /// Task handed to the agent.
    pub task: String,
    /// Latest reported status.
    pub status: AgentStatus,
    /// Latest reported progress, 0..=100.
    pub progress: u8,
    /// When the entry was spawned.
    pub start_time: DateTime<Utc>,
    /// When the entry first reached a terminal status.
    pub end_time: Option<DateTime<Utc>>,
    /// Activity log in arrival order.
    pub log: Vec<AgentLogEntry>,
}

impl AgentEntry {
    /// Construct an entry from a spawn payload.
    #[must_use]
    pub fn from_spec(spec: AgentSpec, now: DateTime<Utc>) -> Self {
        let status = spec.status.unwrap_or(AgentStatus::Idle);
        Self {
            id: spec.id,
            name: spec.name,
            role: spec.role,
            task: spec.task,
            status,
            progress: if status == AgentStatus::Complete { 100 } else { 0 },
            start_time: now,
            end_time: status.is_terminal().then_some(now),
            log: Vec::new(),
        }
    }
}
