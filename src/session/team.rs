//! Sub-agent registry for team mode.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::agent::{AgentEntry, AgentLogEntry, AgentSpec, AgentStatus};

/// Live set of sub-agents spawned during one team-mode request.
///
/// Entries keep spawn order and are never removed individually; the whole
/// registry is cleared when a new team request begins or the session
/// leaves team mode.
#[derive(Debug, Clone, Default)]
pub struct AgentTeamRegistry {
    entries: Vec<AgentEntry>,
}

impl AgentTeamRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spawned agent. A repeated id is ignored and returns `false`.
    pub fn add_entry(&mut self, spec: AgentSpec, now: DateTime<Utc>) -> bool {
        if self.get(&spec.id).is_some() {
            debug!(agent_id = spec.id.as_str(), "team: duplicate spawn ignored");
            return false;
        }
        self.entries.push(AgentEntry::from_spec(spec, now));
        true
    }

    /// Apply a status report; the latest report always wins.
    ///
    /// The first transition into a terminal status stamps `end_time`; later
    /// terminal reports leave it untouched. A `complete` report without a
    /// progress value sets progress to 100. Returns `false` for unknown ids.
    pub fn update_status(
        &mut self,
        id: &str,
        status: AgentStatus,
        progress: Option<f64>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            debug!(agent_id = id, "team: status for unknown agent ignored");
            return false;
        };

        entry.status = status;
        match progress {
            Some(value) => entry.progress = clamp_progress(value),
            None if status == AgentStatus::Complete => entry.progress = 100,
            None => {}
        }
        if status.is_terminal() && entry.end_time.is_none() {
            entry.end_time = Some(now);
        }
        true
    }

    /// Append a log line. Returns `false` for unknown ids.
    pub fn append_log(&mut self, id: &str, line: AgentLogEntry) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            debug!(agent_id = id, "team: log for unknown agent ignored");
            return false;
        };
        entry.log.push(line);
        true
    }

    /// Look up an agent by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&AgentEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// All agents in spawn order.
    #[must_use]
    pub fn entries(&self) -> &[AgentEntry] {
        &self.entries
    }

    /// Whether no agent has been spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every agent.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Status counts over the current entries.
    #[must_use]
    pub fn summary(&self) -> TeamSummary {
        TeamSummary::from_entries(&self.entries)
    }
}

/// Aggregate outcome of a team run.
///
/// Depends only on the multiset of agent statuses, so equal status mixes
/// always render the same text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamSummary {
    /// Agents that finished successfully.
    pub complete: usize,
    /// Agents that finished with an error.
    pub failed: usize,
    /// Agents still idle or working.
    pub unfinished: usize,
}

impl TeamSummary {
    /// Count statuses in `entries`.
    #[must_use]
    pub fn from_entries(entries: &[AgentEntry]) -> Self {
        entries
            .iter()
            .fold(Self::default(), |mut acc, entry| {
                match entry.status {
                    AgentStatus::Complete => acc.complete += 1,
                    AgentStatus::Error => acc.failed += 1,
                    AgentStatus::Idle | AgentStatus::Working => acc.unfinished += 1,
                }
                acc
            })
    }

    /// Total number of agents counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.complete + self.failed + self.unfinished
    }
}

impl Display for TeamSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Team run finished: {} complete, {} failed, {} unfinished ({} agents)",
            self.complete,
            self.failed,
            self.unfinished,
            self.total()
        )
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=100 first
fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}
