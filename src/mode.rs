//! Execution mode: how the upstream agent process runs a request.
//!
//! `ExecutionMode` is used both as the `--mode` CLI flag value and as the
//! `options.mode` field forwarded to the upstream agent.

use std::fmt::{Display, Formatter};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Top-level execution mode for a session.
///
/// The two modes share one transport and one queuing discipline; they only
/// differ in which stream events are consumed. Defaults to
/// [`ExecutionMode::Quick`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// A single agent answers the request directly. Default mode.
    #[default]
    Quick,
    /// A coordinating agent spawns and supervises sub-agents.
    Team,
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quick => f.write_str("quick"),
            Self::Team => f.write_str("team"),
        }
    }
}
