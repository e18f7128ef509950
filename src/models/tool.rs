//! Tool-call bookkeeping and file-change notification types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation that has started but not yet produced a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingToolCall {
    /// Opaque invocation identifier.
    pub id: String,
    /// Tool name as reported by the upstream.
    pub name: String,
    /// Raw tool input.
    pub input: Value,
}

/// Classification of a file-system change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// A file was written from scratch.
    Create,
    /// An existing file was modified.
    Change,
    /// A file was removed.
    Delete,
}

/// Fire-and-forget notification that a file may have changed.
///
/// Receivers must be idempotent: the same change can be published more
/// than once for a single tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    /// Absolute path of the affected file.
    pub path: PathBuf,
    /// What happened to it.
    pub change_type: ChangeType,
}

/// Tool kinds that mutate the file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Whole-file write.
    Write,
    /// In-place edit.
    Edit,
}

impl MutationKind {
    /// Recognise a mutating tool by name, case-insensitively.
    #[must_use]
    pub fn from_tool_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("write") {
            Some(Self::Write)
        } else if name.eq_ignore_ascii_case("edit") {
            Some(Self::Edit)
        } else {
            None
        }
    }

    /// Change type published for this kind.
    #[must_use]
    pub fn change_type(self) -> ChangeType {
        match self {
            Self::Write => ChangeType::Create,
            Self::Edit => ChangeType::Change,
        }
    }
}

/// Build the notification for a mutating tool call, if it is one.
///
/// The target path is read from `file_path` (or `path`) in the tool input;
/// relative paths are joined onto `cwd`.
#[must_use]
pub fn file_change_for(name: &str, input: &Value, cwd: &Path) -> Option<FileChange> {
    let kind = MutationKind::from_tool_name(name)?;
    let raw = input
        .get("file_path")
        .or_else(|| input.get("path"))
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())?;

    let path = Path::new(raw);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    Some(FileChange {
        path,
        change_type: kind.change_type(),
    })
}
