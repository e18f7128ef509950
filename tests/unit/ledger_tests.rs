//! Unit tests for the tool-call ledger and file-change publication.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use agent_relay::models::tool::{file_change_for, ChangeType, FileChange};
use agent_relay::session::ledger::{BroadcastSink, ToolCallLedger};

fn ledger() -> (ToolCallLedger, tokio::sync::broadcast::Receiver<FileChange>) {
    let sink = BroadcastSink::default();
    let rx = sink.subscribe();
    (
        ToolCallLedger::new(PathBuf::from("/work"), Arc::new(sink)),
        rx,
    )
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<FileChange>) -> Vec<FileChange> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(change) => out.push(change),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

#[test]
fn register_then_resolve_closes_entry() {
    let (mut ledger, _rx) = ledger();
    assert!(ledger.register("t1", "Read", json!({"file_path": "a.rs"})));
    assert_eq!(ledger.pending_count(), 1);

    let call = ledger.resolve("t1", "contents", false).expect("entry exists");
    assert_eq!(call.name, "Read");
    assert_eq!(ledger.pending_count(), 0);
}

#[test]
fn orphan_result_is_a_silent_no_op() {
    let (mut ledger, mut rx) = ledger();
    ledger.register("t1", "Read", json!({}));

    assert!(ledger.resolve("nope", "x", false).is_none());
    assert_eq!(ledger.pending_count(), 1, "orphan must not disturb other entries");
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn write_tool_emits_optimistic_and_authoritative_notifications() {
    let (mut ledger, mut rx) = ledger();
    ledger.register("t1", "Write", json!({"file_path": "src/new.rs", "content": "fn x() {}"}));

    let optimistic = drain(&mut rx);
    assert_eq!(
        optimistic,
        vec![FileChange {
            path: PathBuf::from("/work/src/new.rs"),
            change_type: ChangeType::Create,
        }],
        "write must notify as soon as the tool starts"
    );

    ledger.resolve("t1", "ok", false);
    let authoritative = drain(&mut rx);
    assert_eq!(authoritative, optimistic, "result must re-publish the same change");

    ledger.resolve("t1", "ok", false);
    assert!(
        drain(&mut rx).is_empty(),
        "a duplicate result must not publish again"
    );
}

#[test]
fn write_without_result_still_notified_once() {
    let (mut ledger, mut rx) = ledger();
    ledger.register("t1", "write", json!({"path": "/abs/file.txt"}));
    ledger.clear();

    assert_eq!(
        drain(&mut rx),
        vec![FileChange {
            path: PathBuf::from("/abs/file.txt"),
            change_type: ChangeType::Create,
        }]
    );
}

#[test]
fn edit_tool_publishes_change_type() {
    let (mut ledger, mut rx) = ledger();
    ledger.register("e1", "Edit", json!({"file_path": "/work/lib.rs"}));
    ledger.resolve("e1", "", true);

    let changes = drain(&mut rx);
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.change_type == ChangeType::Change));
}

#[test]
fn read_only_tools_publish_nothing() {
    let (mut ledger, mut rx) = ledger();
    ledger.register("r1", "Read", json!({"file_path": "a.rs"}));
    ledger.register("b1", "Bash", json!({"command": "ls"}));
    ledger.resolve("r1", "", false);
    ledger.resolve("b1", "", false);

    assert!(drain(&mut rx).is_empty());
}

#[test]
fn duplicate_tool_id_is_ignored() {
    let (mut ledger, mut rx) = ledger();
    assert!(ledger.register("t1", "Write", json!({"file_path": "a"})));
    assert!(!ledger.register("t1", "Write", json!({"file_path": "b"})));

    assert_eq!(ledger.pending_count(), 1);
    assert_eq!(drain(&mut rx).len(), 1, "ignored duplicate must not publish");
}

#[test]
fn clear_drops_every_entry() {
    let (mut ledger, _rx) = ledger();
    ledger.register("a", "Read", json!({}));
    ledger.register("b", "Grep", json!({}));
    ledger.clear();

    assert_eq!(ledger.pending_count(), 0);
    assert!(ledger.resolve("a", "", false).is_none());
}

#[test]
fn pending_keeps_start_order() {
    let (mut ledger, _rx) = ledger();
    for id in ["c", "a", "b"] {
        ledger.register(id, "Read", json!({}));
    }
    let ids: Vec<&str> = ledger.pending().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn publishing_without_subscribers_does_not_fail() {
    let sink = BroadcastSink::new(1);
    let mut ledger = ToolCallLedger::new(PathBuf::from("/w"), Arc::new(sink));
    assert!(ledger.register("t", "Write", json!({"file_path": "x"})));
    assert!(ledger.resolve("t", "", false).is_some());
}

#[test]
fn file_change_requires_a_path() {
    let cwd = Path::new("/w");
    assert!(file_change_for("Write", &json!({}), cwd).is_none());
    assert!(file_change_for("Write", &json!({"file_path": "  "}), cwd).is_none());
    assert!(file_change_for("Read", &json!({"file_path": "a"}), cwd).is_none());
}
