//! Integration tests for cancellation and its race with natural completion.

use std::time::Duration;

use serde_json::json;

use agent_relay::mode::ExecutionMode;
use agent_relay::models::message::Phase;
use agent_relay::session::accumulator::CANCELLED_MARKER;
use agent_relay::session::{RequestOutcome, SessionUpdate};

use super::test_helpers::{
    drain_updates, last_content, next_finish, session, wait_until, ScriptedBackend,
};

fn finished_count(updates: &[SessionUpdate]) -> usize {
    updates
        .iter()
        .filter(|u| matches!(u, SessionUpdate::RequestFinished { .. }))
        .count()
}

#[tokio::test]
async fn cancel_while_idle_does_nothing() {
    let backend = ScriptedBackend::new();
    let session = session(&backend, ExecutionMode::Quick);
    assert!(!session.cancel());
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn cancel_before_first_byte() {
    let backend = ScriptedBackend::new();
    backend.hang();
    let session = session(&backend, ExecutionMode::Quick);
    let mut updates = session.subscribe();

    session.start("hello").expect("start");
    wait_until("upstream call opened", || backend.request_count() == 1).await;

    assert!(session.cancel());
    assert!(!session.is_busy());
    assert_eq!(last_content(&session), CANCELLED_MARKER);
    assert_eq!(session.snapshot().phase, Phase::Cancelled);

    let (_, outcome) = next_finish(&mut updates).await;
    assert_eq!(outcome, RequestOutcome::Cancelled);
    assert!(!session.cancel(), "second cancel must be a no-op");
}

#[tokio::test]
async fn cancel_mid_stream_keeps_partial_text_and_ignores_late_data() {
    let backend = ScriptedBackend::new();
    let feed = backend.stream();
    let session = session(&backend, ExecutionMode::Quick);
    let mut updates = session.subscribe();

    session.start("hello").expect("start");
    feed.event(&json!({"type": "text", "content": "Working on it"}));
    wait_until("partial text", || last_content(&session) == "Working on it").await;

    assert!(session.cancel());
    let frozen = format!("Working on it\n\n{CANCELLED_MARKER}");
    assert_eq!(last_content(&session), frozen);

    feed.event(&json!({"type": "text", "content": "Working on it, more"}));
    feed.event(&json!({"type": "done"}));
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(last_content(&session), frozen, "late data must not change a cancelled turn");
    let transcript = session.transcript();
    assert!(!transcript[1].is_streaming);
    assert_eq!(finished_count(&drain_updates(&mut updates)), 1);
}

#[tokio::test]
async fn completion_wins_over_late_cancel() {
    let backend = ScriptedBackend::new();
    let feed = backend.stream();
    let session = session(&backend, ExecutionMode::Quick);
    let mut updates = session.subscribe();

    session.start("hello").expect("start");
    feed.event(&json!({"type": "text", "content": "all done"}));
    feed.event(&json!({"type": "done"}));
    let (_, outcome) = next_finish(&mut updates).await;
    assert_eq!(outcome, RequestOutcome::Completed);

    assert!(!session.cancel(), "finished request cannot be cancelled");
    assert_eq!(last_content(&session), "all done");
}

#[tokio::test]
async fn cancel_wins_over_unprocessed_completion() {
    let backend = ScriptedBackend::new();
    let feed = backend.stream();
    let session = session(&backend, ExecutionMode::Quick);
    let mut updates = session.subscribe();

    session.start("hello").expect("start");
    // The consumer task has not run yet on this single-threaded runtime.
    feed.event(&json!({"type": "text", "content": "answer"}));
    feed.event(&json!({"type": "done"}));
    assert!(session.cancel());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(last_content(&session), CANCELLED_MARKER);
    let outcomes: Vec<RequestOutcome> = drain_updates(&mut updates)
        .into_iter()
        .filter_map(|u| match u {
            SessionUpdate::RequestFinished { outcome, .. } => Some(outcome),
            _ => None,
        })
        .collect();
    assert_eq!(outcomes, vec![RequestOutcome::Cancelled]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_cancel_and_completion_finalize_once() {
    for round in 0..25 {
        let backend = ScriptedBackend::new();
        let feed = backend.stream();
        let session = session(&backend, ExecutionMode::Quick);
        let mut updates = session.subscribe();

        session.start(format!("round {round}")).expect("start");
        feed.event(&json!({"type": "text", "content": "x"}));
        feed.event(&json!({"type": "done"}));
        if round % 2 == 1 {
            tokio::task::yield_now().await;
        }
        let cancelled = session.cancel();

        let (_, outcome) = next_finish(&mut updates).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(
            finished_count(&drain_updates(&mut updates)),
            0,
            "round {round}: request finalized more than once"
        );

        let content = last_content(&session);
        match outcome {
            RequestOutcome::Cancelled => {
                assert!(cancelled, "round {round}");
                assert!(content.ends_with(CANCELLED_MARKER), "round {round}: {content}");
            }
            RequestOutcome::Completed => {
                assert!(!cancelled, "round {round}");
                assert_eq!(content, "x", "round {round}");
            }
            other => panic!("round {round}: unexpected outcome {other:?}"),
        }
        assert!(!session.is_busy());
    }
}
