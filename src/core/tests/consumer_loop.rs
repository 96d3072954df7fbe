//! Consumer loop behavior driven through a scripted message source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use libris_core::events::testing::{ScriptStep, ScriptedSource};
use libris_core::events::{EventConsumer, EventHandler, HandlerError, HandlerRegistry, RetryPolicy};

/// Handler that records each invocation and fails the first `fail_first` of
/// them.
struct FlakyHandler {
    calls: Arc<Mutex<Vec<(tokio::time::Instant, Value)>>>,
    fail_first: usize,
}

impl FlakyHandler {
    fn new(fail_first: usize) -> (Self, Arc<Mutex<Vec<(tokio::time::Instant, Value)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: Arc::clone(&calls),
                fail_first,
            },
            calls,
        )
    }
}

#[async_trait]
impl EventHandler for FlakyHandler {
    async fn handle(&self, data: Value) -> Result<(), HandlerError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((tokio::time::Instant::now(), data));
        if calls.len() <= self.fail_first {
            return Err("simulated handler failure".into());
        }
        Ok(())
    }
}

fn envelope_bytes(event_type: &str, data: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "event_type": event_type,
        "event_id": "1db87a60-0e52-4c0b-9c4f-90b9a0a1f8a0",
        "timestamp": "2026-01-05T12:00:00Z",
        "correlation_id": "test-corr",
        "data": data,
    }))
    .unwrap()
}

/// Run the consumer over the script until time stops advancing, then cancel.
async fn run_script(registry: HandlerRegistry, steps: Vec<ScriptStep>) -> Arc<AtomicUsize> {
    let source = ScriptedSource::new(steps);
    let connects = source.connect_counter();
    let consumer = EventConsumer::new(source, registry)
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        })
        .with_reconnect_delay(Duration::from_secs(5));

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(consumer.run(shutdown.clone()));

    // Paused clock: sleeps resolve instantly, so a generous advance drains
    // the whole script including backoff and reconnect delays.
    tokio::time::sleep(Duration::from_secs(60)).await;

    shutdown.cancel();
    handle.await.unwrap();
    connects
}

#[tokio::test(start_paused = true)]
async fn transient_handler_failure_is_retried_with_backoff() {
    let (handler, calls) = FlakyHandler::new(2);
    let mut registry = HandlerRegistry::new();
    registry.register("book.created", Arc::new(handler)).unwrap();

    run_script(
        registry,
        vec![ScriptStep::message(
            "book.created",
            envelope_bytes("book.created", json!({"book_id": 1})),
        )],
    )
    .await;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3, "two failures then one success");

    // 2s after the first failure, 4s after the second
    let gap1 = calls[1].0 - calls[0].0;
    let gap2 = calls[2].0 - calls[1].0;
    assert_eq!(gap1, Duration::from_secs(2));
    assert_eq!(gap2, Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_dead_letter_and_move_on() {
    let (handler, calls) = FlakyHandler::new(usize::MAX);
    let (next_handler, next_calls) = FlakyHandler::new(0);
    let mut registry = HandlerRegistry::new();
    registry.register("book.created", Arc::new(handler)).unwrap();
    registry.register("book.deleted", Arc::new(next_handler)).unwrap();

    run_script(
        registry,
        vec![
            ScriptStep::message(
                "book.created",
                envelope_bytes("book.created", json!({"book_id": 1})),
            ),
            ScriptStep::message(
                "book.deleted",
                envelope_bytes("book.deleted", json!({"book_id": 1})),
            ),
        ],
    )
    .await;

    // 3 attempts, no fourth, and the following message is still processed
    assert_eq!(calls.lock().unwrap().len(), 3);
    assert_eq!(next_calls.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_payload_is_dropped() {
    let (handler, calls) = FlakyHandler::new(0);
    let mut registry = HandlerRegistry::new();
    registry.register("book.created", Arc::new(handler)).unwrap();

    run_script(
        registry,
        vec![
            ScriptStep::message("book.created", b"not json at all".to_vec()),
            ScriptStep::message(
                "book.created",
                envelope_bytes("book.created", json!({"book_id": 2})),
            ),
        ],
    )
    .await;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1["book_id"], 2);
}

#[tokio::test(start_paused = true)]
async fn unknown_event_type_is_skipped() {
    let (handler, calls) = FlakyHandler::new(0);
    let mut registry = HandlerRegistry::new();
    registry.register("book.created", Arc::new(handler)).unwrap();

    run_script(
        registry,
        vec![ScriptStep::message(
            "book.created",
            envelope_bytes("book.renamed", json!({"book_id": 3})),
        )],
    )
    .await;

    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_event_type_falls_back_to_topic() {
    let (handler, calls) = FlakyHandler::new(0);
    let mut registry = HandlerRegistry::new();
    registry.register("book.updated", Arc::new(handler)).unwrap();

    run_script(
        registry,
        vec![ScriptStep::message(
            "book.updated",
            serde_json::to_vec(&json!({"data": {"book_id": 4}})).unwrap(),
        )],
    )
    .await;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1["book_id"], 4);
}

#[tokio::test(start_paused = true)]
async fn transport_error_triggers_reconnect() {
    let (handler, calls) = FlakyHandler::new(0);
    let mut registry = HandlerRegistry::new();
    registry.register("book.created", Arc::new(handler)).unwrap();

    let connects = run_script(
        registry,
        vec![
            ScriptStep::message(
                "book.created",
                envelope_bytes("book.created", json!({"book_id": 1})),
            ),
            ScriptStep::Error("broker went away".into()),
            ScriptStep::message(
                "book.created",
                envelope_bytes("book.created", json!({"book_id": 2})),
            ),
        ],
    )
    .await;

    // initial connect plus one reconnect after the transport error
    assert_eq!(connects.load(Ordering::SeqCst), 2);
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_stops_retrying() {
    let (handler, calls) = FlakyHandler::new(usize::MAX);
    let mut registry = HandlerRegistry::new();
    registry.register("book.created", Arc::new(handler)).unwrap();

    let source = ScriptedSource::new(vec![ScriptStep::message(
        "book.created",
        envelope_bytes("book.created", json!({"book_id": 1})),
    )]);
    let consumer = EventConsumer::new(source, registry).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
    });

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(consumer.run(shutdown.clone()));

    // cancel one second into the first 2s backoff
    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown.cancel();
    handle.await.unwrap();

    assert_eq!(calls.lock().unwrap().len(), 1, "no further attempts after shutdown");
}

#[tokio::test(start_paused = true)]
async fn empty_registry_never_connects() {
    let connects = run_script(HandlerRegistry::new(), vec![]).await;
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}
