//! End-to-end claim flows through the registry with recording collaborators.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use claims_engine::{
    BackendKind, ClaimPhase, ClaimRegistry, EngineConfig, RecordingBackend, RecordingResultSink,
    RejectReason, RenameStrategy, RespecStrategy, ResultCode, SlotPurchaseStrategy, TimeoutPolicy,
};

struct Harness {
    registry: ClaimRegistry,
    backend: Arc<RecordingBackend>,
    sink: Arc<RecordingResultSink>,
}

fn harness(config: EngineConfig) -> Harness {
    let backend = Arc::new(RecordingBackend::default());
    let sink = Arc::new(RecordingResultSink::default());
    let registry = ClaimRegistry::new(backend.clone(), backend.clone(), sink.clone(), config)
        .with_strategy(Arc::new(RenameStrategy))
        .with_strategy(Arc::new(RespecStrategy))
        .with_strategy(Arc::new(SlotPurchaseStrategy));
    Harness {
        registry,
        backend,
        sink,
    }
}

#[test]
fn rename_success_walks_both_phases() {
    let h = harness(EngineConfig::default());
    let now = Utc::now();
    let id = h
        .registry
        .submit(1, "rename", json!({"new_name": "Hero"}), now)
        .expect("submit accepted");

    // Validation was dispatched on entry.
    let validations = h.backend.calls_to(BackendKind::Validation);
    assert_eq!(validations.len(), 1);
    assert_eq!(validations[0].claim_id, id);
    assert_eq!(h.registry.phase(&id), Some(ClaimPhase::Validating));

    h.registry
        .deliver_response(&id, BackendKind::Validation, json!({"approved": true}));
    assert_eq!(h.registry.phase(&id), Some(ClaimPhase::Fulfilling));
    assert_eq!(h.backend.calls_to(BackendKind::Fulfillment).len(), 1);

    h.registry
        .deliver_response(&id, BackendKind::Fulfillment, json!({"committed": true}));

    let results = h.sink.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].claim_id, id);
    assert_eq!(results[0].code, ResultCode::Succeeded);
    assert!(h.registry.is_empty());
}

#[test]
fn rename_collision_never_reaches_fulfillment() {
    let h = harness(EngineConfig::default());
    let id = h
        .registry
        .submit(1, "rename", json!({"new_name": "Hero"}), Utc::now())
        .expect("submit accepted");

    h.registry.deliver_response(
        &id,
        BackendKind::Validation,
        json!({"approved": false, "reason": "name taken"}),
    );

    let results = h.sink.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, ResultCode::BusinessRejection);
    assert_eq!(results[0].detail.as_deref(), Some("name taken"));
    assert!(h.backend.calls_to(BackendKind::Fulfillment).is_empty());
    assert!(h.registry.is_empty());
}

#[test]
fn slot_purchase_skips_validation_and_fails_on_funds() {
    let h = harness(EngineConfig::default());
    let id = h
        .registry
        .submit(2, "slot", json!({"slot_index": 5}), Utc::now())
        .expect("submit accepted");

    // Straight to fulfillment; no validation call was issued.
    assert_eq!(h.registry.phase(&id), Some(ClaimPhase::Fulfilling));
    assert!(h.backend.calls_to(BackendKind::Validation).is_empty());
    assert_eq!(h.backend.calls_to(BackendKind::Fulfillment).len(), 1);

    h.registry.deliver_response(
        &id,
        BackendKind::Fulfillment,
        json!({"committed": false, "reason": "insufficient funds"}),
    );

    let results = h.sink.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, ResultCode::BusinessRejection);
    assert_eq!(results[0].detail.as_deref(), Some("insufficient funds"));
}

#[test]
fn validation_silence_exhausts_the_retry_budget() {
    let h = harness(EngineConfig {
        validate: TimeoutPolicy::new(Duration::seconds(10), 3),
        fulfill: TimeoutPolicy::default(),
    });
    let now = Utc::now();
    let id = h
        .registry
        .submit(1, "rename", json!({"new_name": "Hero"}), now)
        .expect("submit accepted");

    // Three expiries re-issue the call; the fourth finds the budget empty.
    let mut at = now;
    for round in 1..=3u32 {
        at += Duration::seconds(11);
        let summary = h.registry.tick(at);
        assert_eq!(summary.expired, 1, "round {}", round);
        assert_eq!(summary.finished, 0, "round {}", round);
    }
    assert_eq!(h.backend.calls_to(BackendKind::Validation).len(), 4);

    at += Duration::seconds(11);
    let summary = h.registry.tick(at);
    assert_eq!(summary.finished, 1);

    let results = h.sink.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].claim_id, id);
    assert_eq!(results[0].code, ResultCode::TimeoutExhausted);
    assert!(h.registry.is_empty());
}

#[test]
fn second_submit_for_account_is_refused_while_first_is_live() {
    let h = harness(EngineConfig::default());
    let now = Utc::now();
    let first = h
        .registry
        .submit(1, "rename", json!({"new_name": "Hero"}), now)
        .expect("submit accepted");
    assert_eq!(h.registry.phase(&first), Some(ClaimPhase::Validating));

    let err = h
        .registry
        .submit(1, "respec", json!({}), now)
        .expect_err("second claim refused");
    assert_eq!(err, RejectReason::AlreadyClaiming);
    assert_eq!(h.registry.len(), 1);

    // A different account is unaffected.
    assert!(h.registry.submit(2, "respec", json!({}), now).is_ok());
}

#[test]
fn start_rejection_creates_nothing_and_notifies_nobody() {
    let h = harness(EngineConfig::default());
    let err = h
        .registry
        .submit(1, "rename", json!({"new_name": ""}), Utc::now())
        .expect_err("structural rejection");
    assert!(matches!(err, RejectReason::Malformed(_)));
    assert!(h.registry.is_empty());
    assert!(h.sink.is_empty());
    assert!(h.backend.calls().is_empty());
}

#[test]
fn fulfillment_retry_reuses_the_claim_id_and_reports_once() {
    let h = harness(EngineConfig {
        validate: TimeoutPolicy::default(),
        fulfill: TimeoutPolicy::new(Duration::seconds(10), 2),
    });
    let now = Utc::now();
    let id = h
        .registry
        .submit(2, "slot", json!({"slot_index": 3}), now)
        .expect("submit accepted");

    // The commit succeeded downstream but the acknowledgement was lost; the
    // deadline re-issues the same call.
    let at = now + Duration::seconds(11);
    h.registry.tick(at);

    let commits = h.backend.calls_to(BackendKind::Fulfillment);
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].claim_id, commits[1].claim_id);
    assert_eq!(commits[0].payload, commits[1].payload);

    // The (single) downstream effect is finally acknowledged.
    h.registry
        .deliver_response(&id, BackendKind::Fulfillment, json!({"committed": true}));
    let results = h.sink.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, ResultCode::Succeeded);

    // A straggling duplicate acknowledgement changes nothing.
    h.registry
        .deliver_response(&id, BackendKind::Fulfillment, json!({"committed": true}));
    assert_eq!(h.sink.snapshot().len(), 1);
}

#[test]
fn cancel_wins_over_a_late_response_and_releases_the_backend() {
    let h = harness(EngineConfig::default());
    let id = h
        .registry
        .submit(1, "rename", json!({"new_name": "Hero"}), Utc::now())
        .expect("submit accepted");

    assert!(h.registry.cancel(&id, "client disconnected"));
    assert_eq!(h.backend.abandoned(), vec![id.clone()]);

    // The validation answer arrives after the cancellation.
    h.registry
        .deliver_response(&id, BackendKind::Validation, json!({"approved": true}));

    let results = h.sink.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, ResultCode::Cancelled);
    assert!(h.registry.is_empty());
}

#[test]
fn respec_flow_validates_the_credit_then_commits() {
    let h = harness(EngineConfig::default());
    let id = h
        .registry
        .submit(7, "respec", json!({"build_id": 1}), Utc::now())
        .expect("submit accepted");

    h.registry
        .deliver_response(&id, BackendKind::Validation, json!({"approved": true}));
    h.registry
        .deliver_response(&id, BackendKind::Fulfillment, json!({"committed": true}));

    let results = h.sink.snapshot();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, ResultCode::Succeeded);
    assert_eq!(results[0].kind, "respec");
}

#[test]
fn transient_answer_defers_to_the_deadline_budget() {
    let h = harness(EngineConfig {
        validate: TimeoutPolicy::new(Duration::seconds(10), 1),
        fulfill: TimeoutPolicy::default(),
    });
    let now = Utc::now();
    let id = h
        .registry
        .submit(1, "rename", json!({"new_name": "Hero"}), now)
        .expect("submit accepted");

    h.registry
        .deliver_response(&id, BackendKind::Validation, json!({"transient": true}));
    assert_eq!(h.registry.phase(&id), Some(ClaimPhase::Validating));

    // One re-issue remains, then the next expiry exhausts the phase.
    let summary = h.registry.tick(now + Duration::seconds(11));
    assert_eq!(summary.expired, 1);
    let summary = h.registry.tick(now + Duration::seconds(22));
    assert_eq!(summary.finished, 1);

    let results = h.sink.snapshot();
    assert_eq!(results[0].code, ResultCode::TimeoutExhausted);
}
