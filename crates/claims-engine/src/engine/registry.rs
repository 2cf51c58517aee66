//! Claim registry/scheduler: owns the set of live claim requests, enforces
//! one-active-claim-per-account, and serializes phase transitions.
//!
//! **Constraints (must hold for all entry points):**
//! - All transitions for one request are serialized: the request sits in an
//!   arena behind its own mutex, so concurrent `tick`/`deliver_response`/
//!   `cancel` invocations for the same request queue up while different
//!   requests proceed independently.
//! - The arena lock is never held across a hook invocation.
//! - A terminal result is reported to the sink exactly once, then the
//!   request is removed and the account slot freed.
//! - Unknown or stale claim ids are silently ignored (a race between
//!   retransmission and cancellation is not a fault).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::engine::collaborator::{
    BackendKind, FulfillmentBackend, ResultSink, ValidationBackend,
};
use crate::engine::event::{EngineError, PhaseEvent};
use crate::engine::identity::{AccountId, ClaimId, ClaimKind};
use crate::engine::phase::{ClaimPhase, ResultCode};
use crate::engine::request::ClaimRequest;
use crate::engine::strategy::{
    ClaimStrategy, FulfillDecision, HookCtx, StartDecision, TimeoutPolicy, ValidateDecision,
};

/// Why a submission was refused. No request is created in any of these
/// cases and the result sink is never notified.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("account already has an active claim")]
    AlreadyClaiming,
    #[error("unknown claim kind: {0}")]
    UnknownKind(ClaimKind),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Per-phase timeout policies applied when a strategy supplies no override.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineConfig {
    pub validate: TimeoutPolicy,
    pub fulfill: TimeoutPolicy,
}

/// Counters from one scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Requests whose deadline had elapsed and whose hook was driven.
    pub expired: u64,
    /// Requests that reached a terminal phase during this tick.
    pub finished: u64,
}

#[derive(PartialEq)]
enum DriveOutcome {
    /// Nothing to do (stale, not due, or already terminal).
    Skipped,
    /// The hook ran; the request is still live.
    Progressed,
    /// The request reached a terminal phase and was retired.
    Finished,
}

enum DriveCause {
    Entered,
    Deadline,
    Response { origin: BackendKind, value: Value },
    Cancel { detail: String },
}

#[derive(Default)]
struct Arena {
    requests: HashMap<ClaimId, Arc<Mutex<ClaimRequest>>>,
    by_account: HashMap<AccountId, ClaimId>,
}

/// Owns all live claim requests. Explicit object, constructed at startup
/// and shared by reference; there is no global registry.
pub struct ClaimRegistry {
    strategies: HashMap<ClaimKind, Arc<dyn ClaimStrategy>>,
    arena: Mutex<Arena>,
    validation: Arc<dyn ValidationBackend>,
    fulfillment: Arc<dyn FulfillmentBackend>,
    results: Arc<dyn ResultSink>,
    config: EngineConfig,
    next_id: AtomicU64,
}

impl ClaimRegistry {
    pub fn new(
        validation: Arc<dyn ValidationBackend>,
        fulfillment: Arc<dyn FulfillmentBackend>,
        results: Arc<dyn ResultSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            strategies: HashMap::new(),
            arena: Mutex::new(Arena::default()),
            validation,
            fulfillment,
            results,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers the strategy under its own kind tag. Last registration for
    /// a tag wins.
    pub fn register(&mut self, strategy: Arc<dyn ClaimStrategy>) {
        self.strategies.insert(strategy.kind().to_string(), strategy);
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn ClaimStrategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Accepts or refuses a new claim. On acceptance the request is created
    /// in Validating, indexed by account, and its entry hook is driven.
    pub fn submit(
        &self,
        account_id: AccountId,
        kind: &str,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Result<ClaimId, RejectReason> {
        if lock(&self.arena).by_account.contains_key(&account_id) {
            return Err(RejectReason::AlreadyClaiming);
        }

        let strategy = self
            .strategies
            .get(kind)
            .ok_or_else(|| RejectReason::UnknownKind(kind.to_string()))?
            .clone();

        match strategy.start(account_id, &payload) {
            StartDecision::Accept => {}
            StartDecision::Reject(detail) => {
                debug!(account_id, kind, %detail, "claim refused at start");
                return Err(RejectReason::Malformed(detail));
            }
        }

        let policy = self.policy_for(strategy.as_ref(), ClaimPhase::Validating);
        let claim_id = self.allocate_id();
        let request = ClaimRequest::new(
            claim_id.clone(),
            account_id,
            kind.to_string(),
            payload,
            now,
            &policy,
        );
        let entry = Arc::new(Mutex::new(request));

        {
            let mut arena = lock(&self.arena);
            if arena.by_account.contains_key(&account_id) {
                return Err(RejectReason::AlreadyClaiming);
            }
            arena.requests.insert(claim_id.clone(), entry.clone());
            arena.by_account.insert(account_id, claim_id.clone());
        }

        info!(claim_id = %claim_id, account_id, kind, "claim accepted");
        self.drive(&entry, DriveCause::Entered, now);
        Ok(claim_id)
    }

    /// Drives every live request whose deadline has elapsed.
    pub fn tick(&self, now: DateTime<Utc>) -> TickSummary {
        let entries: Vec<Arc<Mutex<ClaimRequest>>> = {
            let arena = lock(&self.arena);
            arena.requests.values().cloned().collect()
        };

        let mut summary = TickSummary::default();
        for entry in entries {
            match self.drive(&entry, DriveCause::Deadline, now) {
                DriveOutcome::Skipped => {}
                DriveOutcome::Progressed => summary.expired += 1,
                DriveOutcome::Finished => {
                    summary.expired += 1;
                    summary.finished += 1;
                }
            }
        }
        summary
    }

    /// Delivers an asynchronous backend completion. Unknown ids, terminal
    /// requests, and responses from a backend the current phase is not
    /// waiting on are discarded.
    pub fn deliver_response(&self, claim_id: &ClaimId, origin: BackendKind, response: Value) {
        let Some(entry) = self.entry(claim_id) else {
            debug!(claim_id = %claim_id, origin = origin.as_str(), "response for unknown claim discarded");
            return;
        };
        self.drive(
            &entry,
            DriveCause::Response {
                origin,
                value: response,
            },
            Utc::now(),
        );
    }

    /// Fails a live request with a cancellation result, releasing
    /// collaborator-side resources best-effort. Returns false for unknown
    /// or already-terminal claims.
    pub fn cancel(&self, claim_id: &ClaimId, detail: &str) -> bool {
        let Some(entry) = self.entry(claim_id) else {
            return false;
        };
        self.drive(
            &entry,
            DriveCause::Cancel {
                detail: detail.to_string(),
            },
            Utc::now(),
        ) == DriveOutcome::Finished
    }

    /// Current phase of a live request, if any.
    pub fn phase(&self, claim_id: &ClaimId) -> Option<ClaimPhase> {
        let entry = self.entry(claim_id)?;
        let guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(guard.phase())
    }

    /// The live claim occupying an account's slot, if any.
    pub fn active_claim(&self, account_id: AccountId) -> Option<ClaimId> {
        lock(&self.arena).by_account.get(&account_id).cloned()
    }

    /// Number of live requests.
    pub fn len(&self) -> usize {
        lock(&self.arena).requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn allocate_id(&self) -> ClaimId {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("claim-{:06}", seq)
    }

    fn entry(&self, claim_id: &ClaimId) -> Option<Arc<Mutex<ClaimRequest>>> {
        lock(&self.arena).requests.get(claim_id).cloned()
    }

    fn policy_for(&self, strategy: &dyn ClaimStrategy, phase: ClaimPhase) -> TimeoutPolicy {
        strategy.timeout_policy(phase).unwrap_or(match phase {
            ClaimPhase::Fulfilling => self.config.fulfill,
            _ => self.config.validate,
        })
    }

    /// The single serialized transition path: locks the request, maps the
    /// cause to a hook invocation, applies the decision, and retires the
    /// request if it went terminal.
    fn drive(
        &self,
        entry: &Arc<Mutex<ClaimRequest>>,
        cause: DriveCause,
        now: DateTime<Utc>,
    ) -> DriveOutcome {
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_terminal() {
            debug!(claim_id = %guard.id(), "event for terminal claim discarded");
            return DriveOutcome::Skipped;
        }

        match cause {
            DriveCause::Entered => self.step(&mut guard, PhaseEvent::Entered, now),
            DriveCause::Deadline => {
                // The deadline may have been reset since the tick scan.
                if !guard.is_due(now) {
                    return DriveOutcome::Skipped;
                }
                self.step(&mut guard, PhaseEvent::DeadlineElapsed, now);
            }
            DriveCause::Response { origin, value } => {
                let awaited = match guard.phase() {
                    ClaimPhase::Validating => BackendKind::Validation,
                    ClaimPhase::Fulfilling => BackendKind::Fulfillment,
                    _ => return DriveOutcome::Skipped,
                };
                if origin != awaited {
                    debug!(
                        claim_id = %guard.id(),
                        origin = origin.as_str(),
                        phase = guard.phase().as_str(),
                        "stale response for exited phase discarded"
                    );
                    return DriveOutcome::Skipped;
                }
                self.step(&mut guard, PhaseEvent::Response(value), now);
            }
            DriveCause::Cancel { detail } => {
                match guard.phase() {
                    ClaimPhase::Validating => self.validation.abandon(guard.id()),
                    ClaimPhase::Fulfilling => self.fulfillment.abandon(guard.id()),
                    _ => {}
                }
                guard.finish(ResultCode::Cancelled, Some(detail));
            }
        }

        match guard.result_record() {
            Some(result) => {
                drop(guard);
                info!(
                    claim_id = %result.claim_id,
                    account_id = result.account_id,
                    code = result.code.as_str(),
                    "claim finished"
                );
                self.results.notify(&result);
                self.retire(&result.claim_id, result.account_id);
                DriveOutcome::Finished
            }
            None => DriveOutcome::Progressed,
        }
    }

    /// Invokes the current phase's hook and applies the returned transition,
    /// chaining into the next phase's entry hook on advance.
    fn step(&self, request: &mut ClaimRequest, event: PhaseEvent, now: DateTime<Utc>) {
        let mut event = event;
        loop {
            let Some(strategy) = self.strategies.get(request.kind()).cloned() else {
                // Unreachable through submit; guards against unregistered kinds.
                request.finish(
                    ResultCode::TransientFailure,
                    Some(format!("no strategy registered for kind {}", request.kind())),
                );
                return;
            };
            let ctx = HookCtx {
                validation: self.validation.as_ref(),
                fulfillment: self.fulfillment.as_ref(),
            };

            match request.phase() {
                ClaimPhase::Validating => {
                    match strategy.validate(&ctx, request, &event) {
                        Ok(ValidateDecision::StillWaiting) => {
                            self.park(request, &event, strategy.as_ref(), now);
                            return;
                        }
                        Ok(ValidateDecision::Advance) => {
                            let policy = self.policy_for(strategy.as_ref(), ClaimPhase::Fulfilling);
                            request.enter(ClaimPhase::Fulfilling, now, &policy);
                            debug!(claim_id = %request.id(), "claim advanced to fulfillment");
                            event = PhaseEvent::Entered;
                            continue;
                        }
                        Ok(ValidateDecision::Reject(code, detail)) => {
                            request.finish(code, Some(detail));
                            return;
                        }
                        Err(err) => {
                            self.absorb_hook_error(request, err);
                            return;
                        }
                    }
                }
                ClaimPhase::Fulfilling => match strategy.fulfill(&ctx, request, &event) {
                    Ok(FulfillDecision::StillWaiting) => {
                        self.park(request, &event, strategy.as_ref(), now);
                        return;
                    }
                    Ok(FulfillDecision::Succeed) => {
                        request.finish(ResultCode::Succeeded, None);
                        return;
                    }
                    Ok(FulfillDecision::Reject(code, detail)) => {
                        request.finish(code, Some(detail));
                        return;
                    }
                    Err(err) => {
                        self.absorb_hook_error(request, err);
                        return;
                    }
                },
                _ => return,
            }
        }
    }

    /// Applies the bookkeeping for a StillWaiting decision. A timeout-driven
    /// re-issue consumes one unit of budget and gets a fresh deadline; entry
    /// keeps the deadline set when the phase was entered; a response that
    /// left the request waiting keeps the current deadline so repeated
    /// transient answers cannot extend the phase forever.
    fn park(
        &self,
        request: &mut ClaimRequest,
        event: &PhaseEvent,
        strategy: &dyn ClaimStrategy,
        now: DateTime<Utc>,
    ) {
        if event.is_deadline() {
            request.consume_retry();
            let policy = self.policy_for(strategy, request.phase());
            request.reset_deadline(now, &policy);
            debug!(
                claim_id = %request.id(),
                retries_remaining = request.retries_remaining(),
                "claim re-issued after deadline"
            );
        }
    }

    /// Recovers a hook error into engine semantics: transient dispatch
    /// failures park the request until its deadline drives a retry; anything
    /// else fails the claim.
    fn absorb_hook_error(&self, request: &mut ClaimRequest, err: EngineError) {
        match &err {
            EngineError::Backend(backend) if backend.is_transient() => {
                warn!(
                    claim_id = %request.id(),
                    error = %backend,
                    "transient backend dispatch failure; awaiting deadline retry"
                );
            }
            _ => {
                warn!(claim_id = %request.id(), error = %err, "claim failed on hook error");
                request.finish(ResultCode::TransientFailure, Some(err.to_string()));
            }
        }
    }

    fn retire(&self, claim_id: &ClaimId, account_id: AccountId) {
        let mut arena = lock(&self.arena);
        arena.requests.remove(claim_id);
        if arena.by_account.get(&account_id) == Some(claim_id) {
            arena.by_account.remove(&account_id);
        }
    }
}

fn lock(arena: &Mutex<Arena>) -> MutexGuard<'_, Arena> {
    arena.lock().unwrap_or_else(PoisonError::into_inner)
}
