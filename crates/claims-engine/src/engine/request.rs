//! The per-claim state record.
//!
//! The payload is set once at start and never mutated; phase, deadline,
//! retry budget, and result mutate only through the registry's dispatch of
//! the owning strategy's hooks (`pub(crate)` mutators).

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::engine::collaborator::{BackendCall, ClaimResult};
use crate::engine::identity::{AccountId, ClaimId, ClaimKind};
use crate::engine::phase::{ClaimPhase, ResultCode};
use crate::engine::strategy::TimeoutPolicy;

/// One in-flight claim operation.
#[derive(Clone, Debug)]
pub struct ClaimRequest {
    id: ClaimId,
    account_id: AccountId,
    kind: ClaimKind,
    payload: Value,
    phase: ClaimPhase,
    deadline: DateTime<Utc>,
    retries_remaining: u32,
    result: Option<ResultCode>,
    detail: Option<String>,
}

impl ClaimRequest {
    /// Builds an accepted request already in Validating with a fresh
    /// deadline and retry budget.
    pub(crate) fn new(
        id: ClaimId,
        account_id: AccountId,
        kind: ClaimKind,
        payload: Value,
        now: DateTime<Utc>,
        policy: &TimeoutPolicy,
    ) -> Self {
        Self {
            id,
            account_id,
            kind,
            payload,
            phase: ClaimPhase::Validating,
            deadline: now + policy.deadline,
            retries_remaining: policy.retries,
            result: None,
            detail: None,
        }
    }

    pub fn id(&self) -> &ClaimId {
        &self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn phase(&self) -> ClaimPhase {
        self.phase
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn retries_remaining(&self) -> u32 {
        self.retries_remaining
    }

    pub fn result(&self) -> Option<ResultCode> {
        self.result
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// True when the current phase's outstanding call has passed its
    /// deadline.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && self.deadline <= now
    }

    /// Arguments for dispatching this request to a backend.
    pub fn call(&self) -> BackendCall<'_> {
        BackendCall {
            claim_id: &self.id,
            account_id: self.account_id,
            kind: self.kind.as_str(),
            payload: &self.payload,
        }
    }

    /// Moves to `phase` with a fresh deadline and retry budget.
    pub(crate) fn enter(&mut self, phase: ClaimPhase, now: DateTime<Utc>, policy: &TimeoutPolicy) {
        debug_assert!(self.phase.can_advance_to(phase));
        self.phase = phase;
        self.deadline = now + policy.deadline;
        self.retries_remaining = policy.retries;
    }

    /// Pushes the deadline out after a timeout-driven re-issue.
    pub(crate) fn reset_deadline(&mut self, now: DateTime<Utc>, policy: &TimeoutPolicy) {
        self.deadline = now + policy.deadline;
    }

    /// Consumes one unit of retry budget; saturates at zero.
    pub(crate) fn consume_retry(&mut self) {
        self.retries_remaining = self.retries_remaining.saturating_sub(1);
    }

    /// Terminal transition; the phase follows from the code.
    pub(crate) fn finish(&mut self, code: ResultCode, detail: Option<String>) {
        self.phase = if code.is_success() {
            ClaimPhase::Succeeded
        } else {
            ClaimPhase::Failed
        };
        self.result = Some(code);
        self.detail = detail;
    }

    /// The result record to report, once terminal.
    pub(crate) fn result_record(&self) -> Option<ClaimResult> {
        self.result.map(|code| ClaimResult {
            claim_id: self.id.clone(),
            account_id: self.account_id,
            kind: self.kind.clone(),
            code,
            detail: self.detail.clone(),
        })
    }
}
