//! Operation strategy: the pluggable Start/Validate/Fulfill hooks for one
//! claim kind.
//!
//! A hook not overridden defaults to "accept and advance": an omitted
//! `start` accepts unconditionally, an omitted `validate` advances straight
//! to fulfillment. `fulfill` has no default — that is where the observable
//! effect happens, so every strategy must implement it.

use chrono::Duration;
use serde_json::Value;

use crate::engine::collaborator::{FulfillmentBackend, ValidationBackend};
use crate::engine::event::{EngineError, PhaseEvent};
use crate::engine::identity::AccountId;
use crate::engine::phase::{ClaimPhase, ResultCode};
use crate::engine::request::ClaimRequest;

/// Deadline and retry budget for one phase.
///
/// A budget of N allows the initial call issued on phase entry plus N
/// timeout-driven re-issues before the phase rejects with a timeout.
#[derive(Clone, Copy, Debug)]
pub struct TimeoutPolicy {
    pub deadline: Duration,
    pub retries: u32,
}

impl TimeoutPolicy {
    pub fn new(deadline: Duration, retries: u32) -> Self {
        Self { deadline, retries }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::seconds(10),
            retries: 3,
        }
    }
}

/// Outcome of the synchronous structural check at submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartDecision {
    Accept,
    Reject(String),
}

/// What the validation hook decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidateDecision {
    /// Keep waiting for a response (or for the deadline to drive a retry).
    StillWaiting,
    /// Move to the fulfillment phase with a fresh deadline and budget.
    Advance,
    Reject(ResultCode, String),
}

/// What the fulfillment hook decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FulfillDecision {
    StillWaiting,
    Succeed,
    Reject(ResultCode, String),
}

/// Collaborator handles passed to phase hooks for issuing backend calls.
/// Hooks dispatch and return; they never block on the response.
pub struct HookCtx<'a> {
    pub validation: &'a dyn ValidationBackend,
    pub fulfillment: &'a dyn FulfillmentBackend,
}

/// Business-specific behavior for one claim kind.
pub trait ClaimStrategy: Send + Sync {
    /// Kind tag this strategy governs (registry routing key).
    fn kind(&self) -> &str;

    /// Synchronous, cheap structural check of the caller-supplied payload.
    /// Must not perform I/O. On reject no request is created.
    fn start(&self, _account_id: AccountId, _payload: &Value) -> StartDecision {
        StartDecision::Accept
    }

    /// Invoked while the request is Validating. Default: advance immediately
    /// (kinds with nothing to validate skip the phase).
    fn validate(
        &self,
        _ctx: &HookCtx<'_>,
        _request: &ClaimRequest,
        _event: &PhaseEvent,
    ) -> Result<ValidateDecision, EngineError> {
        Ok(ValidateDecision::Advance)
    }

    /// Invoked while the request is Fulfilling. Performs the state-changing
    /// action; must be safe to invoke more than once for the same request
    /// (the underlying commit is idempotent keyed by the claim id).
    fn fulfill(
        &self,
        ctx: &HookCtx<'_>,
        request: &ClaimRequest,
        event: &PhaseEvent,
    ) -> Result<FulfillDecision, EngineError>;

    /// Per-kind override of the registry's per-phase timeout policy.
    fn timeout_policy(&self, _phase: ClaimPhase) -> Option<TimeoutPolicy> {
        None
    }
}
