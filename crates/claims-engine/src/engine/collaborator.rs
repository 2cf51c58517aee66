//! Collaborator contracts: backend dispatch and result delivery.
//!
//! **Constraints (must hold in all implementations):**
//! - Dispatch is non-blocking: a backend call enqueues work and returns; the
//!   completion comes back later through the registry's `deliver_response`.
//! - Implementations must not call back into the registry from the dispatch
//!   call itself; responses are delivered from another task or thread.
//! - `request_fulfillment` must be idempotent when retried with the same
//!   claim id: a retry after a successful-but-unacknowledged commit applies
//!   the effect at most once downstream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::identity::{AccountId, ClaimId, ClaimKind};
use crate::engine::phase::ResultCode;

/// Which collaborator a dispatched call went to (and which one a delivered
/// response came from). A response from a backend the current phase is not
/// waiting on is stale and discarded.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackendKind {
    Validation,
    Fulfillment,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Validation => "validation",
            BackendKind::Fulfillment => "fulfillment",
        }
    }
}

/// Classifies dispatch errors for the registry (retry vs fail).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Transient (e.g. queue full, connection blip); the phase deadline
    /// drives a re-attempt within the remaining budget.
    Transient,
    /// Permanent (e.g. misrouted call); the claim fails immediately.
    Permanent,
}

/// Structured error from a collaborator dispatch call.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.kind, BackendErrorKind::Transient)
    }
}

/// Arguments for one outbound backend call.
#[derive(Clone, Copy, Debug)]
pub struct BackendCall<'a> {
    pub claim_id: &'a ClaimId,
    pub account_id: AccountId,
    pub kind: &'a str,
    pub payload: &'a Value,
}

/// Outbound call into the validation backend (account database, auth).
pub trait ValidationBackend: Send + Sync {
    fn request_validation(&self, call: BackendCall<'_>) -> Result<(), BackendError>;

    /// Best-effort cleanup when a claim is cancelled mid-phase.
    fn abandon(&self, _claim_id: &ClaimId) {}
}

/// Outbound call into the fulfillment backend. The underlying commit is
/// keyed by the claim id and idempotent under retry.
pub trait FulfillmentBackend: Send + Sync {
    fn request_fulfillment(&self, call: BackendCall<'_>) -> Result<(), BackendError>;

    /// Best-effort cleanup when a claim is cancelled mid-phase.
    fn abandon(&self, _claim_id: &ClaimId) {}
}

/// Terminal outcome of one claim, delivered exactly once per request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimResult {
    pub claim_id: ClaimId,
    pub account_id: AccountId,
    pub kind: ClaimKind,
    pub code: ResultCode,
    pub detail: Option<String>,
}

/// Receives the terminal result of each claim (typically the layer that
/// submitted it, which encodes the outcome back to the client).
pub trait ResultSink: Send + Sync {
    fn notify(&self, result: &ClaimResult);
}
