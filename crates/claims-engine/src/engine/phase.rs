//! Claim lifecycle phases and terminal result codes.
//!
//! Phases move Created → Validating → Fulfilling → {Succeeded | Failed};
//! Failed is reachable from any non-terminal phase; no phase is revisited
//! once left.

use serde::{Deserialize, Serialize};

/// One stage of a claim request's lifecycle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClaimPhase {
    Created,
    Validating,
    Fulfilling,
    Succeeded,
    Failed,
}

impl ClaimPhase {
    /// True once the request has reached an end state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimPhase::Succeeded | ClaimPhase::Failed)
    }

    /// Whether the state machine may move from `self` to `next`.
    pub fn can_advance_to(&self, next: ClaimPhase) -> bool {
        match (self, next) {
            (ClaimPhase::Created, ClaimPhase::Validating) => true,
            (ClaimPhase::Validating, ClaimPhase::Fulfilling) => true,
            (ClaimPhase::Fulfilling, ClaimPhase::Succeeded) => true,
            (from, ClaimPhase::Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimPhase::Created => "created",
            ClaimPhase::Validating => "validating",
            ClaimPhase::Fulfilling => "fulfilling",
            ClaimPhase::Succeeded => "succeeded",
            ClaimPhase::Failed => "failed",
        }
    }
}

/// Machine-readable outcome attached to a terminal request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResultCode {
    Succeeded,
    /// Payload failed the strategy's structural checks; no request was created.
    StructuralRejection,
    /// A backend response said the operation is disallowed (name taken,
    /// insufficient funds, ...).
    BusinessRejection,
    /// The retry budget was consumed without a usable response.
    TimeoutExhausted,
    /// A collaborator failed in a way that never reached a business decision.
    TransientFailure,
    Cancelled,
}

impl ResultCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Succeeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Succeeded => "succeeded",
            ResultCode::StructuralRejection => "structural_rejection",
            ResultCode::BusinessRejection => "business_rejection",
            ResultCode::TimeoutExhausted => "timeout_exhausted",
            ResultCode::TransientFailure => "transient_failure",
            ResultCode::Cancelled => "cancelled",
        }
    }
}
