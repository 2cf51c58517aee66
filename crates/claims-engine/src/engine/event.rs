//! Phase hook events and the engine error type.
//!
//! A phase hook is invoked for exactly one of three causes: the request just
//! entered the phase, an awaited backend response arrived, or the phase
//! deadline elapsed. The cause is carried as an explicit event rather than a
//! flag so that retry accounting stays unambiguous.

use serde_json::Value;

/// Why a phase hook is being invoked.
#[derive(Clone, Debug)]
pub enum PhaseEvent {
    /// First invocation after the request enters the phase. A strategy
    /// issues the phase's backend call here (or advances immediately).
    Entered,
    /// An awaited collaborator response arrived; the hook consumes it.
    Response(Value),
    /// The phase deadline expired with no usable response. The hook either
    /// re-issues its call (consuming one unit of retry budget) or, with the
    /// budget exhausted, rejects with a timeout.
    DeadlineElapsed,
}

impl PhaseEvent {
    pub fn is_deadline(&self) -> bool {
        matches!(self, PhaseEvent::DeadlineElapsed)
    }
}

/// Engine-level error type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("strategy error: {0}")]
    Strategy(String),
    /// Collaborator dispatch failed; the kind decides retry vs immediate
    /// failure.
    #[error("backend: {0}")]
    Backend(#[from] crate::engine::collaborator::BackendError),
}
