//! No-op and recording collaborators for wiring and tests.

use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::engine::collaborator::{
    BackendCall, BackendError, BackendKind, ClaimResult, FulfillmentBackend, ResultSink,
    ValidationBackend,
};
use crate::engine::identity::{AccountId, ClaimId};

/// Accepts every dispatch and never responds; claims park until timeout.
pub struct NoopValidationBackend;

impl ValidationBackend for NoopValidationBackend {
    fn request_validation(&self, _call: BackendCall<'_>) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Accepts every dispatch and never responds.
pub struct NoopFulfillmentBackend;

impl FulfillmentBackend for NoopFulfillmentBackend {
    fn request_fulfillment(&self, _call: BackendCall<'_>) -> Result<(), BackendError> {
        Ok(())
    }
}

/// One recorded backend dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub target: BackendKind,
    pub claim_id: ClaimId,
    pub account_id: AccountId,
    pub kind: String,
    pub payload: Value,
}

/// Backend that records every dispatch (and abandon) for assertions.
/// Register the same instance as both validation and fulfillment backend to
/// observe the full call sequence in order.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<RecordedCall>>,
    abandoned: Mutex<Vec<ClaimId>>,
}

impl RecordingBackend {
    fn record(&self, target: BackendKind, call: BackendCall<'_>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                target,
                claim_id: call.claim_id.clone(),
                account_id: call.account_id,
                kind: call.kind.to_string(),
                payload: call.payload.clone(),
            });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_to(&self, target: BackendKind) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.target == target)
            .collect()
    }

    pub fn abandoned(&self) -> Vec<ClaimId> {
        self.abandoned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ValidationBackend for RecordingBackend {
    fn request_validation(&self, call: BackendCall<'_>) -> Result<(), BackendError> {
        self.record(BackendKind::Validation, call);
        Ok(())
    }

    fn abandon(&self, claim_id: &ClaimId) {
        self.abandoned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(claim_id.clone());
    }
}

impl FulfillmentBackend for RecordingBackend {
    fn request_fulfillment(&self, call: BackendCall<'_>) -> Result<(), BackendError> {
        self.record(BackendKind::Fulfillment, call);
        Ok(())
    }

    fn abandon(&self, claim_id: &ClaimId) {
        self.abandoned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(claim_id.clone());
    }
}

/// Sink that retains every delivered result for assertions.
#[derive(Default)]
pub struct RecordingResultSink {
    results: Mutex<Vec<ClaimResult>>,
}

impl RecordingResultSink {
    pub fn snapshot(&self) -> Vec<ClaimResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl ResultSink for RecordingResultSink {
    fn notify(&self, result: &ClaimResult) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
    }
}
