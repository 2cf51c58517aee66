//! Async backend seam and the channel bridge into the engine.
//!
//! The engine dispatches backend calls synchronously and never blocks on the
//! answer. [BackendBridge] satisfies that contract by enqueueing each call
//! on an unbounded channel; [run_backend_worker] drains the queue, awaits
//! the [BackendService], and feeds every outcome back through
//! `deliver_response`. A transient service error is dropped on the floor —
//! the claim's deadline drives the re-attempt — while a permanent error is
//! delivered as a refusing response so the strategy rejects the claim.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use claims_engine::{
    AccountId, BackendCall, BackendError, BackendKind, ClaimId, ClaimRegistry, FulfillmentBackend,
    ValidationBackend,
};

/// One dispatched collaborator call, owned for the trip across the channel.
#[derive(Clone, Debug)]
pub struct BackendJob {
    pub target: BackendKind,
    pub claim_id: ClaimId,
    pub account_id: AccountId,
    pub kind: String,
    pub payload: Value,
}

impl BackendJob {
    fn from_call(target: BackendKind, call: BackendCall<'_>) -> Self {
        Self {
            target,
            claim_id: call.claim_id.clone(),
            account_id: call.account_id,
            kind: call.kind.to_string(),
            payload: call.payload.clone(),
        }
    }
}

/// The awaited side of the collaborator contract: actual validation and
/// fulfillment calls against the account database / auth service.
/// `fulfill` must be idempotent keyed by the job's claim id.
#[async_trait]
pub trait BackendService: Send + Sync {
    async fn validate(&self, job: &BackendJob) -> Result<Value, BackendError>;
    async fn fulfill(&self, job: &BackendJob) -> Result<Value, BackendError>;
}

/// Engine-facing dispatcher: enqueues jobs for the backend worker.
#[derive(Clone)]
pub struct BackendBridge {
    tx: UnboundedSender<BackendJob>,
}

impl BackendBridge {
    /// The bridge plus the receiving end to hand to [run_backend_worker].
    pub fn channel() -> (Self, UnboundedReceiver<BackendJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn enqueue(&self, job: BackendJob) -> Result<(), BackendError> {
        self.tx
            .send(job)
            .map_err(|_| BackendError::transient("backend worker is gone"))
    }
}

impl ValidationBackend for BackendBridge {
    fn request_validation(&self, call: BackendCall<'_>) -> Result<(), BackendError> {
        self.enqueue(BackendJob::from_call(BackendKind::Validation, call))
    }
}

impl FulfillmentBackend for BackendBridge {
    fn request_fulfillment(&self, call: BackendCall<'_>) -> Result<(), BackendError> {
        self.enqueue(BackendJob::from_call(BackendKind::Fulfillment, call))
    }
}

/// Drains queued jobs, awaits the service, and delivers outcomes back into
/// the registry. Runs until the sending side (the registry's bridge) drops.
pub async fn run_backend_worker(
    registry: Arc<ClaimRegistry>,
    service: Arc<dyn BackendService>,
    mut rx: UnboundedReceiver<BackendJob>,
) {
    while let Some(job) = rx.recv().await {
        let outcome = match job.target {
            BackendKind::Validation => service.validate(&job).await,
            BackendKind::Fulfillment => service.fulfill(&job).await,
        };
        match outcome {
            Ok(response) => {
                debug!(
                    claim_id = %job.claim_id,
                    target = job.target.as_str(),
                    "backend response delivered"
                );
                registry.deliver_response(&job.claim_id, job.target, response);
            }
            Err(err) if err.is_transient() => {
                warn!(
                    claim_id = %job.claim_id,
                    target = job.target.as_str(),
                    error = %err,
                    "transient backend failure; claim deadline will retry"
                );
            }
            Err(err) => {
                warn!(
                    claim_id = %job.claim_id,
                    target = job.target.as_str(),
                    error = %err,
                    "permanent backend failure; refusing the claim"
                );
                let refusal = json!({
                    "approved": false,
                    "committed": false,
                    "reason": err.to_string(),
                });
                registry.deliver_response(&job.claim_id, job.target, refusal);
            }
        }
    }
}
