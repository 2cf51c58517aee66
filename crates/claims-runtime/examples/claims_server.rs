//! Demo claims server.
//!
//! Run with:
//!   cargo run -p claims-runtime --example claims_server
//!
//! Wires the engine to an in-process demo backend: validation approves every
//! request and fulfillment commits through the SQLite ledger, so a retried
//! commit is deduplicated by claim id. Submit a claim with:
//!   curl -X POST 127.0.0.1:8080/v1/claims \
//!     -H 'content-type: application/json' \
//!     -d '{"account_id": 1, "kind": "rename", "payload": {"new_name": "Hero"}}'

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use claims_engine::{
    BackendError, ClaimRegistry, RenameStrategy, RespecStrategy, SlotPurchaseStrategy,
};
use claims_runtime::{
    build_router, replay_unacknowledged, run_backend_worker, BackendBridge, BackendJob,
    BackendService, ClaimApiState, FulfillmentLedger, RecordOutcome, RetainedResults,
    RuntimeConfig, TickDriver,
};

/// Backend that approves everything and commits through the ledger.
struct DemoBackendService {
    ledger: FulfillmentLedger,
}

#[async_trait]
impl BackendService for DemoBackendService {
    async fn validate(&self, _job: &BackendJob) -> Result<Value, BackendError> {
        Ok(json!({"approved": true}))
    }

    async fn fulfill(&self, job: &BackendJob) -> Result<Value, BackendError> {
        let outcome = json!({"committed": true});
        let recorded = self
            .ledger
            .record(
                &job.claim_id,
                job.account_id,
                &job.kind,
                &outcome.to_string(),
            )
            .map_err(|e| BackendError::transient(e.to_string()))?;
        match recorded {
            RecordOutcome::Applied => Ok(outcome),
            RecordOutcome::Duplicate(prior) => serde_json::from_str(&prior)
                .map_err(|e| BackendError::permanent(e.to_string())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RuntimeConfig::from_env();
    let ledger = FulfillmentLedger::open(&config.ledger_path)?;
    let results = Arc::new(RetainedResults::with_ledger(ledger.clone()));

    let recovered = replay_unacknowledged(&ledger, results.as_ref())?;
    if recovered.replayed > 0 {
        info!(replayed = recovered.replayed, "recovered unacknowledged fulfillments");
    }

    let (bridge, jobs) = BackendBridge::channel();
    let registry = Arc::new(
        ClaimRegistry::new(
            Arc::new(bridge.clone()),
            Arc::new(bridge),
            results.clone(),
            config.engine_config(),
        )
        .with_strategy(Arc::new(RenameStrategy))
        .with_strategy(Arc::new(RespecStrategy))
        .with_strategy(Arc::new(SlotPurchaseStrategy)),
    );

    let service = Arc::new(DemoBackendService { ledger });
    tokio::spawn(run_backend_worker(registry.clone(), service, jobs));
    let _driver = TickDriver::spawn(registry.clone(), config.tick_period());

    let state = ClaimApiState { registry, results };
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "claims server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
