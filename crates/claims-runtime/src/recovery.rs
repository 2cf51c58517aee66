//! Startup sweep for fulfillments committed but never acknowledged.
//!
//! A crash between the backend's commit and result delivery leaves a ledger
//! row with `acknowledged = 0`. The sweep re-reports those commits through
//! the result sink so the caller-facing layer can close them out, logging
//! each one with enough data for operator recovery.

use tracing::info;

use claims_engine::{ClaimResult, ResultCode, ResultSink};

use crate::ledger::{FulfillmentLedger, LedgerError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub replayed: u64,
}

/// Re-delivers the result of every unacknowledged commit and acknowledges
/// the row once re-delivered.
pub fn replay_unacknowledged(
    ledger: &FulfillmentLedger,
    sink: &dyn ResultSink,
) -> Result<RecoveryReport, LedgerError> {
    let mut report = RecoveryReport::default();
    for entry in ledger.unacknowledged()? {
        info!(
            claim_id = %entry.claim_id,
            account_id = entry.account_id,
            kind = %entry.kind,
            outcome = %entry.outcome_json,
            "replaying unacknowledged fulfillment"
        );
        sink.notify(&ClaimResult {
            claim_id: entry.claim_id.clone(),
            account_id: entry.account_id,
            kind: entry.kind.clone(),
            code: ResultCode::Succeeded,
            detail: Some("recovered committed fulfillment".into()),
        });
        ledger.acknowledge(&entry.claim_id)?;
        report.replayed += 1;
    }
    Ok(report)
}
