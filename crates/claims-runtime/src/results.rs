//! Retained result sink: keeps finished claim results queryable after the
//! registry has removed the request, and acknowledges ledger rows for
//! successful claims.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::warn;

use claims_engine::{ClaimId, ClaimResult, ResultSink};

use crate::ledger::FulfillmentLedger;

#[derive(Default)]
pub struct RetainedResults {
    by_claim: RwLock<HashMap<ClaimId, ClaimResult>>,
    ledger: Option<FulfillmentLedger>,
}

impl RetainedResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledges the ledger row of every successful claim on delivery.
    pub fn with_ledger(ledger: FulfillmentLedger) -> Self {
        Self {
            by_claim: RwLock::new(HashMap::new()),
            ledger: Some(ledger),
        }
    }

    pub fn get(&self, claim_id: &str) -> Option<ClaimResult> {
        self.by_claim
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(claim_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.by_claim
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for RetainedResults {
    fn notify(&self, result: &ClaimResult) {
        self.by_claim
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(result.claim_id.clone(), result.clone());

        if let Some(ledger) = &self.ledger {
            if result.code.is_success() {
                if let Err(err) = ledger.acknowledge(&result.claim_id) {
                    warn!(claim_id = %result.claim_id, error = %err, "ledger acknowledge failed");
                }
            }
        }
    }
}
