//! API DTOs for the claims HTTP adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use claims_engine::ClaimResult;

#[derive(Clone, Debug, Deserialize)]
pub struct SubmitClaimRequest {
    pub account_id: u64,
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubmitClaimResponse {
    pub claim_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClaimStateResponse {
    pub claim_id: String,
    /// Current phase while the claim is live; absent once finished.
    pub phase: Option<String>,
    /// Terminal result once the claim has finished.
    pub result: Option<ClaimResult>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CancelClaimRequest {
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CancelClaimResponse {
    pub claim_id: String,
    pub cancelled: bool,
}
