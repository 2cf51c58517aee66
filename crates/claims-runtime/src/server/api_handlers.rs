//! Axum handlers for the claims HTTP adapter.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;

use claims_engine::{ClaimRegistry, RejectReason};

use super::api_errors::ApiError;
use super::api_models::{
    CancelClaimRequest, CancelClaimResponse, ClaimStateResponse, SubmitClaimRequest,
    SubmitClaimResponse,
};
use crate::results::RetainedResults;

#[derive(Clone)]
pub struct ClaimApiState {
    pub registry: Arc<ClaimRegistry>,
    pub results: Arc<RetainedResults>,
}

pub fn build_router(state: ClaimApiState) -> Router {
    Router::new()
        .route("/v1/claims", post(submit_claim))
        .route("/v1/claims/:claim_id", get(inspect_claim))
        .route("/v1/claims/:claim_id/cancel", post(cancel_claim))
        .with_state(state)
}

pub(crate) async fn submit_claim(
    State(state): State<ClaimApiState>,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<Json<SubmitClaimResponse>, ApiError> {
    if request.kind.trim().is_empty() {
        return Err(ApiError::bad_request("kind must not be empty"));
    }
    let claim_id = state
        .registry
        .submit(request.account_id, &request.kind, request.payload, Utc::now())
        .map_err(|reason| match reason {
            RejectReason::AlreadyClaiming => ApiError::conflict(reason.to_string()),
            RejectReason::UnknownKind(_) => ApiError::bad_request(reason.to_string()),
            RejectReason::Malformed(_) => ApiError::bad_request(reason.to_string()),
        })?;
    info!(claim_id = %claim_id, account_id = request.account_id, kind = %request.kind, "claim submitted over http");
    Ok(Json(SubmitClaimResponse { claim_id }))
}

pub(crate) async fn inspect_claim(
    State(state): State<ClaimApiState>,
    Path(claim_id): Path<String>,
) -> Result<Json<ClaimStateResponse>, ApiError> {
    if let Some(phase) = state.registry.phase(&claim_id) {
        return Ok(Json(ClaimStateResponse {
            claim_id,
            phase: Some(phase.as_str().to_string()),
            result: None,
        }));
    }
    if let Some(result) = state.results.get(&claim_id) {
        return Ok(Json(ClaimStateResponse {
            claim_id,
            phase: None,
            result: Some(result),
        }));
    }
    Err(ApiError::not_found(format!("unknown claim: {}", claim_id)))
}

pub(crate) async fn cancel_claim(
    State(state): State<ClaimApiState>,
    Path(claim_id): Path<String>,
    Json(request): Json<CancelClaimRequest>,
) -> Result<Json<CancelClaimResponse>, ApiError> {
    let reason = request.reason.as_deref().unwrap_or("cancelled by caller");
    let cancelled = state.registry.cancel(&claim_id, reason);
    if !cancelled && state.results.get(&claim_id).is_none() {
        return Err(ApiError::not_found(format!("unknown claim: {}", claim_id)));
    }
    Ok(Json(CancelClaimResponse {
        claim_id,
        cancelled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims_engine::{
        ClaimPhase, EngineConfig, NoopFulfillmentBackend, NoopValidationBackend, RenameStrategy,
    };
    use serde_json::json;

    fn state() -> ClaimApiState {
        let results = Arc::new(RetainedResults::new());
        let registry = Arc::new(
            ClaimRegistry::new(
                Arc::new(NoopValidationBackend),
                Arc::new(NoopFulfillmentBackend),
                results.clone(),
                EngineConfig::default(),
            )
            .with_strategy(Arc::new(RenameStrategy)),
        );
        ClaimApiState { registry, results }
    }

    #[tokio::test]
    async fn submit_then_inspect_reports_the_phase() {
        let state = state();
        let response = submit_claim(
            State(state.clone()),
            Json(SubmitClaimRequest {
                account_id: 1,
                kind: "rename".into(),
                payload: json!({"new_name": "Hero"}),
            }),
        )
        .await
        .expect("submit ok");
        let claim_id = response.0.claim_id.clone();
        assert_eq!(
            state.registry.phase(&claim_id),
            Some(ClaimPhase::Validating)
        );

        let inspected = inspect_claim(State(state.clone()), Path(claim_id.clone()))
            .await
            .expect("inspect ok");
        assert_eq!(inspected.0.phase.as_deref(), Some("validating"));
        assert!(inspected.0.result.is_none());
    }

    #[tokio::test]
    async fn duplicate_submit_maps_to_conflict() {
        let state = state();
        let request = SubmitClaimRequest {
            account_id: 1,
            kind: "rename".into(),
            payload: json!({"new_name": "Hero"}),
        };
        submit_claim(State(state.clone()), Json(request.clone()))
            .await
            .expect("first submit ok");
        let err = submit_claim(State(state.clone()), Json(request))
            .await
            .expect_err("second submit refused");
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn structural_rejection_maps_to_bad_request() {
        let state = state();
        let err = submit_claim(
            State(state),
            Json(SubmitClaimRequest {
                account_id: 1,
                kind: "rename".into(),
                payload: json!({}),
            }),
        )
        .await
        .expect_err("malformed payload refused");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn cancel_then_inspect_reports_the_result() {
        let state = state();
        let response = submit_claim(
            State(state.clone()),
            Json(SubmitClaimRequest {
                account_id: 1,
                kind: "rename".into(),
                payload: json!({"new_name": "Hero"}),
            }),
        )
        .await
        .expect("submit ok");
        let claim_id = response.0.claim_id.clone();

        let cancelled = cancel_claim(
            State(state.clone()),
            Path(claim_id.clone()),
            Json(CancelClaimRequest {
                reason: Some("operator request".into()),
            }),
        )
        .await
        .expect("cancel ok");
        assert!(cancelled.0.cancelled);

        let inspected = inspect_claim(State(state), Path(claim_id))
            .await
            .expect("inspect ok");
        assert!(inspected.0.phase.is_none());
        let result = inspected.0.result.expect("result retained");
        assert_eq!(result.detail.as_deref(), Some("operator request"));
    }

    #[tokio::test]
    async fn unknown_claim_is_not_found() {
        let state = state();
        let err = inspect_claim(State(state), Path("claim-404".into()))
            .await
            .expect_err("unknown claim");
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn router_builds() {
        let _ = build_router(state());
    }
}
