//! Character slot purchase: bounds-check the slot index at start, then debit
//! and allocate in one fulfillment call. There is nothing to pre-validate,
//! so the default validate hook drops the request straight into fulfillment.

use serde_json::Value;

use crate::engine::event::{EngineError, PhaseEvent};
use crate::engine::identity::AccountId;
use crate::engine::phase::ResultCode;
use crate::engine::request::ClaimRequest;
use crate::engine::strategy::{ClaimStrategy, FulfillDecision, HookCtx, StartDecision};

use super::{bool_field, is_transient, retry_or_exhaust, str_field, u64_field, RetryStep};

/// Highest purchasable slot index.
const MAX_SLOT_INDEX: u64 = 47;

pub struct SlotPurchaseStrategy;

impl ClaimStrategy for SlotPurchaseStrategy {
    fn kind(&self) -> &str {
        "slot"
    }

    fn start(&self, _account_id: AccountId, payload: &Value) -> StartDecision {
        match u64_field(payload, "slot_index") {
            None => StartDecision::Reject("slot_index missing".into()),
            Some(index) if index > MAX_SLOT_INDEX => {
                StartDecision::Reject(format!("slot_index {} out of range", index))
            }
            Some(_) => StartDecision::Accept,
        }
    }

    fn fulfill(
        &self,
        ctx: &HookCtx<'_>,
        request: &ClaimRequest,
        event: &PhaseEvent,
    ) -> Result<FulfillDecision, EngineError> {
        match event {
            PhaseEvent::Entered => {
                ctx.fulfillment.request_fulfillment(request.call())?;
                Ok(FulfillDecision::StillWaiting)
            }
            PhaseEvent::Response(value) => {
                if is_transient(value) {
                    return Ok(FulfillDecision::StillWaiting);
                }
                match bool_field(value, "committed") {
                    Some(true) => Ok(FulfillDecision::Succeed),
                    Some(false) => Ok(FulfillDecision::Reject(
                        ResultCode::BusinessRejection,
                        str_field(value, "reason")
                            .unwrap_or("purchase refused")
                            .to_string(),
                    )),
                    None => Ok(FulfillDecision::StillWaiting),
                }
            }
            PhaseEvent::DeadlineElapsed => {
                match retry_or_exhaust(request, || {
                    ctx.fulfillment.request_fulfillment(request.call())
                })? {
                    RetryStep::Waiting => Ok(FulfillDecision::StillWaiting),
                    RetryStep::Exhausted => Ok(FulfillDecision::Reject(
                        ResultCode::TimeoutExhausted,
                        "slot purchase timed out".into(),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::strategy::ValidateDecision;
    use crate::engine::stubs::RecordingBackend;

    #[test]
    fn start_checks_the_slot_index() {
        let s = SlotPurchaseStrategy;
        assert_eq!(
            s.start(2, &json!({})),
            StartDecision::Reject("slot_index missing".into())
        );
        assert!(matches!(
            s.start(2, &json!({"slot_index": 48})),
            StartDecision::Reject(_)
        ));
        assert_eq!(s.start(2, &json!({"slot_index": 5})), StartDecision::Accept);
    }

    #[test]
    fn validate_is_the_default_advance() {
        let backend = RecordingBackend::default();
        let ctx = HookCtx {
            validation: &backend,
            fulfillment: &backend,
        };
        let r = ClaimRequest::new(
            "claim-1".into(),
            2,
            "slot".into(),
            json!({"slot_index": 5}),
            chrono::Utc::now(),
            &crate::engine::strategy::TimeoutPolicy::default(),
        );
        let d = SlotPurchaseStrategy
            .validate(&ctx, &r, &PhaseEvent::Entered)
            .unwrap();
        assert_eq!(d, ValidateDecision::Advance);
        // No validation call was ever issued.
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn insufficient_funds_is_a_business_rejection() {
        let backend = RecordingBackend::default();
        let ctx = HookCtx {
            validation: &backend,
            fulfillment: &backend,
        };
        let r = ClaimRequest::new(
            "claim-1".into(),
            2,
            "slot".into(),
            json!({"slot_index": 5}),
            chrono::Utc::now(),
            &crate::engine::strategy::TimeoutPolicy::default(),
        );
        let d = SlotPurchaseStrategy
            .fulfill(
                &ctx,
                &r,
                &PhaseEvent::Response(json!({"committed": false, "reason": "insufficient funds"})),
            )
            .unwrap();
        assert_eq!(
            d,
            FulfillDecision::Reject(ResultCode::BusinessRejection, "insufficient funds".into())
        );
    }
}
