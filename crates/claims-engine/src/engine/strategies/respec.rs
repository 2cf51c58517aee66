//! Build respec: confirm an unspent respec credit, then commit the reset.
//! No structural check at start; the payload is forwarded as-is.

use crate::engine::event::{EngineError, PhaseEvent};
use crate::engine::phase::ResultCode;
use crate::engine::request::ClaimRequest;
use crate::engine::strategy::{ClaimStrategy, FulfillDecision, HookCtx, ValidateDecision};

use super::{bool_field, is_transient, retry_or_exhaust, str_field, RetryStep};

pub struct RespecStrategy;

impl ClaimStrategy for RespecStrategy {
    fn kind(&self) -> &str {
        "respec"
    }

    fn validate(
        &self,
        ctx: &HookCtx<'_>,
        request: &ClaimRequest,
        event: &PhaseEvent,
    ) -> Result<ValidateDecision, EngineError> {
        match event {
            PhaseEvent::Entered => {
                ctx.validation.request_validation(request.call())?;
                Ok(ValidateDecision::StillWaiting)
            }
            PhaseEvent::Response(value) => {
                if is_transient(value) {
                    return Ok(ValidateDecision::StillWaiting);
                }
                match bool_field(value, "approved") {
                    Some(true) => Ok(ValidateDecision::Advance),
                    Some(false) => Ok(ValidateDecision::Reject(
                        ResultCode::BusinessRejection,
                        str_field(value, "reason")
                            .unwrap_or("no respec available")
                            .to_string(),
                    )),
                    None => Ok(ValidateDecision::StillWaiting),
                }
            }
            PhaseEvent::DeadlineElapsed => {
                match retry_or_exhaust(request, || {
                    ctx.validation.request_validation(request.call())
                })? {
                    RetryStep::Waiting => Ok(ValidateDecision::StillWaiting),
                    RetryStep::Exhausted => Ok(ValidateDecision::Reject(
                        ResultCode::TimeoutExhausted,
                        "respec validation timed out".into(),
                    )),
                }
            }
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
                            .unwrap_or("respec refused")
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
                        "respec commit timed out".into(),
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
    use crate::engine::strategy::StartDecision;
    use crate::engine::stubs::RecordingBackend;

    #[test]
    fn start_is_the_default_accept() {
        // No structural rules for a respec; any payload is accepted.
        assert_eq!(RespecStrategy.start(1, &json!({})), StartDecision::Accept);
        assert_eq!(
            RespecStrategy.start(1, &json!({"build_id": 2})),
            StartDecision::Accept
        );
    }

    #[test]
    fn missing_credit_is_a_business_rejection() {
        let backend = RecordingBackend::default();
        let ctx = HookCtx {
            validation: &backend,
            fulfillment: &backend,
        };
        let r = ClaimRequest::new(
            "claim-1".into(),
            1,
            "respec".into(),
            json!({"build_id": 2}),
            chrono::Utc::now(),
            &crate::engine::strategy::TimeoutPolicy::default(),
        );
        let d = RespecStrategy
            .validate(
                &ctx,
                &r,
                &PhaseEvent::Response(json!({"approved": false})),
            )
            .unwrap();
        assert_eq!(
            d,
            ValidateDecision::Reject(ResultCode::BusinessRejection, "no respec available".into())
        );
    }
}
