//! Character rename: structurally check the requested name, ask the account
//! database whether it is free, then commit the rename.

use serde_json::Value;

use crate::engine::event::{EngineError, PhaseEvent};
use crate::engine::identity::AccountId;
use crate::engine::phase::ResultCode;
use crate::engine::request::ClaimRequest;
use crate::engine::strategy::{
    ClaimStrategy, FulfillDecision, HookCtx, StartDecision, ValidateDecision,
};

use super::{bool_field, is_transient, retry_or_exhaust, str_field, RetryStep};

const MAX_NAME_LEN: usize = 20;

pub struct RenameStrategy;

fn requested_name(payload: &Value) -> Option<&str> {
    str_field(payload, "new_name")
}

impl ClaimStrategy for RenameStrategy {
    fn kind(&self) -> &str {
        "rename"
    }

    fn start(&self, _account_id: AccountId, payload: &Value) -> StartDecision {
        let Some(name) = requested_name(payload) else {
            return StartDecision::Reject("new_name missing".into());
        };
        if name.is_empty() {
            return StartDecision::Reject("new_name is empty".into());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return StartDecision::Reject("new_name too long".into());
        }
        if !name.chars().all(char::is_alphanumeric) {
            return StartDecision::Reject("new_name has invalid characters".into());
        }
        StartDecision::Accept
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
                            .unwrap_or("name not available")
                            .to_string(),
                    )),
                    // Unusable response: keep waiting, the deadline retries.
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
                        "name validation timed out".into(),
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
                            .unwrap_or("rename refused")
                            .to_string(),
                    )),
                    None => Ok(FulfillDecision::StillWaiting),
                }
            }
            PhaseEvent::DeadlineElapsed => {
                // The commit is idempotent keyed by the claim id, so a
                // re-issue after an unacknowledged success is safe.
                match retry_or_exhaust(request, || {
                    ctx.fulfillment.request_fulfillment(request.call())
                })? {
                    RetryStep::Waiting => Ok(FulfillDecision::StillWaiting),
                    RetryStep::Exhausted => Ok(FulfillDecision::Reject(
                        ResultCode::TimeoutExhausted,
                        "rename commit timed out".into(),
                    )),
                }
            }
        }
    }
}
