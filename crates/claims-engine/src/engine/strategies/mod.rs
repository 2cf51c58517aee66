//! Built-in operation strategies: rename, respec, slot purchase.
//!
//! Backend response conventions shared by the built-ins:
//! - validation responses carry `"approved": bool` plus an optional
//!   `"reason"` string;
//! - fulfillment responses carry `"committed": bool` plus an optional
//!   `"reason"`;
//! - either may carry `"transient": true`, meaning the backend could not
//!   decide; the claim keeps waiting and the phase deadline drives the
//!   re-attempt within the remaining budget.

pub mod rename;
pub mod respec;
pub mod slot;

pub use rename::RenameStrategy;
pub use respec::RespecStrategy;
pub use slot::SlotPurchaseStrategy;

use serde_json::Value;

use crate::engine::collaborator::BackendError;
use crate::engine::event::EngineError;
use crate::engine::request::ClaimRequest;

pub(crate) fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub(crate) fn u64_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

pub(crate) fn is_transient(value: &Value) -> bool {
    bool_field(value, "transient").unwrap_or(false)
}

/// What the deadline path decided for a waiting phase.
pub(crate) enum RetryStep {
    Waiting,
    Exhausted,
}

/// Re-issues the phase's backend call if budget remains, otherwise signals
/// timeout exhaustion.
pub(crate) fn retry_or_exhaust(
    request: &ClaimRequest,
    issue: impl FnOnce() -> Result<(), BackendError>,
) -> Result<RetryStep, EngineError> {
    if request.retries_remaining() == 0 {
        return Ok(RetryStep::Exhausted);
    }
    issue()?;
    Ok(RetryStep::Waiting)
}
