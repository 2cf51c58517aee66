//! Engine API.
//!
//! Minimal complete set of interfaces: ClaimRequest (per-instance state),
//! ClaimStrategy (pluggable Start/Validate/Fulfill hooks per kind),
//! ClaimRegistry (owns live requests, serializes transitions), and the
//! collaborator contracts for backend dispatch and result delivery.

pub mod collaborator;
pub mod event;
pub mod identity;
pub mod phase;
pub mod registry;
pub mod request;
pub mod strategies;
pub mod strategy;
pub mod stubs;

pub use collaborator::{
    BackendCall, BackendError, BackendErrorKind, BackendKind, ClaimResult, FulfillmentBackend,
    ResultSink, ValidationBackend,
};
pub use event::{EngineError, PhaseEvent};
pub use identity::{AccountId, ClaimId, ClaimKind};
pub use phase::{ClaimPhase, ResultCode};
pub use registry::{ClaimRegistry, EngineConfig, RejectReason, TickSummary};
pub use request::ClaimRequest;
pub use strategies::{RenameStrategy, RespecStrategy, SlotPurchaseStrategy};
pub use strategy::{
    ClaimStrategy, FulfillDecision, HookCtx, StartDecision, TimeoutPolicy, ValidateDecision,
};
pub use stubs::{
    NoopFulfillmentBackend, NoopValidationBackend, RecordingBackend, RecordingResultSink,
};
