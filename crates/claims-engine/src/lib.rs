//! Claim-request orchestration engine for an account-management service.
//!
//! A claim is a client-initiated account operation (rename, respec, slot
//! purchase) driven through a validation phase and a fulfillment phase, each
//! of which may wait on asynchronous backend responses and retry under
//! timeout. The engine guarantees, for every operation kind: exactly-once
//! progression, bounded retry, safe cancellation, and no double-application
//! of an effect.

pub mod engine;

pub use engine::*;
