//! Identity types for the claims engine.
//!
//! ClaimId identifies one in-flight claim request (unique for the process
//! lifetime); AccountId is the owning account; ClaimKind names the operation
//! strategy that governs a request.

/// Identifies one claim request for the lifetime of the process.
pub type ClaimId = String;

/// The account a claim applies to.
pub type AccountId = u64;

/// Tag selecting the operation strategy for a request (e.g. "rename").
pub type ClaimKind = String;
