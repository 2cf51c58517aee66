//! HTTP submission adapter for the claims engine.

pub mod api_errors;
pub mod api_handlers;
pub mod api_models;

pub use api_errors::ApiError;
pub use api_handlers::{build_router, ClaimApiState};
pub use api_models::{
    CancelClaimRequest, CancelClaimResponse, ClaimStateResponse, SubmitClaimRequest,
    SubmitClaimResponse,
};
