//! Async service shell around the claims engine: periodic tick driver,
//! channel bridge to awaited backend services, SQLite fulfillment ledger
//! for idempotent commits, recovery sweep, and an HTTP submission adapter.

pub mod backend;
pub mod config;
pub mod driver;
pub mod ledger;
pub mod recovery;
pub mod results;
pub mod server;

pub use backend::{run_backend_worker, BackendBridge, BackendJob, BackendService};
pub use config::RuntimeConfig;
pub use driver::TickDriver;
pub use ledger::{FulfillmentLedger, LedgerEntry, LedgerError, RecordOutcome};
pub use recovery::{replay_unacknowledged, RecoveryReport};
pub use results::RetainedResults;
pub use server::{build_router, ClaimApiState};
