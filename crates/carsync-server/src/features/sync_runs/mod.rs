//! Sync run history feature slice
//!
//! Read-only view over the `sync_runs` bookkeeping written by the
//! reconciler. The read path never blocks on reconciliation state; whatever
//! the last cycle recorded is what callers see.

pub mod queries;
pub mod routes;

pub use routes::sync_runs_routes;
