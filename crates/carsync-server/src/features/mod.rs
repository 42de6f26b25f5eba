//! Feature modules implementing the carsync API
//!
//! Each feature is a vertical slice with its own queries and routes:
//!
//! - **vehicles**: cursor-paginated vehicle listing and single-vehicle lookup
//! - **makes**: make listing with model counts
//! - **sync_runs**: reconciliation cycle history and latest-run status
//!
//! Each module follows the structure:
//! - `queries/` - read operations, one handler per file
//! - `routes.rs` - HTTP route definitions and error mapping
//!
//! The catalog is written exclusively by the sync engine; the API surface is
//! read-only, so there are no command modules.

pub mod makes;
pub mod shared;
pub mod sync_runs;
pub mod vehicles;

use axum::Router;
use sqlx::PgPool;

/// Creates the main API router with all feature routes mounted
///
/// Each feature is mounted under its own path prefix:
/// - `/vehicles` - vehicle listing and lookup
/// - `/makes` - make listing
/// - `/sync/runs` - reconciliation cycle history
pub fn router(db: PgPool) -> Router<()> {
    Router::new()
        .nest("/vehicles", vehicles::vehicles_routes().with_state(db.clone()))
        .nest("/makes", makes::makes_routes().with_state(db.clone()))
        .nest("/sync/runs", sync_runs::sync_runs_routes().with_state(db))
}
