//! Carsync Server Library
//!
//! HTTP server and reconciliation engine for a synced vehicle catalog.
//!
//! # Overview
//!
//! The server has two halves:
//!
//! - **Sync engine** ([`sync`]): a scheduled background task that fetches the
//!   external catalog snapshot, normalizes it into the make -> model ->
//!   vehicle graph, and reconciles it into PostgreSQL idempotently, one
//!   transaction per batch with retry and backoff.
//! - **Read API** ([`features`]): axum feature slices exposing the catalog
//!   and the sync run history through cursor-paginated endpoints. The read
//!   path never blocks on reconciliation state.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and handlers
//! - **SQLx**: PostgreSQL access and migrations
//! - **Reqwest**: external catalog client
//! - **Tokio**: runtime, scheduling, and cooperative shutdown

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;
pub mod sync;

// Re-export commonly used types
pub use error::{AppError, AppResult};
