//! Carsync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities and error handling for the carsync workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across carsync workspace
//! members:
//!
//! - **Error Handling**: the shared [`CarsyncError`] type and result alias
//! - **Logging**: centralized tracing configuration via [`logging::LogConfig`]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CarsyncError, Result};
