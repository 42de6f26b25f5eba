//! Vehicles feature slice

pub mod queries;
pub mod routes;

pub use routes::vehicles_routes;
