//! Makes feature slice

pub mod queries;
pub mod routes;

pub use routes::makes_routes;
