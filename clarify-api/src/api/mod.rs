//! API endpoint handlers

pub mod health;
pub mod propositions;

pub use health::health_routes;
pub use propositions::proposition_routes;
