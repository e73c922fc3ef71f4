//! clarify-engine library interface
//!
//! The clarifying-question generation pipeline: load flagged
//! propositions, expand into (proposition, factor) pairs, generate a
//! grounded question per pair, validate it, and persist the results.

pub mod generator;
pub mod loader;
pub mod pipeline;
pub mod sink;
pub mod staging;
pub mod types;
pub mod validator;

pub use generator::{GenerationError, QuestionBackend, ReasoningClient};
pub use pipeline::{QuestionEngine, RunFilter};
pub use types::{RunSummary, RunStats};
