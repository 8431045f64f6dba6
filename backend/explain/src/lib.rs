//! Explanation client: turns a subject and style into model output.

pub mod client;
pub mod prompt;
pub mod providers;

pub use client::{ExplainError, ExplainSettings, ExplanationClient};
pub use providers::mock::MockProvider;
pub use providers::openrouter::OpenRouterProvider;
