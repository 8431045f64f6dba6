//! Core types, error taxonomy, and provider traits shared by every StudyMate crate.

pub mod error;
pub mod traits;
pub mod types;

pub use error::StudyError;
pub use traits::{LlmProvider, LlmRequest, LlmResponse, ProviderError};
pub use types::{
    ApiCredentials, ExplanationRequest, ExplanationResult, FeedbackEntry, Note, NoteContent,
    NoteId, Principal, Style, Verdict, INVALID_DATE, normalize_lines,
};
