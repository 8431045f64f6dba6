//! Structured logging for StudyMate.
//!
//! Console + rolling NDJSON file output, secret redaction, and domain events
//! (explanations served, notes saved, feedback submitted, failures).

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, StudyEvent};
pub use logger::{init_console_logger, init_logger};
pub use redact::redact_sensitive_data;
