//! StudyMate Gateway HTTP API Server
//!
//! JSON and server-sent-event endpoints for explanations, notes, feedback,
//! OCR and sign-in, plus the single-page web UI.

pub mod auth_api;
pub mod control_ui;
pub mod error;
pub mod explain_api;
pub mod feedback_api;
pub mod health_api;
pub mod notes_api;
pub mod ocr_api;
pub mod server;
pub mod services;
pub mod session;
pub mod session_registry;

pub use error::ApiError;
pub use server::{GatewayState, build_router, start_server};
pub use services::Services;
