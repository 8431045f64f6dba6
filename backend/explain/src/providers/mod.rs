pub mod mock;
pub mod openrouter;
pub(crate) mod sse;
