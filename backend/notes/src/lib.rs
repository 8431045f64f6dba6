pub mod error;
pub mod file_store;
pub mod remote_store;
pub mod store;
mod timestamp;

pub use error::StoreError;
pub use file_store::JsonFileStore;
pub use remote_store::RemoteNoteStore;
pub use store::{NoteStore, validate_content, validate_question};
