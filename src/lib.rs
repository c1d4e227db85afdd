// Public modules
pub mod attachment;
pub mod chat;
pub mod client;
pub mod credential;
pub mod error;
pub mod provider;
pub mod sse;
pub mod store;
pub mod types;
pub mod utils;

mod observability;

// Re-exports
pub use attachment::{Attachment, ImageMimeType};
pub use client::Gemini;
pub use credential::Credential;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use provider::{ChunkStream, Provider};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::*;
