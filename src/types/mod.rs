// Public modules
pub mod api_error;
pub mod content;
pub mod generate_content_request;
pub mod generate_content_response;
pub mod generation_config;
pub mod model;

// Re-exports
pub use api_error::{ApiErrorBody, ErrorDetail, ErrorEnvelope};
pub use content::{Blob, Content, Part, Role};
pub use generate_content_request::GenerateContentRequest;
pub use generate_content_response::{
    Candidate, GenerateContentResponse, PromptFeedback, UsageMetadata,
};
pub use generation_config::GenerationConfig;
pub use model::{KnownModel, Model};
