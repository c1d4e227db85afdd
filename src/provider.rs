//! The capability boundary between the chat core and a model provider.
//!
//! The session manager only ever talks to a [`Provider`]; [`crate::Gemini`]
//! implements it over HTTP, and tests substitute a scripted double.

use std::pin::Pin;

use futures::Stream;

use crate::credential::Credential;
use crate::error::Result;
use crate::types::{GenerateContentRequest, GenerateContentResponse, Model};

/// A stream of response chunks for one request.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// Something that can answer a streaming generate-content request.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Starts a streaming request.
    ///
    /// Errors detected before the first chunk (bad credential, HTTP status,
    /// connection failure) are returned directly; later failures are yielded
    /// by the stream.
    async fn stream_generate(
        &self,
        credential: &Credential,
        model: &Model,
        request: GenerateContentRequest,
    ) -> Result<ChunkStream>;
}
