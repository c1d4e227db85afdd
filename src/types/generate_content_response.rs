use serde::{Deserialize, Serialize};

use crate::types::Content;

/// One chunk of a streamed `streamGenerateContent` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate continuations; the client only reads the first.
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Set when the prompt itself was rejected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prompt_feedback: Option<PromptFeedback>,

    /// Token accounting, usually only on the final chunk.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage_metadata: Option<UsageMetadata>,

    /// The model version that produced the chunk.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Returns the answer text carried by this chunk, or `None` when it carries none.
    pub fn text(&self) -> Option<String> {
        let text = self.candidates.first()?.content.as_ref()?.text();
        if text.is_empty() { None } else { Some(text) }
    }

    /// Returns the block reason if the provider refused the prompt.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }

    /// Returns the finish reason of the first candidate, if reported.
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_deref())
    }
}

/// A candidate continuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Content produced so far for this candidate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<Content>,

    /// Why generation stopped (`STOP`, `MAX_TOKENS`, `SAFETY`, ...).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub finish_reason: Option<String>,

    /// Index of the candidate.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub index: Option<u32>,
}

/// Feedback about the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Why the prompt was blocked, if it was.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block_reason: Option<String>,
}

/// Token usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, history included.
    #[serde(default)]
    pub prompt_token_count: u64,

    /// Tokens across all candidates.
    #[serde(default)]
    pub candidates_token_count: u64,

    /// Prompt plus candidates.
    #[serde(default)]
    pub total_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_chunk() {
        let chunk: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"He"}],"role":"model"},"index":0}],"modelVersion":"gemini-3-flash-preview"}"#,
        )
        .unwrap();
        assert_eq!(chunk.text().as_deref(), Some("He"));
        assert!(chunk.block_reason().is_none());
    }

    #[test]
    fn final_chunk_without_text() {
        let chunk: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":""}],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":4,"candidatesTokenCount":3,"totalTokenCount":7}}"#,
        )
        .unwrap();
        assert!(chunk.text().is_none());
        assert_eq!(chunk.finish_reason(), Some("STOP"));
        assert_eq!(chunk.usage_metadata.unwrap().total_token_count, 7);
    }

    #[test]
    fn blocked_prompt() {
        let chunk: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(chunk.text().is_none());
        assert_eq!(chunk.block_reason(), Some("SAFETY"));
    }
}
