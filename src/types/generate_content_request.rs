use serde::{Deserialize, Serialize};

use crate::types::{Content, GenerationConfig};

/// Body of a `streamGenerateContent` call.
///
/// The model is not part of the body; it is addressed in the request URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// The conversation so far, oldest turn first, ending with the new user turn.
    pub contents: Vec<Content>,

    /// The persona's system instruction.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub system_instruction: Option<Content>,

    /// Sampling parameters.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Create a request from the given turns.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: None,
            generation_config: None,
        }
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::system_instruction(instruction));
        self
    }

    /// Sets the sampling parameters.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Returns the system instruction text, if any.
    pub fn system_instruction_text(&self) -> Option<String> {
        self.system_instruction.as_ref().map(Content::text)
    }

    /// Returns the last (newest) turn.
    pub fn last_turn(&self) -> Option<&Content> {
        self.contents.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Part;
    use serde_json::{json, to_value};

    #[test]
    fn full_request_shape() {
        let request = GenerateContentRequest::new(vec![Content::user(vec![Part::text("hi")])])
            .with_system_instruction("be rude")
            .with_generation_config(GenerationConfig::new(0.5, 40, 0.75));
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "systemInstruction": {"parts": [{"text": "be rude"}]},
                "generationConfig": {"temperature": 0.5, "topK": 40, "topP": 0.75}
            })
        );
        assert_eq!(request.system_instruction_text().as_deref(), Some("be rude"));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let request = GenerateContentRequest::new(Vec::new());
        assert_eq!(to_value(&request).unwrap(), json!({"contents": []}));
        assert!(request.last_turn().is_none());
    }
}
