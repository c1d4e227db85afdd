use serde::{Deserialize, Serialize};

/// The author of a [`Content`] turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Turns written by the user.
    User,

    /// Turns written by the model.
    Model,
}

/// Inline binary data, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// IANA media type of the payload, e.g. `image/png`.
    pub mime_type: String,

    /// Standard base64 encoding of the payload.
    pub data: String,
}

impl Blob {
    /// Create a new `Blob`.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// One part of a multi-part turn.
///
/// Only the part kinds this client sends or reads are modelled; anything else
/// the service streams back is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,

    /// Inline binary content.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub inline_data: Option<Blob>,

    /// Set by the service on thought-summary parts.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub thought: Option<bool>,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
            thought: None,
        }
    }

    /// Create an inline-data part.
    pub fn inline_data(blob: Blob) -> Self {
        Self {
            text: None,
            inline_data: Some(blob),
            thought: None,
        }
    }

    /// Returns true if this part is a thought summary rather than answer text.
    pub fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

/// A single turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Author of the turn; omitted for system instructions.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<Role>,

    /// Ordered parts of the turn.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a turn with the given role and parts.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role),
            parts,
        }
    }

    /// Create a user turn.
    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    /// Create a model turn containing a single text part.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Create role-less content holding a system instruction.
    pub fn system_instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenates the answer text of all parts, skipping thought summaries.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|part| !part.is_thought())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn user_turn_with_image() {
        let content = Content::user(vec![
            Part::text("what is this?"),
            Part::inline_data(Blob::new("image/png", "iVBORw0KGgo=")),
        ]);
        assert_eq!(
            to_value(&content).unwrap(),
            json!({
                "role": "user",
                "parts": [
                    {"text": "what is this?"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                ]
            })
        );
    }

    #[test]
    fn system_instruction_has_no_role() {
        let content = Content::system_instruction("be terse");
        assert_eq!(
            to_value(&content).unwrap(),
            json!({"parts": [{"text": "be terse"}]})
        );
    }

    #[test]
    fn text_skips_thoughts_and_unknown_parts() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "pondering", "thought": true},
                {"text": "Hel"},
                {"functionCall": {"name": "noop"}},
                {"text": "lo"}
            ]
        }))
        .unwrap();
        assert_eq!(content.text(), "Hello");
    }
}
