use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a Gemini model identifier.
///
/// This can be one of the models the client is tuned for or a custom string
/// value for anything else the endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Known Gemini model versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// Gemini 3 Flash (preview)
    #[serde(rename = "gemini-3-flash-preview")]
    Gemini3FlashPreview,

    /// Gemini 3 Pro (preview)
    #[serde(rename = "gemini-3-pro-preview")]
    Gemini3ProPreview,
}

impl KnownModel {
    fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gemini3FlashPreview => "gemini-3-flash-preview",
            KnownModel::Gemini3ProPreview => "gemini-3-pro-preview",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gemini3FlashPreview)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    /// Parses a model name; `flash` and `pro` are accepted as shorthands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let known = match s.to_ascii_lowercase().as_str() {
            "flash" | "gemini-3-flash-preview" => Some(KnownModel::Gemini3FlashPreview),
            "pro" | "gemini-3-pro-preview" => Some(KnownModel::Gemini3ProPreview),
            _ => None,
        };
        Ok(match known {
            Some(known) => Model::Known(known),
            None => Model::Custom(s.to_string()),
        })
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        match model.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_flash() {
        assert_eq!(Model::default(), Model::Known(KnownModel::Gemini3FlashPreview));
        assert_eq!(Model::default().to_string(), "gemini-3-flash-preview");
    }

    #[test]
    fn parse_shorthands() {
        assert_eq!(Model::from("pro"), Model::Known(KnownModel::Gemini3ProPreview));
        assert_eq!(
            Model::from("GEMINI-3-FLASH-PREVIEW"),
            Model::Known(KnownModel::Gemini3FlashPreview)
        );
        assert_eq!(
            Model::from("gemini-2.5-flash"),
            Model::Custom("gemini-2.5-flash".to_string())
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Model::from("pro")).unwrap();
        assert_eq!(json, r#""gemini-3-pro-preview""#);
        let model: Model = serde_json::from_str(r#""my-tuned-model""#).unwrap();
        assert_eq!(model, Model::Custom("my-tuned-model".to_string()));
    }
}
