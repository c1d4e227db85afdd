use serde::{Deserialize, Serialize};

/// The `{"error": {...}}` envelope the service uses for failures, both as an
/// HTTP error body and inline in an event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ApiErrorBody,
}

/// Details of a service error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// HTTP-equivalent status code.
    #[serde(default)]
    pub code: u16,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Canonical status name, e.g. `INVALID_ARGUMENT`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<String>,

    /// Structured detail records.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

/// One structured detail record; only `reason` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable reason, e.g. `API_KEY_INVALID`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}

impl ApiErrorBody {
    /// Returns true if the service says the API key itself was rejected.
    pub fn is_invalid_key(&self) -> bool {
        self.details
            .iter()
            .filter_map(|detail| detail.reason.as_deref())
            .any(|reason| reason == "API_KEY_INVALID")
            || self.message.to_ascii_lowercase().contains("api key not valid")
    }
}
