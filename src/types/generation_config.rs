use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,

    /// Top-k sampling limit.
    pub top_k: u32,

    /// Nucleus sampling mass.
    pub top_p: f32,
}

impl GenerationConfig {
    /// Create a new `GenerationConfig`.
    pub const fn new(temperature: f32, top_k: u32, top_p: f32) -> Self {
        Self {
            temperature,
            top_k,
            top_p,
        }
    }
}
