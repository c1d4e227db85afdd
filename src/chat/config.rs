//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::Result;
use crate::chat::persona::Persona;
use crate::types::Model;

/// Command-line arguments for the wormzero-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use: flash, pro, or a full name (default: flash)", "MODEL")]
    pub model: Option<String>,

    /// Persona to start with.
    #[arrrg(optional, "Starting persona: TOXIC, MARAH, NYANTAI or BESTOD", "PERSONA")]
    pub persona: Option<String>,

    /// Directory holding the durable store.
    #[arrrg(optional, "Directory for the API key and custom commands", "DIR")]
    pub store_dir: Option<String>,

    /// Alternative API base URL.
    #[arrrg(optional, "API base URL (default: the public Gemini endpoint)", "URL")]
    pub base_url: Option<String>,

    /// Overall request timeout.
    #[arrrg(optional, "Overall request timeout in seconds (default: none)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// The persona the first session is created with.
    pub persona: Persona,

    /// Where the durable store lives; `None` uses the platform config dir.
    pub store_dir: Option<PathBuf>,

    /// Alternative API base URL.
    pub base_url: Option<String>,

    /// Overall request timeout; `None` lets replies stream unbounded.
    pub timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-3-flash-preview
    /// - Persona: TOXIC
    /// - Store: platform config directory
    /// - Timeout: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            persona: Persona::default(),
            store_dir: None,
            base_url: None,
            timeout: None,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the starting persona.
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// Sets the store directory.
    pub fn with_store_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.store_dir = dir;
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the overall request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = crate::Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or_default();
        let persona = match args.persona {
            Some(name) => name.parse()?,
            None => Persona::default(),
        };

        Ok(ChatConfig {
            model,
            persona,
            store_dir: args.store_dir.map(PathBuf::from),
            base_url: args.base_url,
            timeout: args.timeout_secs.map(Duration::from_secs),
            use_color: !args.no_color,
        })
    }
}
