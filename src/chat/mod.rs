//! The streaming chat core and its presentation pieces.
//!
//! This module turns user input into provider turns and streams the replies
//! into a transcript.  It supports:
//!
//! - Four canned personas, each a system instruction
//! - Image attachments sent alongside the text of a turn
//! - Custom commands that expand a typed trigger into a longer prompt
//! - Slash commands for controlling the chat from the REPL
//!
//! # Architecture
//!
//! - [`session`]: provider-facing session and the reply stream
//! - [`transcript`]: the ordered message log
//! - [`command_table`]: persisted custom commands
//! - [`controller`]: the single owner of all of the above
//! - [`commands`]: slash command parsing
//! - [`config`]: CLI argument parsing and configuration
//! - [`render`]: output rendering

pub mod command_table;
pub mod commands;
pub mod config;
pub mod controller;
pub mod persona;
pub mod render;
pub mod session;
pub mod transcript;

pub use command_table::{CommandTable, CustomCommand};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use controller::{ChatController, ChatStats, SubmitOutcome};
pub use persona::Persona;
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ReplyStream, Session};
pub use transcript::{Message, MessageId, Transcript};
