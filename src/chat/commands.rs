//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat without sending messages to the
//! provider.  Custom commands are not handled here; the REPL checks the
//! command table before falling back to this parser.

use crate::chat::persona::Persona;

/// A parsed chat command.
///
/// These commands control the chat and are not sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Wipe the transcript and start a fresh session.
    Clear,

    /// Show the active persona and the available ones.
    ShowPersona,

    /// Switch persona.
    SetPersona(Persona),

    /// Set the API key.
    Key(String),

    /// Attach an image to the next message.
    Attach(String),

    /// Drop the pending attachment.
    Detach,

    /// Define a custom command.
    AddCommand {
        /// Input that triggers the expansion.
        trigger: String,
        /// Text sent in its place.
        content: String,
    },

    /// Delete custom commands by trigger.
    RemoveCommand(String),

    /// List custom commands.
    ListCommands,

    /// Reprint the transcript.
    History,

    /// Change the model.
    Model(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use wormzero::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/persona bestod").is_some());
/// assert!(parse_command("halo bro").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "persona" => match argument {
            Some(name) => match name.parse::<Persona>() {
                Ok(persona) => ChatCommand::SetPersona(persona),
                Err(err) => ChatCommand::Invalid(format!("/persona: {err}")),
            },
            None => ChatCommand::ShowPersona,
        },
        "key" => match argument {
            Some(key) => ChatCommand::Key(key.to_string()),
            None => ChatCommand::Invalid("/key requires an API key".to_string()),
        },
        "attach" => match argument {
            Some(path) => ChatCommand::Attach(path.to_string()),
            None => ChatCommand::Invalid("/attach requires a file path".to_string()),
        },
        "detach" => ChatCommand::Detach,
        "cmd" => parse_cmd_command(argument),
        "history" => ChatCommand::History,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_cmd_command(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::ListCommands;
    };

    let mut parts = arg.splitn(2, ' ');
    let action = parts.next().unwrap_or_default();
    let rest = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());
    match action.to_lowercase().as_str() {
        "add" => {
            let Some((trigger, content)) = rest.and_then(|rest| rest.split_once('=')) else {
                return ChatCommand::Invalid("/cmd add expects <trigger> = <content>".to_string());
            };
            let (trigger, content) = (trigger.trim(), content.trim());
            if trigger.is_empty() || content.is_empty() {
                return ChatCommand::Invalid(
                    "/cmd add needs both a trigger and content".to_string(),
                );
            }
            ChatCommand::AddCommand {
                trigger: trigger.to_string(),
                content: content.to_string(),
            }
        }
        "rm" | "remove" => match rest {
            Some(trigger) => ChatCommand::RemoveCommand(trigger.to_string()),
            None => ChatCommand::Invalid("/cmd rm requires a trigger".to_string()),
        },
        "list" => ChatCommand::ListCommands,
        _ => ChatCommand::Invalid("Unrecognized /cmd action (use add, rm, or list)".to_string()),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /key <api-key>            Set and remember the API key
  /persona [name]           Show or switch persona (TOXIC, MARAH, NYANTAI, BESTOD)
  /attach <path>            Attach a png, jpeg or webp image to the next message
  /detach                   Drop the pending attachment
  /cmd add <trigger> = <text>  Define a custom command
  /cmd rm <trigger>         Delete a custom command
  /cmd list                 List custom commands
  /clear                    Wipe the chat and start a fresh session
  /history                  Reprint the chat
  /model <name>             Change the model (flash, pro, or a full name)
  /stats                    Show session statistics
  /help                     Show this help message
  /quit                     Exit the chat"#
}
