//! Interactive WORM/ZERO chat.
//!
//! This binary provides a streaming REPL for chatting with Gemini models
//! through one of the canned personas.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; the API key is asked for with /key and remembered
//! wormzero-chat
//!
//! # Start in another persona on the pro model
//! wormzero-chat --persona bestod --model pro
//!
//! # Keep the key and custom commands somewhere else
//! wormzero-chat --store-dir ./state
//!
//! # Disable colors (useful for piping output)
//! wormzero-chat --no-color
//! ```
//!
//! The key may also come from `WORMZERO_API_KEY`; it is used for the run but
//! not stored.  Logging goes to stderr, filtered by `WORMZERO_LOG`
//! (default `warn`).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use wormzero::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, MessageId, Persona, PlainTextRenderer,
    Renderer, help_text, parse_command,
};
use wormzero::{Credential, FileStore, Gemini, KeyValueStore, MemoryStore, Model};

type Controller = ChatController<Gemini>;

/// Main entry point for the wormzero-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_env("WORMZERO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("wormzero-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;
    let use_color = config.use_color;

    let client = Gemini::with_options(config.base_url.clone(), config.timeout)?;
    let store = open_store(&config);
    let mut controller = ChatController::new(client, store, &config);
    if !controller.has_session()
        && let Ok(key) = std::env::var("WORMZERO_API_KEY")
    {
        match Credential::new(key) {
            Ok(credential) => controller.use_credential(credential),
            Err(err) => tracing::warn!(error = %err, "ignoring WORMZERO_API_KEY"),
        }
    }

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color(use_color).with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    print_transcript(&controller, &mut renderer);
    println!(
        "persona: {}  model: {}  (/help for commands, /quit to exit)\n",
        controller.persona(),
        controller.model()
    );
    if !controller.has_session() {
        renderer.print_info("No API key yet. Enter one with /key <api-key>.");
    }

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let prompt = match controller.pending_attachment() {
            Some(attachment) => format!("[{}] > ", attachment.mime_type),
            None => "> ".to_string(),
        };
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() && controller.pending_attachment().is_none() {
                    continue;
                }
                if !line.is_empty() {
                    let _ = rl.add_history_entry(line);
                }

                // Custom command triggers win over slash commands.
                if controller.commands().find(line).is_none()
                    && let Some(cmd) = parse_command(line)
                {
                    if !handle_command(cmd, &mut controller, &mut renderer).await {
                        println!("Bye.");
                        break;
                    }
                    continue;
                }

                if controller.has_session() {
                    renderer.start_reply();
                }
                controller.submit(line, &mut renderer).await;
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nBye.");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn open_store(config: &ChatConfig) -> Box<dyn KeyValueStore> {
    let store = match &config.store_dir {
        Some(dir) => Ok(FileStore::in_dir(dir)),
        None => FileStore::open_default(),
    };
    match store {
        Ok(store) => {
            tracing::debug!(path = %store.path().display(), "using file store");
            Box::new(store)
        }
        Err(err) => {
            tracing::warn!(error = %err, "falling back to an in-memory store");
            Box::new(MemoryStore::new())
        }
    }
}

/// Runs one slash command; returns false when the user asked to quit.
async fn handle_command(
    cmd: ChatCommand,
    controller: &mut Controller,
    renderer: &mut PlainTextRenderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => return false,
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::Clear => {
            let id = controller.clear_history();
            show(controller, renderer, id);
        }
        ChatCommand::ShowPersona => {
            let names: Vec<&str> = Persona::ALL.iter().map(Persona::name).collect();
            renderer.print_info(&format!(
                "Persona: {} (available: {})",
                controller.persona(),
                names.join(", ")
            ));
        }
        ChatCommand::SetPersona(persona) => {
            let id = controller.change_persona(persona);
            show(controller, renderer, id);
        }
        ChatCommand::Key(key) => match controller.set_credential(&key) {
            Ok(()) => renderer.print_info("API key saved. Session ready."),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Attach(path) => match controller.attach(&path).await {
            Ok(attachment) => renderer.print_info(&format!(
                "Attached {} (~{} bytes); it goes with your next message.",
                attachment.mime_type,
                attachment.approx_size()
            )),
            Err(err) => renderer.print_error(&err.to_string()),
        },
        ChatCommand::Detach => match controller.clear_attachment() {
            Some(_) => renderer.print_info("Attachment dropped."),
            None => renderer.print_info("Nothing attached."),
        },
        ChatCommand::AddCommand { trigger, content } => {
            match controller.add_command(&trigger, &content) {
                Ok(command) => {
                    renderer.print_info(&format!("Command '{}' saved.", command.trigger))
                }
                Err(err) => renderer.print_error(&err.to_string()),
            }
        }
        ChatCommand::RemoveCommand(trigger) => match controller.remove_command(&trigger) {
            0 => renderer.print_error(&format!("No command '{trigger}'.")),
            n => renderer.print_info(&format!("Removed {n} command(s) '{trigger}'.")),
        },
        ChatCommand::ListCommands => print_commands(controller),
        ChatCommand::History => print_transcript(controller, renderer),
        ChatCommand::Model(name) => {
            let model: Model = name.parse().unwrap_or_else(|_| Model::Custom(name.clone()));
            controller.set_model(model);
            renderer.print_info(&format!("Model changed to: {}", controller.model()));
        }
        ChatCommand::Stats => print_stats(controller),
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    true
}

fn show(controller: &Controller, renderer: &mut PlainTextRenderer, id: MessageId) {
    if let Some(message) = controller.transcript().get(id) {
        renderer.show_message(message);
    }
}

fn print_transcript(controller: &Controller, renderer: &mut PlainTextRenderer) {
    for message in controller.transcript().messages() {
        renderer.show_message(message);
    }
}

fn print_commands(controller: &Controller) {
    if controller.commands().is_empty() {
        println!("    Custom commands: (none)");
        return;
    }
    println!("    Custom commands:");
    for command in controller.commands() {
        println!("      {} => {}", command.trigger, command.content);
    }
}

fn print_stats(controller: &Controller) {
    let stats = controller.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Persona: {}", stats.persona);
    println!(
        "      Session: {}",
        if stats.has_session {
            "active"
        } else {
            "none (set a key with /key)"
        }
    );
    println!("      Session turns: {}", stats.session_turns);
    println!("      Transcript messages: {}", stats.transcript_len);
    println!("      Custom commands: {}", stats.commands);
    println!(
        "      Turns this run: {} ({} failed)",
        stats.turns, stats.failed_turns
    );
    match controller.pending_attachment() {
        Some(attachment) => println!("      Pending attachment: {}", attachment.mime_type),
        None => println!("      Pending attachment: (none)"),
    }
}
