//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the
//! controller can drive a terminal, a test recorder, or anything else.  The
//! default implementation writes to stdout with optional ANSI styling.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chat::controller::INTERRUPTED_NOTICE;
use crate::chat::transcript::Message;
use crate::types::Role;

/// ANSI escape code for dim text (used for informational lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the model label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Label printed before model messages.
pub const MODEL_LABEL: &str = "WORM/ZERO";

/// Label printed before user messages.
pub const USER_LABEL: &str = "YOU";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a chunk of streamed reply text.
    ///
    /// This is called incrementally as fragments arrive.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Display a whole transcript message.
    fn show_message(&mut self, message: &Message);

    /// Called when a reply has finished streaming, successfully or not.
    fn finish_response(&mut self);

    /// Called when the user stops a reply.
    fn print_interrupted(&mut self) {}

    /// Returns true if streaming should stop.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag, typically set from a Ctrl-C handler.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn label(&self, role: Role) -> String {
        let (color, name) = match role {
            Role::User => (ANSI_CYAN, USER_LABEL),
            Role::Model => (ANSI_GREEN, MODEL_LABEL),
        };
        if self.use_color {
            format!("{color}[{name}]{ANSI_RESET}")
        } else {
            format!("[{name}]")
        }
    }

    /// Prints the label that precedes a streamed reply.
    pub fn start_reply(&mut self) {
        print!("{} ", self.label(Role::Model));
        self.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("\n{ANSI_RED}{error}{ANSI_RESET}");
        } else {
            eprintln!("\n{error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
    }

    fn show_message(&mut self, message: &Message) {
        let label = self.label(message.role);
        let time = crate::utils::time::format_clock(message.timestamp);
        println!("{label} {time}");
        if let Some(attachment) = &message.attachment {
            println!(
                "  <{} image, ~{} bytes>",
                attachment.mime_type,
                attachment.approx_size()
            );
        }
        if !message.content.is_empty() {
            println!("{}", message.content);
        }
        if message.interrupted {
            self.print_info(INTERRUPTED_NOTICE);
        }
        if let Some(error) = &message.error {
            if self.use_color {
                println!("{ANSI_RED}{error}{ANSI_RESET}");
            } else {
                println!("{error}");
            }
        }
        self.flush();
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        println!();
        self.print_info(INTERRUPTED_NOTICE);
        self.flush();
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.label(Role::Model), "[WORM/ZERO]");
        assert_eq!(renderer.label(Role::User), "[YOU]");
    }

    #[test]
    fn interrupt_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let renderer = PlainTextRenderer::with_color(false).with_interrupt(flag.clone());
        assert!(!renderer.should_interrupt());
        flag.store(true, Ordering::Relaxed);
        assert!(renderer.should_interrupt());
        assert!(!PlainTextRenderer::new().should_interrupt());
    }
}
