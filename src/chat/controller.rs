//! The chat controller.
//!
//! [`ChatController`] is the single owner of the current session, the
//! transcript, the custom command table, the pending attachment and the
//! credential.  Every user action goes through it; `submit` takes
//! `&mut self`, so at most one turn is ever in flight.

use std::path::Path;
use std::time::Instant;

use crate::attachment::{self, Attachment, ImageMimeType};
use crate::chat::command_table::{CommandTable, CustomCommand};
use crate::chat::config::ChatConfig;
use crate::chat::persona::Persona;
use crate::chat::render::Renderer;
use crate::chat::session::Session;
use crate::chat::transcript::{Message, MessageId, Transcript};
use crate::credential::Credential;
use crate::observability::{
    CHAT_SESSION_RESETS, CHAT_TURN_DURATION, CHAT_TURN_FAILURES, CHAT_TURNS,
};
use crate::provider::Provider;
use crate::store::{CREDENTIAL_KEY, KeyValueStore};
use crate::types::Model;
use crate::{Error, Result};

/// First transcript message of every run.
pub const WELCOME_MESSAGE: &str = "> WORM/ZERO ONLINE.\n\
> Ketik apa aja, gue jawab. Lampirin gambar pake /attach, ganti persona pake /persona.\n\
> /help buat daftar perintah.";

/// Transcript seed after the history is wiped.
pub const CLEARED_MESSAGE: &str = "Memory format complete. Data hilang semua.";

/// User message content when only an image is sent.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "[SENT AN IMAGE]";

/// Prompt sent in place of empty text when only an image is sent.
pub const IMAGE_ONLY_PROMPT: &str = "Analisis ini.";

/// Notice on a reply that failed in transit.
pub const TRANSPORT_NOTICE: &str = "ERROR: Gagal ngirim data. Cek koneksi.";

/// Notice on a reply whose credential was rejected.
pub const AUTH_NOTICE: &str = "ERROR: API key ditolak. Masukin key baru pake /key.";

/// Notice on a reply the user stopped.
pub const INTERRUPTED_NOTICE: &str = "> TRANSMISI DIPUTUS.";

/// Shown instead of sending when there is no session.
pub const NO_SESSION_NOTICE: &str = "Belum ada API key. Masukin dulu pake /key <api-key>.";

/// What happened to one submitted input.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Nothing to send; no state changed.
    Ignored,
    /// Refused before anything was appended.
    Rejected(Error),
    /// The reply streamed to completion.
    Completed {
        /// The model message holding the reply.
        message_id: MessageId,
        /// The full reply.
        text: String,
    },
    /// The reply failed; the message keeps any partial text and an error notice.
    Failed {
        /// The errored model message.
        message_id: MessageId,
        /// What went wrong.
        error: Error,
    },
    /// The user stopped the reply.
    Interrupted {
        /// The model message holding the partial reply.
        message_id: MessageId,
    },
}

/// Counters for the current run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatStats {
    /// The model replies come from.
    pub model: Model,
    /// The active persona.
    pub persona: Persona,
    /// Whether a session exists.
    pub has_session: bool,
    /// Completed exchanges in the current session.
    pub session_turns: usize,
    /// Messages in the transcript.
    pub transcript_len: usize,
    /// Number of custom commands.
    pub commands: usize,
    /// Turns submitted this run.
    pub turns: u64,
    /// Turns that failed this run.
    pub failed_turns: u64,
}

/// Owner of all chat state.
pub struct ChatController<P: Provider> {
    provider: P,
    store: Box<dyn KeyValueStore>,
    model: Model,
    persona: Persona,
    credential: Option<Credential>,
    session: Option<Session>,
    transcript: Transcript,
    commands: CommandTable,
    pending: Option<Attachment>,
    turns: u64,
    failed_turns: u64,
}

impl<P: Provider> ChatController<P> {
    /// Creates a controller, restoring the command table and any stored key.
    ///
    /// With a stored key a session is created right away.
    pub fn new(provider: P, store: Box<dyn KeyValueStore>, config: &ChatConfig) -> Self {
        let commands = CommandTable::load(store.as_ref());
        let credential = match store.get(CREDENTIAL_KEY) {
            Ok(Some(raw)) => match Credential::new(raw) {
                Ok(credential) => Some(credential),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring stored API key");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "could not read stored API key");
                None
            }
        };
        let mut controller = Self {
            provider,
            store,
            model: config.model.clone(),
            persona: config.persona,
            credential,
            session: None,
            transcript: Transcript::with_seed(Message::model(WELCOME_MESSAGE)),
            commands,
            pending: None,
            turns: 0,
            failed_turns: 0,
        };
        if controller.credential.is_some() {
            controller.reset_session();
        }
        controller
    }

    /// Sets, remembers and starts a session with a new API key.
    ///
    /// # Errors
    ///
    /// Returns an authentication error for a blank key.  A failure to
    /// persist the key is logged and does not fail the call.
    pub fn set_credential(&mut self, key: &str) -> Result<()> {
        let credential = Credential::new(key)?;
        if let Err(err) = self.store.set(CREDENTIAL_KEY, credential.expose()) {
            tracing::warn!(error = %err, "could not persist API key");
        }
        self.use_credential(credential);
        Ok(())
    }

    /// Starts a session with `credential` without persisting it.
    pub fn use_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
        self.reset_session();
    }

    /// Drops the current session, if any, and starts a fresh one.
    ///
    /// Without a credential there is nothing to start and no session remains.
    pub fn reset_session(&mut self) {
        self.session = self.credential.clone().map(|credential| {
            Session::create(credential, self.persona.system_instruction())
                .with_model(self.model.clone())
        });
        if self.session.is_some() {
            CHAT_SESSION_RESETS.click();
            tracing::debug!(persona = %self.persona, model = %self.model, "session reset");
        }
    }

    /// Switches persona, announcing it in the transcript.
    ///
    /// The session restarts with the new instruction; earlier turns are not
    /// replayed into it.
    pub fn change_persona(&mut self, persona: Persona) -> MessageId {
        self.persona = persona;
        let id = self
            .transcript
            .append(Message::model(persona.reboot_message()));
        if self.credential.is_some() {
            self.reset_session();
        }
        id
    }

    /// Wipes the transcript and starts a fresh session.
    pub fn clear_history(&mut self) -> MessageId {
        let id = self.transcript.clear(Message::model(CLEARED_MESSAGE));
        if self.credential.is_some() {
            self.reset_session();
        }
        id
    }

    /// Changes the model; the session restarts.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
        if self.credential.is_some() {
            self.reset_session();
        }
    }

    /// Reads an image into the pending slot.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unsupported types and a file-read
    /// error if the file cannot be read; the pending slot is left as it was.
    pub async fn attach<Q: AsRef<Path>>(&mut self, path: Q) -> Result<&Attachment> {
        let mime_type = ImageMimeType::from_path(path.as_ref())?;
        let attachment = attachment::read_file(path, mime_type).await?;
        Ok(&*self.pending.insert(attachment))
    }

    /// Puts an already-encoded image in the pending slot, replacing any other.
    pub fn set_attachment(&mut self, attachment: Attachment) {
        self.pending = Some(attachment);
    }

    /// Empties the pending slot, returning what was there.
    pub fn clear_attachment(&mut self) -> Option<Attachment> {
        self.pending.take()
    }

    /// The image that will go with the next message.
    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.pending.as_ref()
    }

    /// Adds a custom command and persists the table.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the trigger or content is blank.
    pub fn add_command(&mut self, trigger: &str, content: &str) -> Result<CustomCommand> {
        let command = self.commands.add(trigger, content)?.clone();
        self.persist_commands();
        Ok(command)
    }

    /// Removes every command with `trigger` and persists the table.
    pub fn remove_command(&mut self, trigger: &str) -> usize {
        let removed = self.commands.remove(trigger);
        if removed > 0 {
            self.persist_commands();
        }
        removed
    }

    fn persist_commands(&mut self) {
        if let Err(err) = self.commands.save(self.store.as_mut()) {
            tracing::warn!(error = %err, "could not persist custom commands");
        }
    }

    /// The custom command table.
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// The transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The current session, if one exists.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns true if a session exists.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The active persona.
    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// The active model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Counters for the current run.
    pub fn stats(&self) -> ChatStats {
        ChatStats {
            model: self.model.clone(),
            persona: self.persona,
            has_session: self.session.is_some(),
            session_turns: self.session.as_ref().map_or(0, Session::turn_count),
            transcript_len: self.transcript.len(),
            commands: self.commands.len(),
            turns: self.turns,
            failed_turns: self.failed_turns,
        }
    }

    /// Sends one user input and streams the reply into the transcript.
    ///
    /// Failures never escape: they are recorded on the reply message,
    /// reported to the renderer and returned in the outcome.
    pub async fn submit(&mut self, input: &str, renderer: &mut dyn Renderer) -> SubmitOutcome {
        if input.trim().is_empty() && self.pending.is_none() {
            return SubmitOutcome::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            renderer.print_error(NO_SESSION_NOTICE);
            return SubmitOutcome::Rejected(Error::session_not_initialized(
                "no session; set an API key first",
            ));
        };

        let text = self.commands.lookup(input).trim().to_string();
        let attachment = self.pending.take();
        let display = if text.is_empty() && attachment.is_some() {
            IMAGE_ONLY_PLACEHOLDER.to_string()
        } else {
            text.clone()
        };
        self.transcript
            .append(Message::user(display, attachment.clone()));
        let message_id = self.transcript.begin_streaming(Message::model(""));
        let prompt = if text.is_empty() {
            IMAGE_ONLY_PROMPT
        } else {
            text.as_str()
        };

        self.turns += 1;
        CHAT_TURNS.click();
        let start = Instant::now();

        let outcome = match session
            .send_turn(&self.provider, prompt, attachment.as_ref())
            .await
        {
            Ok(mut reply) => loop {
                if renderer.should_interrupt() {
                    self.transcript.mark_interrupted(message_id);
                    renderer.print_interrupted();
                    break SubmitOutcome::Interrupted { message_id };
                }
                match reply.next_fragment().await {
                    Ok(Some(fragment)) => {
                        self.transcript.append_fragment(message_id, &fragment);
                        renderer.print_text(&fragment);
                    }
                    Ok(None) => {
                        break SubmitOutcome::Completed {
                            message_id,
                            text: reply.collected().to_string(),
                        };
                    }
                    Err(error) => break SubmitOutcome::Failed { message_id, error },
                }
            },
            Err(error) => SubmitOutcome::Failed { message_id, error },
        };

        if let SubmitOutcome::Failed { error, .. } = &outcome {
            self.failed_turns += 1;
            CHAT_TURN_FAILURES.click();
            tracing::warn!(error = %error, "turn failed");
            let notice = if error.is_authentication() {
                AUTH_NOTICE
            } else {
                TRANSPORT_NOTICE
            };
            self.transcript.mark_error(message_id, notice);
            renderer.print_error(&format!("{notice} ({error})"));
        }
        self.transcript.finish_streaming();
        CHAT_TURN_DURATION.add(start.elapsed().as_secs_f64());
        renderer.finish_response();
        outcome
    }
}
