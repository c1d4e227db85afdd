//! The ordered message log shown to the user.
//!
//! Messages are append-only.  The one exception is the model message that is
//! currently streaming: fragments are appended to it until streaming ends,
//! after which it is as immutable as the rest.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::attachment::Attachment;
use crate::types::Role;

/// Identity of a message within one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Assigned by the transcript when the message is appended.
    pub id: MessageId,
    /// Who wrote the message.
    pub role: Role,
    /// Display text.
    pub content: String,
    /// Creation time.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
    /// User-facing error notice; its presence marks the message as errored.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    /// Set when the user stopped the reply before it finished.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub interrupted: bool,
    /// Image sent with the message.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attachment: Option<Attachment>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: MessageId(0),
            role,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
            error: None,
            interrupted: false,
            attachment,
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self::new(Role::User, content, attachment)
    }

    /// A model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content, None)
    }

    /// Returns true if the message carries an error notice.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns true if the reply was cut short by the user.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Ordered message log.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    streaming: Option<MessageId>,
    next_id: u64,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript holding only `seed`.
    pub fn with_seed(seed: Message) -> Self {
        let mut transcript = Self::new();
        transcript.append(seed);
        transcript
    }

    fn allocate_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId(self.next_id)
    }

    /// Adds a message to the end and returns its id.
    pub fn append(&mut self, mut message: Message) -> MessageId {
        let id = self.allocate_id();
        message.id = id;
        self.messages.push(message);
        id
    }

    /// Appends a message that will receive streamed fragments.
    ///
    /// Any message still streaming is finished first.
    pub fn begin_streaming(&mut self, message: Message) -> MessageId {
        self.finish_streaming();
        let id = self.append(message);
        self.streaming = Some(id);
        id
    }

    /// Ends streaming; returns the id of the message that was streaming.
    pub fn finish_streaming(&mut self) -> Option<MessageId> {
        self.streaming.take()
    }

    /// Returns the id of the streaming message, if any.
    pub fn streaming_id(&self) -> Option<MessageId> {
        self.streaming
    }

    fn streaming_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        if self.streaming != Some(id) {
            return None;
        }
        self.messages.iter_mut().rev().find(|message| message.id == id)
    }

    /// Appends `fragment` to the streaming message `id`.
    ///
    /// Unknown ids and messages that are not streaming are left untouched;
    /// returns whether the fragment was applied.
    pub fn append_fragment(&mut self, id: MessageId, fragment: &str) -> bool {
        match self.streaming_mut(id) {
            Some(message) => {
                message.content.push_str(fragment);
                true
            }
            None => {
                tracing::debug!(%id, "dropping fragment for a message that is not streaming");
                false
            }
        }
    }

    /// Marks the streaming message `id` as errored, keeping its content.
    pub fn mark_error(&mut self, id: MessageId, notice: impl Into<String>) -> bool {
        match self.streaming_mut(id) {
            Some(message) => {
                message.error = Some(notice.into());
                true
            }
            None => false,
        }
    }

    /// Marks the streaming message `id` as stopped by the user, keeping its
    /// content.
    pub fn mark_interrupted(&mut self, id: MessageId) -> bool {
        match self.streaming_mut(id) {
            Some(message) => {
                message.interrupted = true;
                true
            }
            None => false,
        }
    }

    /// Replaces the whole transcript with `seed`.
    pub fn clear(&mut self, seed: Message) -> MessageId {
        self.messages.clear();
        self.streaming = None;
        self.append(seed)
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Looks up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    /// The newest message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(transcript: &Transcript) -> Vec<&str> {
        transcript
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect()
    }

    #[test]
    fn append_keeps_order_and_assigns_ids() {
        let mut transcript = Transcript::new();
        let a = transcript.append(Message::model("welcome"));
        let b = transcript.append(Message::user("hi", None));
        let c = transcript.append(Message::user("hi", None));
        assert!(a < b && b < c);
        assert_eq!(contents(&transcript), vec!["welcome", "hi", "hi"]);
        assert_eq!(transcript.get(b).unwrap().role, Role::User);
    }

    #[test]
    fn clear_then_append() {
        let mut transcript = Transcript::with_seed(Message::model("welcome"));
        transcript.append(Message::user("one", None));
        transcript.append(Message::model("two"));

        transcript.clear(Message::model("seed"));
        transcript.append(Message::user("m", None));
        assert_eq!(contents(&transcript), vec!["seed", "m"]);
    }

    #[test]
    fn fragments_go_to_streaming_message() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("hello", None));
        let id = transcript.begin_streaming(Message::model(""));
        for fragment in ["He", "llo ", "there"] {
            assert!(transcript.append_fragment(id, fragment));
        }
        assert_eq!(transcript.last().unwrap().content, "Hello there");
        assert_eq!(transcript.finish_streaming(), Some(id));

        assert!(!transcript.append_fragment(id, "late"));
        assert_eq!(transcript.last().unwrap().content, "Hello there");
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut transcript = Transcript::new();
        let id = transcript.append(Message::model("fixed"));
        assert!(!transcript.append_fragment(id, "x"));
        assert!(!transcript.append_fragment(MessageId(999), "x"));
        assert_eq!(contents(&transcript), vec!["fixed"]);
    }

    #[test]
    fn mark_error_keeps_partial_text() {
        let mut transcript = Transcript::new();
        let id = transcript.begin_streaming(Message::model(""));
        transcript.append_fragment(id, "partial");
        assert!(transcript.mark_error(id, "ERROR"));
        let message = transcript.get(id).unwrap();
        assert_eq!(message.content, "partial");
        assert!(message.is_error());
        assert!(!message.is_interrupted());
    }

    #[test]
    fn interruption_is_not_an_error() {
        let mut transcript = Transcript::new();
        let id = transcript.begin_streaming(Message::model(""));
        transcript.append_fragment(id, "half");
        assert!(transcript.mark_interrupted(id));
        transcript.finish_streaming();
        assert!(!transcript.mark_interrupted(id));

        let message = transcript.get(id).unwrap();
        assert_eq!(message.content, "half");
        assert!(message.is_interrupted());
        assert!(!message.is_error());
    }

    #[test]
    fn clear_ends_streaming_and_keeps_ids_unique() {
        let mut transcript = Transcript::new();
        let streaming = transcript.begin_streaming(Message::model(""));
        let seed = transcript.clear(Message::model("seed"));
        assert_eq!(transcript.streaming_id(), None);
        assert_ne!(streaming, seed);
        assert!(!transcript.append_fragment(streaming, "x"));
    }

    #[test]
    fn only_one_message_streams() {
        let mut transcript = Transcript::new();
        let first = transcript.begin_streaming(Message::model(""));
        let second = transcript.begin_streaming(Message::model(""));
        assert_eq!(transcript.streaming_id(), Some(second));
        assert!(!transcript.append_fragment(first, "x"));
        assert!(transcript.append_fragment(second, "y"));
    }
}
