//! Provider-facing chat sessions.
//!
//! A [`Session`] binds a credential, a system instruction, a model and the
//! fixed sampling parameters, and keeps the multi-turn history that is sent
//! with every request.  [`Session::send_turn`] returns a [`ReplyStream`] of
//! text fragments; the turn is only recorded in the history once that
//! stream has run to completion without error.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::{Stream, StreamExt};

use crate::attachment::Attachment;
use crate::credential::Credential;
use crate::observability::STREAM_FRAGMENTS;
use crate::provider::{ChunkStream, Provider};
use crate::types::{Content, GenerateContentRequest, GenerationConfig, Model, Part};
use crate::{Error, Result};

/// Sampling temperature used for every turn.
pub const TEMPERATURE: f32 = 0.9;

/// Top-k used for every turn.
pub const TOP_K: u32 = 40;

/// Top-p used for every turn.
pub const TOP_P: f32 = 0.95;

/// The generation config every session sends.
pub const SAMPLING: GenerationConfig = GenerationConfig::new(TEMPERATURE, TOP_K, TOP_P);

/// A multi-turn exchange with the provider.
#[derive(Debug, Clone)]
pub struct Session {
    credential: Credential,
    system_instruction: String,
    model: Model,
    history: Vec<Content>,
}

impl Session {
    /// Creates a session; nothing is sent until the first turn.
    pub fn create(credential: Credential, system_instruction: impl Into<String>) -> Self {
        Self {
            credential,
            system_instruction: system_instruction.into(),
            model: Model::default(),
            history: Vec::new(),
        }
    }

    /// Uses `model` for every turn.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// The credential requests are authorized with.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The persona instruction sent as the system instruction.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// The model turns are sent to.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Completed turns, oldest first, alternating user and model.
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Number of completed user/model exchanges.
    pub fn turn_count(&self) -> usize {
        self.history.len() / 2
    }

    /// Builds the request for `user_turn` on top of the current history.
    pub fn build_request(&self, user_turn: Content) -> GenerateContentRequest {
        let mut contents = self.history.clone();
        contents.push(user_turn);
        GenerateContentRequest::new(contents)
            .with_system_instruction(self.system_instruction.clone())
            .with_generation_config(SAMPLING)
    }

    /// Sends a user turn and returns the streamed reply.
    ///
    /// With an attachment the turn carries the text part followed by the
    /// image part.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the request is rejected before any
    /// reply starts; later failures are yielded by the stream.
    pub async fn send_turn(
        &mut self,
        provider: &dyn Provider,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<ReplyStream<'_>> {
        let mut parts = vec![Part::text(text)];
        if let Some(attachment) = attachment {
            parts.push(attachment.to_part());
        }
        let user_turn = Content::user(parts);
        let request = self.build_request(user_turn.clone());

        tracing::debug!(
            model = %self.model,
            history = self.history.len(),
            attachment = attachment.is_some(),
            "sending turn"
        );
        let inner = provider
            .stream_generate(&self.credential, &self.model, request)
            .await?;

        Ok(ReplyStream {
            session: self,
            user_turn: Some(user_turn),
            inner,
            collected: String::new(),
            finished: false,
            failed: false,
        })
    }
}

/// The streamed reply to one turn.
///
/// Yields non-empty text fragments in arrival order.  A failure is yielded
/// once and ends the stream.  Dropping the stream before it finishes leaves
/// the session history untouched.
pub struct ReplyStream<'a> {
    session: &'a mut Session,
    user_turn: Option<Content>,
    inner: ChunkStream,
    collected: String,
    finished: bool,
    failed: bool,
}

impl ReplyStream<'_> {
    /// Waits for the next fragment; `Ok(None)` once the reply is complete.
    pub async fn next_fragment(&mut self) -> Result<Option<String>> {
        self.next().await.transpose()
    }

    /// Returns true once the stream has ended, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns true if the stream ended with an error.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// All text received so far.
    pub fn collected(&self) -> &str {
        &self.collected
    }

    fn fail(&mut self, err: Error) -> Poll<Option<Result<String>>> {
        self.finished = true;
        self.failed = true;
        tracing::debug!(error = %err, "reply stream failed");
        Poll::Ready(Some(Err(err)))
    }

    fn complete(&mut self) {
        self.finished = true;
        let Some(user_turn) = self.user_turn.take() else {
            return;
        };
        if self.collected.is_empty() {
            tracing::debug!("empty reply; turn not recorded");
            return;
        }
        self.session.history.push(user_turn);
        self.session
            .history
            .push(Content::model_text(self.collected.clone()));
    }
}

impl Stream for ReplyStream<'_> {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    if let Some(reason) = chunk.block_reason() {
                        return this.fail(Error::blocked(reason));
                    }
                    match chunk.text() {
                        Some(fragment) if !fragment.is_empty() => {
                            STREAM_FRAGMENTS.click();
                            this.collected.push_str(&fragment);
                            return Poll::Ready(Some(Ok(fragment)));
                        }
                        _ => continue,
                    }
                }
                Some(Err(err)) => return this.fail(err),
                None => {
                    this.complete();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerateContentResponse, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        chunks: Vec<Result<GenerateContentResponse>>,
        requests: Mutex<Vec<GenerateContentRequest>>,
    }

    impl Scripted {
        fn new(chunks: Vec<Result<GenerateContentResponse>>) -> Self {
            Self {
                chunks,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        async fn stream_generate(
            &self,
            _credential: &Credential,
            _model: &Model,
            request: GenerateContentRequest,
        ) -> Result<ChunkStream> {
            self.requests.lock().unwrap().push(request);
            Ok(Box::pin(futures::stream::iter(self.chunks.clone())))
        }
    }

    fn chunk(text: &str) -> Result<GenerateContentResponse> {
        Ok(serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        }))
        .unwrap())
    }

    fn session() -> Session {
        Session::create(Credential::new("key").unwrap(), "be terse")
    }

    #[test]
    fn request_shape() {
        let request = session().build_request(Content::user(vec![Part::text("hi")]));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be terse");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(request.generation_config, Some(SAMPLING));
    }

    #[tokio::test]
    async fn fragments_and_history() {
        let provider = Scripted::new(vec![chunk("He"), chunk(""), chunk("llo")]);
        let mut session = session();

        let mut reply = session.send_turn(&provider, "hello", None).await.unwrap();
        let mut fragments = Vec::new();
        while let Some(fragment) = reply.next_fragment().await.unwrap() {
            fragments.push(fragment);
        }
        assert!(reply.is_finished());
        assert!(!reply.failed());
        assert_eq!(reply.collected(), "Hello");
        assert_eq!(fragments, vec!["He", "llo"]);
        assert_eq!(reply.next_fragment().await.unwrap(), None);
        drop(reply);

        assert_eq!(session.turn_count(), 1);
        assert_eq!(session.history()[0].role, Some(Role::User));
        assert_eq!(session.history()[1].text(), "Hello");

        session.send_turn(&provider, "again", None).await.unwrap();
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[1].contents.len(), 3);
    }

    #[tokio::test]
    async fn attachment_follows_text() {
        let provider = Scripted::new(vec![chunk("ok")]);
        let mut session = session();
        let attachment = Attachment::new("image/png", "AAAA");
        let reply = session
            .send_turn(&provider, "what is this", Some(&attachment))
            .await
            .unwrap();
        drop(reply);

        let requests = provider.requests.lock().unwrap();
        let parts = &requests[0].last_turn().unwrap().parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("what is this"));
        assert_eq!(parts[1].inline_data.as_ref().unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn failure_leaves_history_alone() {
        let provider = Scripted::new(vec![
            chunk("partial"),
            Err(Error::connection("reset", None)),
            chunk("never"),
        ]);
        let mut session = session();
        let mut reply = session.send_turn(&provider, "hello", None).await.unwrap();

        assert_eq!(reply.next_fragment().await.unwrap().as_deref(), Some("partial"));
        assert!(reply.next_fragment().await.unwrap_err().is_connection());
        assert!(reply.failed());
        assert_eq!(reply.next_fragment().await.unwrap(), None);
        assert_eq!(reply.collected(), "partial");
        drop(reply);

        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_error() {
        let blocked = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let provider = Scripted::new(vec![Ok(blocked)]);
        let mut session = session();
        let mut reply = session.send_turn(&provider, "hello", None).await.unwrap();
        let err = reply.next_fragment().await.unwrap_err();
        assert!(matches!(err, Error::Blocked { .. }));
    }

    #[tokio::test]
    async fn abandoned_reply_is_not_recorded() {
        let provider = Scripted::new(vec![chunk("a"), chunk("b")]);
        let mut session = session();
        let mut reply = session.send_turn(&provider, "hello", None).await.unwrap();
        reply.next_fragment().await.unwrap();
        drop(reply);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn usable_as_stream() {
        let provider = Scripted::new(vec![chunk("a"), chunk("b")]);
        let mut session = session();
        let reply = session.send_turn(&provider, "hello", None).await.unwrap();
        let fragments: Vec<String> = reply.map(|f| f.unwrap()).collect().await;
        assert_eq!(fragments.concat(), "ab");
        assert_eq!(session.turn_count(), 1);
    }
}
