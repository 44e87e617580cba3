//! Mentor chat session.
//!
//! The session owns the visible conversation. A send appends the student's
//! message plus an empty model message, then streams fragments into that
//! placeholder until the reply finishes or fails.

use futures::StreamExt;
use tracing::{debug, warn};

use compass_agent::{AiGateway, GenerationError, ImageInput};
use compass_model::{ChatMessage, ChatRole, StudentProfile};

use crate::error::CompanionError;

/// Shown when the model finishes without saying anything.
pub const EMPTY_REPLY_FALLBACK: &str = "I'm analyzing the best next step for your stage.";

/// Shown in place of a reply that failed.
pub const FAILED_REPLY_FALLBACK: &str = "Connection lost. Please try again.";

/// Greeting that opens every conversation.
pub fn welcome_message(profile: &StudentProfile) -> String {
    format!(
        "Welcome, {}. As your mentor for your {} stage, I'm here to remove the \"What should I do?\" confusion. Ask me for a single clear direction.",
        profile.first_name(),
        profile.stage.as_str()
    )
}

/// One mentor conversation, held in memory only.
#[derive(Debug, Clone)]
pub struct MentorSession {
    messages: Vec<ChatMessage>,
    pending: bool,
}

impl MentorSession {
    pub fn new(profile: &StudentProfile) -> Self {
        Self {
            messages: vec![ChatMessage::model(welcome_message(profile))],
            pending: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// A reply is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Record the student's message and open an empty reply.
    ///
    /// Returns the history as it stood before this message.
    pub fn begin(&mut self, message: &str) -> Result<Vec<ChatMessage>, CompanionError> {
        if self.pending {
            return Err(CompanionError::Busy);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(CompanionError::EmptyMessage);
        }

        let history = self.messages.clone();
        self.messages.push(ChatMessage::user(message));
        self.messages.push(ChatMessage::model(String::new()));
        self.pending = true;
        Ok(history)
    }

    /// Append streamed text to the open reply.
    pub fn push_fragment(&mut self, text: &str) {
        if !self.pending {
            return;
        }
        if let Some(reply) = self.open_reply() {
            reply.content.push_str(text);
        }
    }

    /// Close the open reply. Empty replies and failures get fallback text.
    pub fn finish(&mut self, outcome: Result<(), &GenerationError>) {
        if !self.pending {
            return;
        }
        self.pending = false;

        let Some(reply) = self.open_reply() else {
            return;
        };
        match outcome {
            Ok(()) if reply.content.trim().is_empty() => {
                reply.content = EMPTY_REPLY_FALLBACK.to_string();
            }
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, partial_len = reply.content.len(), "Mentor reply failed");
                reply.content = FAILED_REPLY_FALLBACK.to_string();
            }
        }
    }

    /// Abandon the open reply. Text received so far stays; an empty
    /// placeholder is removed. The session accepts new messages again.
    pub fn cancel(&mut self) {
        if !self.pending {
            return;
        }
        self.pending = false;
        if self.last_reply().is_some_and(|r| r.is_empty()) {
            self.messages.pop();
        }
        debug!(messages = self.messages.len(), "Mentor reply cancelled");
    }

    /// Send a message and stream the reply into the session.
    pub async fn send(
        &mut self,
        gateway: &AiGateway,
        profile: &StudentProfile,
        message: &str,
        image: Option<ImageInput>,
        deep_reasoning: bool,
    ) -> Result<String, CompanionError> {
        self.send_with(gateway, profile, message, image, deep_reasoning, |_| {})
            .await
    }

    /// [`MentorSession::send`], calling `on_fragment` with each piece of
    /// text as it arrives.
    ///
    /// Returns the final reply text. On failure the reply shows the
    /// fallback text and the error is returned. Dropping the future before
    /// it completes cancels the reply.
    pub async fn send_with<F>(
        &mut self,
        gateway: &AiGateway,
        profile: &StudentProfile,
        message: &str,
        image: Option<ImageInput>,
        deep_reasoning: bool,
        mut on_fragment: F,
    ) -> Result<String, CompanionError>
    where
        F: FnMut(&str),
    {
        let history = self.begin(message)?;
        let reply = OpenReply { session: self };

        let mut stream = match gateway
            .mentor_reply(profile, &history, message.trim(), image, deep_reasoning)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                reply.session.finish(Err(&e));
                return Err(e.into());
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    if !fragment.content.is_empty() {
                        on_fragment(&fragment.content);
                        reply.session.push_fragment(&fragment.content);
                    }
                }
                Err(e) => {
                    let e = GenerationError::from(e);
                    reply.session.finish(Err(&e));
                    return Err(e.into());
                }
            }
        }

        reply.session.finish(Ok(()));
        let text = reply.session.last_reply().unwrap_or_default().to_string();
        debug!(reply_len = text.len(), "Mentor reply complete");
        Ok(text)
    }

    fn last_reply(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == ChatRole::Model)
            .map(|m| m.content.as_str())
    }

    fn open_reply(&mut self) -> Option<&mut ChatMessage> {
        self.messages.last_mut().filter(|m| m.role == ChatRole::Model)
    }
}

/// Cancels the session's open reply if a send is dropped mid-flight.
struct OpenReply<'a> {
    session: &'a mut MentorSession,
}

impl Drop for OpenReply<'_> {
    fn drop(&mut self) {
        self.session.cancel();
    }
}
