//! Mock generative backend for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::traits::*;
use crate::stream::FragmentStream;

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this response
    Response(ContentResponse),
    /// Stream these fragments (on `generate` they are joined)
    Fragments(Vec<String>),
    /// Fail with this error
    Error(BackendError),
}

/// Mock backend for testing.
///
/// Replies are consumed in order; once the script runs out every call gets
/// the default response.
pub struct MockBackend {
    model_id: String,
    available: AtomicBool,
    default_response: String,
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<ContentRequest>>,
    call_count: AtomicU32,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            available: AtomicBool::new(true),
            default_response: "Mock response".to_string(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the response used when the script is empty.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.default_response = content.into();
        self
    }

    /// Queue a text (or JSON text) response.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then(MockReply::Response(ContentResponse::text(text)))
    }

    /// Queue a JSON response.
    pub fn then_json(self, value: serde_json::Value) -> Self {
        self.then_text(value.to_string())
    }

    /// Queue an inline binary response.
    pub fn then_inline(self, mime_type: impl Into<String>, data_base64: impl Into<String>) -> Self {
        self.then(MockReply::Response(ContentResponse::inline(mime_type, data_base64)))
    }

    /// Queue streamed fragments.
    pub fn then_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.then(MockReply::Fragments(
            fragments.into_iter().map(Into::into).collect(),
        ))
    }

    /// Queue a failure.
    pub fn then_error(self, error: BackendError) -> Self {
        self.then(MockReply::Error(error))
    }

    /// Queue any reply.
    pub fn then(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    /// Queue a reply on a shared backend.
    pub fn push(&self, reply: MockReply) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Get the number of generate calls.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count.
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<ContentRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_reply(&self, request: ContentRequest) -> Result<MockReply, BackendError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("Mock backend disabled".to_string()));
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        Ok(scripted.unwrap_or_else(|| {
            MockReply::Response(ContentResponse::text(self.default_response.clone()))
        }))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: ContentRequest) -> Result<ContentResponse, BackendError> {
        match self.next_reply(request)? {
            MockReply::Response(response) => Ok(response),
            MockReply::Fragments(fragments) => Ok(ContentResponse::text(fragments.concat())),
            MockReply::Error(e) => Err(e),
        }
    }

    async fn generate_stream(
        &self,
        request: ContentRequest,
    ) -> Result<FragmentStream, BackendError> {
        match self.next_reply(request)? {
            MockReply::Response(response) => Ok(FragmentStream::from_complete(response)),
            MockReply::Fragments(fragments) => Ok(FragmentStream::from_fragments(fragments)),
            MockReply::Error(e) => Err(e),
        }
    }
}
