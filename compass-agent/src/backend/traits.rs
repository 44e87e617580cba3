//! Core traits for generative backends.
//!
//! This module defines the `GenerativeBackend` trait - the abstraction over
//! the remote model service the gateway talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error types for backend operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend is not available
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Rate limited by the provider
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    /// Content was blocked by the provider
    #[error("Content blocked: {reason}")]
    ContentBlocked { reason: String },

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Parsing error
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Core trait for generative backends.
///
/// Every call is independent: no retries, no shared conversation state.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Get the backend identifier.
    fn id(&self) -> &str;

    /// Generate a complete response.
    async fn generate(&self, request: ContentRequest) -> Result<ContentResponse, BackendError>;

    /// Generate a streaming response.
    ///
    /// Returns a stream of text fragments.
    async fn generate_stream(
        &self,
        request: ContentRequest,
    ) -> Result<crate::stream::FragmentStream, BackendError>;
}

/// Request for content generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentRequest {
    /// Model identifier
    pub model: String,
    /// System instruction (optional)
    pub system_instruction: Option<String>,
    /// Conversation turns, oldest first
    pub contents: Vec<Content>,
    /// Requested output form
    pub output: OutputMode,
    /// Token budget for extended reasoning
    pub thinking_budget: Option<u32>,
}

impl ContentRequest {
    /// Create a new request with a single user turn.
    pub fn user(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            contents: vec![Content::user_text(text)],
            ..Default::default()
        }
    }

    /// Add a system instruction.
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Add a turn.
    pub fn with_content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    /// Request JSON constrained by a provider schema.
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.output = OutputMode::Json {
            schema: Some(schema),
        };
        self
    }

    /// Set the output mode.
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Enable extended reasoning.
    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    /// Who produced the turn
    pub role: ContentRole,
    /// Ordered parts
    pub parts: Vec<Part>,
}

impl Content {
    /// A user turn with a text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A model turn with a text part.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Append an inline image.
    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.parts.push(Part::Image(image));
        self
    }
}

/// Role of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

impl ContentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentRole::User => "user",
            ContentRole::Model => "model",
        }
    }
}

/// A part of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(ImageInput),
}

/// Raw image bytes attached to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Requested output form.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OutputMode {
    /// Plain text
    #[default]
    Text,
    /// JSON, optionally constrained by a provider schema
    Json { schema: Option<serde_json::Value> },
    /// Spoken audio in the given prebuilt voice
    Audio { voice: String },
    /// A generated image
    Image { aspect_ratio: Option<String> },
}

/// Response from content generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResponse {
    /// Concatenated text parts
    pub text: String,
    /// Inline binary parts, still base64-encoded
    pub inline_data: Vec<InlinePayload>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Token usage
    pub usage: Usage,
}

impl ContentResponse {
    /// A text-only response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A response carrying one inline payload.
    pub fn inline(mime_type: impl Into<String>, data_base64: impl Into<String>) -> Self {
        Self {
            inline_data: vec![InlinePayload {
                mime_type: mime_type.into(),
                data: data_base64.into(),
            }],
            ..Default::default()
        }
    }
}

/// Inline binary data as it arrives on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePayload {
    pub mime_type: String,
    /// Base64 text
    pub data: String,
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    #[default]
    Stop,
    /// Hit max tokens limit
    MaxTokens,
    /// Stopped by a safety filter
    Safety,
    /// Anything else the provider reports
    Other,
}

impl FinishReason {
    /// Map the provider's finish reason string.
    pub fn from_provider(reason: Option<&str>) -> Self {
        match reason {
            None | Some("STOP") | Some("FINISH_REASON_UNSPECIFIED") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::MaxTokens,
            Some("SAFETY") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") | Some("SPII")
            | Some("RECITATION") => FinishReason::Safety,
            Some(_) => FinishReason::Other,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the response
    pub completion_tokens: u32,
}

impl Usage {
    /// Get total tokens.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}
