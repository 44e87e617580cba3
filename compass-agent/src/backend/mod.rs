//! Generative backend abstraction layer.
//!
//! Provides a trait-based interface over the model service:
//! - Gemini REST API
//! - Mock backend for testing

pub mod gemini;
pub mod mock;
pub mod traits;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};
pub use traits::{
    BackendError, Content, ContentRequest, ContentResponse, ContentRole, FinishReason,
    GenerativeBackend, ImageInput, InlinePayload, OutputMode, Part, Usage,
};
