//! Compass Agent - Generative AI gateway
//!
//! Provides the contract between the learning companion and the model
//! service:
//! - Trait-based generative backends (Gemini REST, mock)
//! - Output schemas sent to the model and enforced on its replies
//! - Fragment streaming for mentor replies, with cancellation
//! - Decoded audio and image payloads
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               AiGateway                 │
//! │  structured · streaming · binary calls  │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┴───────────┐
//!      ▼                       ▼
//! ┌──────────────────┐   ┌─────────────┐
//! │ GenerativeBackend│   │ Schema /    │
//! │ (Gemini / Mock)  │   │ Prompts     │
//! └──────────────────┘   └─────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod contracts;
pub mod error;
pub mod gateway;
pub mod prompt;
pub mod schema;
pub mod stream;

// Re-export main types for convenience
pub use backend::traits::{
    BackendError, Content, ContentRequest, ContentResponse, ContentRole, GenerativeBackend,
    ImageInput, OutputMode, Part,
};
pub use backend::{GeminiBackend, MockBackend, MockReply};
pub use config::{GatewayConfig, ModelRoster};
pub use error::{FailureCategory, GenerationError};
pub use gateway::{AiGateway, MediaPayload, ASPECT_RATIOS};
pub use prompt::PromptAssembler;
pub use schema::{Schema, SchemaViolation};
pub use stream::{Fragment, FragmentSender, FragmentStream, StreamError};
