//! Compass Companion - the learning companion's application core
//!
//! Ties the data model, durable state and the AI gateway together behind
//! [`Companion`]:
//!
//! - **Onboarding**: intake form to profile and first learning path
//! - **Path library**: generate, switch, archive, share and delete paths
//! - **Study arena**: notes, mind map and exam per milestone
//! - **Project lab**: portfolio ideas for the active path
//! - **Planner**: weekly task blocks with reminders
//! - **Mentor**: streamed, stage-aware chat
//! - **Focus timer** and dashboard progress
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │                Companion                  │
//! │  onboarding · paths · study · lab · tasks │
//! └──────────┬──────────────────┬─────────────┘
//!            │                  │
//!            ▼                  ▼
//!     ┌─────────────┐    ┌─────────────┐
//!     │ StateStore  │    │  AiGateway  │◄── MentorSession
//!     │ (snapshot)  │    │  (Gemini)   │
//!     └─────────────┘    └─────────────┘
//! ```

pub mod companion;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod focus;
pub mod mentor;
pub mod onboarding;
pub mod study;

pub use companion::Companion;
pub use config::CompanionConfig;
pub use dashboard::ProgressSummary;
pub use error::CompanionError;
pub use focus::{FocusState, FocusTimer, FOCUS_SESSION_SECS};
pub use mentor::{MentorSession, EMPTY_REPLY_FALLBACK, FAILED_REPLY_FALLBACK};
pub use onboarding::OnboardingForm;
pub use study::{next_study_step, StudyStep};
