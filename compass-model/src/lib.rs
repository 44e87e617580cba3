//! Student Compass data model
//!
//! Plain, acyclic, JSON-serializable records for the learning companion and
//! the pure reducers that mutate them:
//!
//! - **Profile**: who the student is and where they stand
//! - **Paths**: ordered milestone roadmaps, at most one milestone `current`
//! - **Enrichments**: notes, mind maps, exams and simplified material
//!   cached per milestone
//! - **Planner**: weekly task blocks
//! - **Project lab**: generated project suggestions
//!
//! Relationships are by string id only. Enable the `typescript` feature to
//! export the wire shapes with `ts-rs`.

pub mod chat;
pub mod enrichment;
pub mod library;
pub mod path;
pub mod profile;
pub mod project;
pub mod task;
pub mod theme;

pub use chat::{ChatMessage, ChatRole};
pub use enrichment::{
    Enrichment, EnrichmentKind, ExamAttempt, ExamScore, MindMapNode, PracticeQuestion,
    SimplifiedMaterial, StudyNotes,
};
pub use library::{InstallMode, PathLibrary};
pub use path::{
    BlueprintError, LearningPath, Milestone, MilestoneBlueprint, MilestoneStatus, PathBlueprint,
};
pub use profile::{SkillLevel, StudentProfile, StudentStage};
pub use project::{Difficulty, ProjectIdea};
pub use task::{Task, TaskBoard, TaskError, Weekday, DEFAULT_DURATION_HOURS, TASK_PALETTE};
pub use theme::ThemePreference;
