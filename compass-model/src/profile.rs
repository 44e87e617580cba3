//! Student profile and the guidance parameters every prompt is built from.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Where the student stands in their studies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum StudentStage {
    Freshman,
    Sophomore,
    Junior,
    Senior,
    #[serde(rename = "Career Changer")]
    CareerChanger,
}

impl StudentStage {
    /// All stages in onboarding order.
    pub const ALL: [StudentStage; 5] = [
        StudentStage::Freshman,
        StudentStage::Sophomore,
        StudentStage::Junior,
        StudentStage::Senior,
        StudentStage::CareerChanger,
    ];

    /// Label used in prompts and on screen.
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStage::Freshman => "Freshman",
            StudentStage::Sophomore => "Sophomore",
            StudentStage::Junior => "Junior",
            StudentStage::Senior => "Senior",
            StudentStage::CareerChanger => "Career Changer",
        }
    }
}

impl std::fmt::Display for StudentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-assessed skill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
        }
    }
}

impl std::fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single student profile of a local session.
///
/// Created once when onboarding completes. There is no edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(rename = "user_id")]
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub stage: StudentStage,
    pub skill_level: SkillLevel,
    pub primary_goal: String,
}

impl StudentProfile {
    /// First word of the name, used in greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}
