//! Onboarding: turn the intake form into a student profile.

use rand::Rng;
use serde::{Deserialize, Serialize};

use compass_model::{SkillLevel, StudentProfile, StudentStage};

use crate::error::CompanionError;

/// Minimum trimmed length of the student's full name.
pub const MIN_NAME_LEN: usize = 7;

/// Length of the random part of a user id.
const USER_ID_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Domain of generated profile emails.
pub const EMAIL_DOMAIN: &str = "compass.ai";

/// What the student enters during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingForm {
    pub name: String,
    pub stage: StudentStage,
    #[serde(default)]
    pub skill_level: SkillLevel,
    /// Career goal; also the subject of the first path
    pub goal: String,
}

impl OnboardingForm {
    pub fn new(
        name: impl Into<String>,
        stage: StudentStage,
        skill_level: SkillLevel,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            stage,
            skill_level,
            goal: goal.into(),
        }
    }

    pub fn is_name_valid(&self) -> bool {
        self.name.trim().chars().count() >= MIN_NAME_LEN
    }

    pub fn validate(&self) -> Result<(), CompanionError> {
        if !self.is_name_valid() {
            return Err(CompanionError::InvalidOnboarding(format!(
                "name must be at least {MIN_NAME_LEN} characters"
            )));
        }
        if self.goal.trim().is_empty() {
            return Err(CompanionError::InvalidOnboarding(
                "goal must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the profile with a fresh random user id.
    pub fn to_profile(&self) -> Result<StudentProfile, CompanionError> {
        self.to_profile_with_rng(&mut rand::thread_rng())
    }

    /// [`OnboardingForm::to_profile`] with an explicit id source.
    pub fn to_profile_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<StudentProfile, CompanionError> {
        self.validate()?;
        let name = self.name.trim().to_string();

        Ok(StudentProfile {
            user_id: generate_user_id(rng),
            email: email_for(&name),
            name,
            stage: self.stage,
            skill_level: self.skill_level,
            primary_goal: self.goal.trim().to_string(),
        })
    }
}

/// `user_` followed by nine base-36 characters.
pub fn generate_user_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..USER_ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("user_{suffix}")
}

/// Lowercased name with each whitespace run replaced by a dot.
pub fn email_for(name: &str) -> String {
    let local = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".");
    format!("{local}@{EMAIL_DOMAIN}")
}
