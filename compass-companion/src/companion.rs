//! The companion: durable state plus the AI gateway behind one API.
//!
//! Every operation either completes and persists in a single store
//! transaction, or fails and leaves state as it was. Generation always runs
//! before the store is touched, so a failed or partial reply is never
//! cached.

use tracing::{debug, info};

use compass_agent::{AiGateway, ImageInput, MediaPayload};
use compass_model::{
    Enrichment, EnrichmentKind, InstallMode, LearningPath, Milestone, ProjectIdea,
    StudentProfile, Task, ThemePreference, Weekday,
};
use compass_store::{AppState, KeyValueBackend, StatePatch, StateStore};

use crate::dashboard::ProgressSummary;
use crate::error::CompanionError;
use crate::mentor::MentorSession;
use crate::onboarding::OnboardingForm;
use crate::study::{next_study_step, StudyStep};

pub struct Companion<B> {
    store: StateStore<B>,
    gateway: AiGateway,
}

impl<B: KeyValueBackend> Companion<B> {
    pub fn new(store: StateStore<B>, gateway: AiGateway) -> Self {
        Self { store, gateway }
    }

    pub fn state(&self) -> &AppState {
        self.store.get()
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    pub fn profile(&self) -> Option<&StudentProfile> {
        self.store.get().profile.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        let state = self.store.get();
        state.session_active && state.profile.is_some()
    }

    fn require_profile(&self) -> Result<StudentProfile, CompanionError> {
        self.profile().cloned().ok_or(CompanionError::NoProfile)
    }

    fn require_active_path(&self) -> Result<&LearningPath, CompanionError> {
        self.store
            .get()
            .current_path()
            .ok_or(CompanionError::NoActivePath)
    }

    // -- Onboarding and session --

    /// Create the profile and its first path, generated from the goal.
    ///
    /// Replaces any existing library. Nothing is stored when generation
    /// fails.
    pub async fn complete_onboarding(
        &mut self,
        form: &OnboardingForm,
    ) -> Result<&StudentProfile, CompanionError> {
        let profile = form.to_profile()?;
        let path = self
            .gateway
            .generate_learning_path(&profile.primary_goal, &profile)
            .await?;

        info!(user_id = %profile.user_id, path_id = %path.id, "Onboarding complete");
        self.store.update(move |state| {
            state.library.install(path, InstallMode::HardReset);
            state.profile = Some(profile);
            state.project_ideas.clear();
            state.session_active = true;
        })?;
        self.profile().ok_or(CompanionError::NoProfile)
    }

    /// Open a session for the stored profile.
    pub fn sign_in(&mut self) -> Result<(), CompanionError> {
        self.require_profile()?;
        self.store.set(StatePatch::new().session_active(true))?;
        Ok(())
    }

    /// Close the session. The profile and paths stay.
    pub fn sign_out(&mut self) -> Result<(), CompanionError> {
        self.store.set(StatePatch::new().session_active(false))?;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<ThemePreference, CompanionError> {
        let theme = self.store.get().theme.toggled();
        self.store.set(StatePatch::new().theme(theme))?;
        Ok(theme)
    }

    // -- Path library --

    /// Generate a new path for `subject` and make it active.
    pub async fn create_path(
        &mut self,
        subject: &str,
        mode: InstallMode,
    ) -> Result<String, CompanionError> {
        let profile = self.require_profile()?;
        let path = self.gateway.generate_learning_path(subject, &profile).await?;
        let path_id = path.id.clone();
        self.store
            .update(move |state| state.library.install(path, mode))?;
        Ok(path_id)
    }

    pub fn set_active_path(&mut self, path_id: &str) -> Result<(), CompanionError> {
        self.update_path(path_id, |state| state.library.set_active(path_id))
    }

    pub fn archive_path(&mut self, path_id: &str, archived: bool) -> Result<(), CompanionError> {
        self.update_path(path_id, |state| state.library.set_archived(path_id, archived))
    }

    pub fn set_path_public(&mut self, path_id: &str, public: bool) -> Result<(), CompanionError> {
        self.update_path(path_id, |state| state.library.set_public(path_id, public))
    }

    pub fn delete_path(&mut self, path_id: &str) -> Result<LearningPath, CompanionError> {
        if self.store.get().library.get(path_id).is_none() {
            return Err(CompanionError::UnknownPath(path_id.to_string()));
        }
        self.store
            .update(|state| state.library.remove(path_id))?
            .ok_or_else(|| CompanionError::UnknownPath(path_id.to_string()))
    }

    fn update_path(
        &mut self,
        path_id: &str,
        mutate: impl FnOnce(&mut AppState) -> bool,
    ) -> Result<(), CompanionError> {
        if self.store.get().library.get(path_id).is_none() {
            return Err(CompanionError::UnknownPath(path_id.to_string()));
        }
        self.store.update(mutate)?;
        Ok(())
    }

    // -- Milestones and study arena --

    pub fn current_milestone(&self) -> Option<&Milestone> {
        self.store.get().current_path()?.current_milestone()
    }

    /// Complete the active path's current milestone and unlock the next.
    ///
    /// Returns the id of the milestone that was completed.
    pub fn complete_current_milestone(&mut self) -> Result<String, CompanionError> {
        let path = self.require_active_path()?;
        let path_id = path.id.clone();
        let milestone_id = path
            .current_milestone()
            .ok_or(CompanionError::NoCurrentMilestone)?
            .id
            .clone();

        self.store
            .update(|state| state.library.complete_milestone(&path_id, &milestone_id))?;
        info!(path_id = %path_id, milestone_id = %milestone_id, "Milestone completed");
        Ok(milestone_id)
    }

    /// Complete a milestone by id. Only a `current` milestone changes;
    /// anything else returns `false` and leaves the path untouched.
    pub fn complete_milestone(
        &mut self,
        path_id: &str,
        milestone_id: &str,
    ) -> Result<bool, CompanionError> {
        let path = self
            .store
            .get()
            .library
            .get(path_id)
            .ok_or_else(|| CompanionError::UnknownPath(path_id.to_string()))?;
        if path.milestone(milestone_id).is_none() {
            return Ok(false);
        }
        Ok(self
            .store
            .update(|state| state.library.complete_milestone(path_id, milestone_id))?)
    }

    pub fn next_study_step(&self) -> Result<StudyStep, CompanionError> {
        self.require_active_path()?;
        self.current_milestone()
            .map(next_study_step)
            .ok_or(CompanionError::NoCurrentMilestone)
    }

    /// Generate one enrichment for the current milestone and cache it.
    ///
    /// An existing value of the same kind is replaced only on success.
    pub async fn enrich_current(
        &mut self,
        kind: EnrichmentKind,
    ) -> Result<Enrichment, CompanionError> {
        let profile = self.require_profile()?;
        let path = self.require_active_path()?;
        let path_id = path.id.clone();
        let milestone = path
            .current_milestone()
            .ok_or(CompanionError::NoCurrentMilestone)?;
        let milestone_id = milestone.id.clone();
        let topic = milestone.title.clone();

        debug!(path_id = %path_id, milestone_id = %milestone_id, kind = kind.as_str(), "Generating enrichment");
        let enrichment = match kind {
            EnrichmentKind::Materials => {
                Enrichment::Materials(self.gateway.simplify_material(&topic, &profile).await?)
            }
            EnrichmentKind::Notes => {
                Enrichment::Notes(self.gateway.generate_notes(&topic, &profile).await?)
            }
            EnrichmentKind::MindMap => {
                Enrichment::MindMap(self.gateway.generate_mind_map(&topic).await?)
            }
            EnrichmentKind::Exam => {
                Enrichment::Exam(self.gateway.generate_practice_exam(&topic).await?)
            }
        };

        let cached = enrichment.clone();
        let merged = self.store.update(|state| {
            state
                .library
                .merge_enrichment(&path_id, &milestone_id, cached)
        })?;
        if !merged {
            return Err(CompanionError::UnknownPath(path_id));
        }
        info!(milestone_id = %milestone_id, kind = kind.as_str(), "Enrichment cached");
        Ok(enrichment)
    }

    // -- Project lab --

    /// Replace the project ideas with a fresh set for the active path.
    pub async fn generate_project_ideas(&mut self) -> Result<&[ProjectIdea], CompanionError> {
        let profile = self.require_profile()?;
        let subject = self.require_active_path()?.subject.clone();

        let ideas = self.gateway.generate_project_ideas(&profile, &subject).await?;
        info!(subject = %subject, ideas = ideas.len(), "Project ideas generated");
        self.store.set(StatePatch::new().project_ideas(ideas))?;
        Ok(self.store.get().project_ideas.as_slice())
    }

    pub fn clear_project_ideas(&mut self) -> Result<(), CompanionError> {
        self.store.set(StatePatch::new().project_ideas(Vec::new()))?;
        Ok(())
    }

    // -- Planner --

    /// Schedule a block of the default length.
    pub fn add_task(
        &mut self,
        day: Weekday,
        start: u8,
        title: &str,
    ) -> Result<Task, CompanionError> {
        let mut tasks = self.store.get().tasks.clone();
        let task = tasks.add(day, start, title)?.clone();
        self.store.set(StatePatch::new().tasks(tasks))?;
        Ok(task)
    }

    pub fn add_task_block(
        &mut self,
        day: Weekday,
        start: u8,
        end: u8,
        title: &str,
    ) -> Result<Task, CompanionError> {
        let mut tasks = self.store.get().tasks.clone();
        let task = tasks.add_block(day, start, end, title)?.clone();
        self.store.set(StatePatch::new().tasks(tasks))?;
        Ok(task)
    }

    pub fn remove_task(&mut self, task_id: &str) -> Result<Option<Task>, CompanionError> {
        if self.store.get().tasks.get(task_id).is_none() {
            return Ok(None);
        }
        Ok(self.store.update(|state| state.tasks.remove(task_id))?)
    }

    /// Flip a block's reminder. `None` for an unknown id.
    pub fn toggle_reminder(&mut self, task_id: &str) -> Result<Option<bool>, CompanionError> {
        if self.store.get().tasks.get(task_id).is_none() {
            return Ok(None);
        }
        Ok(self.store.update(|state| state.tasks.toggle_reminder(task_id))?)
    }

    pub fn mark_notified(&mut self, task_id: &str) -> Result<bool, CompanionError> {
        if self.store.get().tasks.get(task_id).is_none() {
            return Ok(false);
        }
        Ok(self.store.update(|state| state.tasks.mark_notified(task_id))?)
    }

    // -- Dashboard and mentor --

    pub fn progress(&self) -> Option<ProgressSummary> {
        self.store.get().current_path().map(ProgressSummary::from_path)
    }

    /// A new mentor conversation opened with the welcome message.
    pub fn mentor_session(&self) -> Result<MentorSession, CompanionError> {
        self.profile()
            .map(MentorSession::new)
            .ok_or(CompanionError::NoProfile)
    }

    pub async fn ask_mentor(
        &self,
        session: &mut MentorSession,
        message: &str,
        image: Option<ImageInput>,
        deep_reasoning: bool,
    ) -> Result<String, CompanionError> {
        let profile = self.require_profile()?;
        session
            .send(&self.gateway, &profile, message, image, deep_reasoning)
            .await
    }

    // -- Media --

    pub async fn synthesize_speech(&self, text: &str) -> Result<MediaPayload, CompanionError> {
        Ok(self.gateway.synthesize_speech(text).await?)
    }

    pub async fn generate_vision_image(
        &self,
        prompt: &str,
        aspect_ratio: &str,
    ) -> Result<MediaPayload, CompanionError> {
        Ok(self.gateway.generate_vision_image(prompt, aspect_ratio).await?)
    }

    /// Forget everything: profile, paths, tasks, ideas and preferences.
    pub fn reset(&mut self) -> Result<(), CompanionError> {
        self.store.clear()?;
        info!("Companion reset");
        Ok(())
    }
}

impl<B> std::fmt::Debug for Companion<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Companion")
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
