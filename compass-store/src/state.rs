//! The single application-state record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use compass_model::{
    LearningPath, PathLibrary, ProjectIdea, StudentProfile, TaskBoard, ThemePreference,
};

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Everything the companion persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub profile: Option<StudentProfile>,
    #[serde(default)]
    pub library: PathLibrary,
    #[serde(default)]
    pub tasks: TaskBoard,
    #[serde(default)]
    pub project_ideas: Vec<ProjectIdea>,
    #[serde(default)]
    pub theme: ThemePreference,
    #[serde(default)]
    pub session_active: bool,
}

impl AppState {
    /// The active learning path, if the reference resolves.
    pub fn current_path(&self) -> Option<&LearningPath> {
        self.library.active()
    }

    /// Restore cross-slice consistency after loading or mutating.
    pub fn repair(&mut self) -> bool {
        let dangling = self.library.repair_active();
        let dropped = self.tasks.retain_valid();
        dangling || dropped > 0
    }
}

/// Replacement values for some slices of [`AppState`]. `None` leaves a
/// slice untouched.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub profile: Option<Option<StudentProfile>>,
    pub library: Option<PathLibrary>,
    pub tasks: Option<TaskBoard>,
    pub project_ideas: Option<Vec<ProjectIdea>>,
    pub theme: Option<ThemePreference>,
    pub session_active: Option<bool>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(mut self, profile: Option<StudentProfile>) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn library(mut self, library: PathLibrary) -> Self {
        self.library = Some(library);
        self
    }

    pub fn tasks(mut self, tasks: TaskBoard) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn project_ideas(mut self, ideas: Vec<ProjectIdea>) -> Self {
        self.project_ideas = Some(ideas);
        self
    }

    pub fn theme(mut self, theme: ThemePreference) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn session_active(mut self, active: bool) -> Self {
        self.session_active = Some(active);
        self
    }

    /// Overwrite the named slices.
    pub fn apply(self, state: &mut AppState) {
        if let Some(profile) = self.profile {
            state.profile = profile;
        }
        if let Some(library) = self.library {
            state.library = library;
        }
        if let Some(tasks) = self.tasks {
            state.tasks = tasks;
        }
        if let Some(ideas) = self.project_ideas {
            state.project_ideas = ideas;
        }
        if let Some(theme) = self.theme {
            state.theme = theme;
        }
        if let Some(active) = self.session_active {
            state.session_active = active;
        }
    }
}

/// On-disk envelope around [`AppState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub state: AppState,
}

impl StateSnapshot {
    pub fn new(state: AppState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            state,
        }
    }
}
