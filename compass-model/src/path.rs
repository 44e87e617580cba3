//! Learning paths and their milestone sequence.
//!
//! Milestone order encodes prerequisites. The only transition that moves the
//! `current` marker is [`LearningPath::complete_milestone`], which keeps at
//! most one milestone `current` at any time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::enrichment::{
    Enrichment, EnrichmentKind, MindMapNode, PracticeQuestion, SimplifiedMaterial, StudyNotes,
};
use crate::profile::StudentStage;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Progress state of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    #[default]
    Locked,
    Current,
    Completed,
}

/// One step of a learning path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: MilestoneStatus,
    pub practical_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preventive_advice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<SimplifiedMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<StudyNotes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mind_map: Option<MindMapNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam: Option<Vec<PracticeQuestion>>,
}

impl Milestone {
    /// Whether the given enrichment field is populated.
    pub fn has_enrichment(&self, kind: EnrichmentKind) -> bool {
        match kind {
            EnrichmentKind::Materials => self.materials.is_some(),
            EnrichmentKind::Notes => self.notes.is_some(),
            EnrichmentKind::MindMap => self.mind_map.is_some(),
            EnrichmentKind::Exam => self.exam.is_some(),
        }
    }

    /// Replace one enrichment field. Status is left alone.
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        match enrichment {
            Enrichment::Materials(m) => self.materials = Some(m),
            Enrichment::Notes(n) => self.notes = Some(n),
            Enrichment::MindMap(m) => self.mind_map = Some(m),
            Enrichment::Exam(e) => self.exam = Some(e),
        }
    }
}

/// A milestone as returned by the roadmap generator, before the path
/// assigns status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneBlueprint {
    pub id: String,
    pub title: String,
    pub description: String,
    pub practical_actions: Vec<String>,
    #[serde(default)]
    pub preventive_advice: Option<String>,
}

/// A generated roadmap, before it becomes a [`LearningPath`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathBlueprint {
    pub subject: String,
    pub goal: String,
    pub milestones: Vec<MilestoneBlueprint>,
}

/// Structural problems in a generated roadmap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlueprintError {
    #[error("Roadmap has no milestones")]
    NoMilestones,

    #[error("Milestone {0} has an empty id")]
    EmptyMilestoneId(usize),

    #[error("Duplicate milestone id: {0}")]
    DuplicateMilestoneId(String),
}

impl PathBlueprint {
    /// Check the invariants a path relies on: at least one milestone and
    /// unique, non-empty milestone ids.
    pub fn validate(&self) -> Result<(), BlueprintError> {
        if self.milestones.is_empty() {
            return Err(BlueprintError::NoMilestones);
        }

        let mut seen = HashSet::new();
        for (index, milestone) in self.milestones.iter().enumerate() {
            if milestone.id.trim().is_empty() {
                return Err(BlueprintError::EmptyMilestoneId(index));
            }
            if !seen.insert(milestone.id.as_str()) {
                return Err(BlueprintError::DuplicateMilestoneId(milestone.id.clone()));
            }
        }

        Ok(())
    }
}

/// A roadmap the student is (or was) following.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: String,
    pub subject: String,
    pub goal: String,
    pub stage: StudentStage,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_archived: bool,
    pub milestones: Vec<Milestone>,
}

impl LearningPath {
    /// Build a path from a generated blueprint.
    ///
    /// The first milestone becomes `current`, every other one `locked`. The
    /// caller is expected to have run [`PathBlueprint::validate`].
    pub fn from_blueprint(
        id: impl Into<String>,
        blueprint: PathBlueprint,
        stage: StudentStage,
    ) -> Self {
        let milestones = blueprint
            .milestones
            .into_iter()
            .enumerate()
            .map(|(index, m)| Milestone {
                id: m.id,
                title: m.title,
                description: m.description,
                status: if index == 0 {
                    MilestoneStatus::Current
                } else {
                    MilestoneStatus::Locked
                },
                practical_actions: m.practical_actions,
                preventive_advice: m.preventive_advice,
                materials: None,
                notes: None,
                mind_map: None,
                exam: None,
            })
            .collect();

        Self {
            id: id.into(),
            subject: blueprint.subject,
            goal: blueprint.goal,
            stage,
            is_public: false,
            is_archived: false,
            milestones,
        }
    }

    /// Generate a fresh path identifier.
    pub fn new_id() -> String {
        format!("path_{}", uuid::Uuid::new_v4().simple())
    }

    pub fn milestone(&self, milestone_id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }

    /// The milestone the student is working on, if any.
    pub fn current_milestone(&self) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.status == MilestoneStatus::Current)
    }

    pub fn completed_count(&self) -> usize {
        self.milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .count()
    }

    /// Mark the current milestone completed and promote its successor.
    ///
    /// Only the `current` milestone can be completed: unknown ids and
    /// milestones that are `locked` or already `completed` are a no-op, so
    /// the single-`current` invariant holds for any call sequence. Nothing
    /// besides the target and its immediate successor is touched. Returns
    /// whether the path changed.
    pub fn complete_milestone(&mut self, milestone_id: &str) -> bool {
        let Some(index) = self.milestones.iter().position(|m| m.id == milestone_id) else {
            tracing::debug!(path_id = %self.id, milestone_id, "Unknown milestone, nothing to complete");
            return false;
        };

        if self.milestones[index].status != MilestoneStatus::Current {
            tracing::debug!(
                path_id = %self.id,
                milestone_id,
                status = ?self.milestones[index].status,
                "Milestone is not current, nothing to complete"
            );
            return false;
        }

        self.milestones[index].status = MilestoneStatus::Completed;
        if let Some(next) = self.milestones.get_mut(index + 1) {
            next.status = MilestoneStatus::Current;
        }

        tracing::info!(path_id = %self.id, milestone_id, "Milestone completed");
        true
    }

    /// Attach an enrichment to a milestone, replacing any previous value of
    /// the same kind. Returns `false` when the milestone does not exist.
    pub fn merge_enrichment(&mut self, milestone_id: &str, enrichment: Enrichment) -> bool {
        match self.milestones.iter_mut().find(|m| m.id == milestone_id) {
            Some(milestone) => {
                let kind = enrichment.kind();
                milestone.apply_enrichment(enrichment);
                tracing::debug!(
                    path_id = %self.id,
                    milestone_id,
                    field = kind.as_str(),
                    "Enrichment merged"
                );
                true
            }
            None => false,
        }
    }
}
