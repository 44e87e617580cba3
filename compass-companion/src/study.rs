//! Study arena step selection.

use serde::{Deserialize, Serialize};

use compass_model::{EnrichmentKind, Milestone};

/// Tab of the study arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StudyStep {
    Notes,
    MindMap,
    Exam,
}

impl StudyStep {
    /// The enrichment this step shows.
    pub fn kind(&self) -> EnrichmentKind {
        match self {
            StudyStep::Notes => EnrichmentKind::Notes,
            StudyStep::MindMap => EnrichmentKind::MindMap,
            StudyStep::Exam => EnrichmentKind::Exam,
        }
    }
}

/// Where to send the student next: notes first, then the mind map, then
/// the exam.
pub fn next_study_step(milestone: &Milestone) -> StudyStep {
    if !milestone.has_enrichment(EnrichmentKind::Notes) {
        StudyStep::Notes
    } else if !milestone.has_enrichment(EnrichmentKind::MindMap) {
        StudyStep::MindMap
    } else {
        StudyStep::Exam
    }
}
