//! Study material generated on demand for a milestone.
//!
//! Each kind is cached on the milestone once generated and only replaced
//! when the student explicitly regenerates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// A plain-language rewrite of the milestone topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedMaterial {
    pub summary: String,
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analogy: Option<String>,
}

/// Dense study notes with the concepts they cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StudyNotes {
    /// Heading shown above the notes
    pub title: String,
    pub content: String,
    pub concepts: Vec<String>,
}

/// Node of a concept map. The root is the milestone topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct MindMapNode {
    pub label: String,
    #[serde(default)]
    pub children: Vec<MindMapNode>,
}

impl MindMapNode {
    /// Create a leaf node.
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Add a child node.
    pub fn with_child(mut self, child: MindMapNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of levels including this node.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(MindMapNode::depth).max().unwrap_or(0)
    }

    /// Total node count including this node.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MindMapNode::node_count).sum::<usize>()
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    pub explanation: String,
}

impl PracticeQuestion {
    /// Whether `correct_answer` points at an existing option.
    pub fn is_well_formed(&self) -> bool {
        self.correct_answer < self.options.len()
    }
}

/// Which enrichment field of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub enum EnrichmentKind {
    Materials,
    Notes,
    MindMap,
    Exam,
}

impl EnrichmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentKind::Materials => "materials",
            EnrichmentKind::Notes => "notes",
            EnrichmentKind::MindMap => "mindMap",
            EnrichmentKind::Exam => "exam",
        }
    }
}

/// A generated enrichment value, tagged with the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Materials(SimplifiedMaterial),
    Notes(StudyNotes),
    MindMap(MindMapNode),
    Exam(Vec<PracticeQuestion>),
}

impl Enrichment {
    pub fn kind(&self) -> EnrichmentKind {
        match self {
            Enrichment::Materials(_) => EnrichmentKind::Materials,
            Enrichment::Notes(_) => EnrichmentKind::Notes,
            Enrichment::MindMap(_) => EnrichmentKind::MindMap,
            Enrichment::Exam(_) => EnrichmentKind::Exam,
        }
    }
}

/// Answers picked by the student for a practice exam, keyed by question index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamAttempt {
    answers: BTreeMap<usize, usize>,
    submitted: bool,
}

/// Result of a submitted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamScore {
    pub correct: usize,
    pub total: usize,
}

impl ExamScore {
    /// Whole-number percentage, 0 for an empty exam.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.correct * 100) / self.total) as u8
    }
}

impl ExamAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick an option. Ignored once the attempt is submitted.
    pub fn select(&mut self, question: usize, option: usize) -> bool {
        if self.submitted {
            return false;
        }
        self.answers.insert(question, option);
        true
    }

    pub fn selected(&self, question: usize) -> Option<usize> {
        self.answers.get(&question).copied()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Lock the answers and score them. Unanswered questions count as wrong.
    pub fn submit(&mut self, questions: &[PracticeQuestion]) -> ExamScore {
        self.submitted = true;
        let correct = questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.answers.get(i) == Some(&q.correct_answer))
            .count();

        ExamScore {
            correct,
            total: questions.len(),
        }
    }

    /// Clear answers for a fresh attempt.
    pub fn reset(&mut self) {
        self.answers.clear();
        self.submitted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: usize) -> PracticeQuestion {
        PracticeQuestion {
            question: "Which consensus protocol uses leader election?".to_string(),
            options: vec!["Raft".into(), "CRDT".into(), "Gossip".into()],
            correct_answer: correct,
            explanation: "Raft elects a leader per term.".to_string(),
        }
    }

    #[test]
    fn test_mind_map_shape() {
        let map = MindMapNode::leaf("Consensus")
            .with_child(MindMapNode::leaf("Raft").with_child(MindMapNode::leaf("Terms")))
            .with_child(MindMapNode::leaf("Paxos"));

        assert_eq!(map.depth(), 3);
        assert_eq!(map.node_count(), 4);
    }

    #[test]
    fn test_mind_map_children_default_to_empty() {
        let node: MindMapNode = serde_json::from_str(r#"{"label":"Leaf"}"#).unwrap();
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_exam_scoring() {
        let questions = vec![question(0), question(2), question(1)];
        let mut attempt = ExamAttempt::new();
        attempt.select(0, 0);
        attempt.select(1, 1);

        let score = attempt.submit(&questions);
        assert_eq!(score, ExamScore { correct: 1, total: 3 });
        assert_eq!(score.percent(), 33);

        // Locked after submission
        assert!(!attempt.select(2, 1));
        assert_eq!(attempt.selected(2), None);

        attempt.reset();
        assert!(!attempt.is_submitted());
        assert!(attempt.select(2, 1));
    }

    #[test]
    fn test_question_well_formed() {
        assert!(question(2).is_well_formed());
        assert!(!question(3).is_well_formed());
    }

    #[test]
    fn test_material_wire_names() {
        let material = SimplifiedMaterial {
            summary: "Replication keeps copies in sync.".to_string(),
            key_points: vec!["Leaders".into()],
            analogy: None,
        };
        let json = serde_json::to_value(&material).unwrap();
        assert!(json.get("keyPoints").is_some());
        assert!(json.get("analogy").is_none());
    }
}
