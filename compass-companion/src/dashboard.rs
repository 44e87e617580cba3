//! Progress summary for the dashboard.

use serde::{Deserialize, Serialize};

use compass_model::LearningPath;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub path_id: String,
    pub subject: String,
    pub completed: usize,
    pub total: usize,
    /// Whole-number percentage of completed milestones
    pub percent: u8,
    /// Title of the milestone in progress, `None` once the path is finished
    pub current_milestone: Option<String>,
}

impl ProgressSummary {
    pub fn from_path(path: &LearningPath) -> Self {
        let completed = path.completed_count();
        let total = path.milestones.len();
        let percent = if total == 0 {
            0
        } else {
            ((completed * 100) / total) as u8
        };

        Self {
            path_id: path.id.clone(),
            subject: path.subject.clone(),
            completed,
            total,
            percent,
            current_milestone: path.current_milestone().map(|m| m.title.clone()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_model::{MilestoneBlueprint, PathBlueprint, StudentStage};

    fn path(count: usize) -> LearningPath {
        let milestones = (0..count)
            .map(|i| MilestoneBlueprint {
                id: format!("m{i}"),
                title: format!("Step {i}"),
                description: String::new(),
                practical_actions: vec![],
                preventive_advice: None,
            })
            .collect();
        LearningPath::from_blueprint(
            "p1",
            PathBlueprint {
                subject: "Statistics".to_string(),
                goal: "Analyst".to_string(),
                milestones,
            },
            StudentStage::Senior,
        )
    }

    #[test]
    fn test_summary_tracks_completion() {
        let mut p = path(3);
        let summary = ProgressSummary::from_path(&p);
        assert_eq!((summary.completed, summary.total, summary.percent), (0, 3, 0));
        assert_eq!(summary.current_milestone.as_deref(), Some("Step 0"));

        p.complete_milestone("m0");
        let summary = ProgressSummary::from_path(&p);
        assert_eq!(summary.percent, 33);
        assert_eq!(summary.current_milestone.as_deref(), Some("Step 1"));

        p.complete_milestone("m1");
        p.complete_milestone("m2");
        let summary = ProgressSummary::from_path(&p);
        assert_eq!(summary.percent, 100);
        assert!(summary.is_finished());
        assert!(summary.current_milestone.is_none());
    }
}
