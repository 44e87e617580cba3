//! Typed JSON slices on top of a key-value backend.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::KeyValueBackend;
use crate::error::StoreError;

/// Reads and writes JSON-serialized values under named keys.
///
/// `load` never fails: a missing, unreadable or unparsable value comes back
/// as `None` and the caller falls back to its default. `save` overwrites
/// whatever was there (last write wins).
#[derive(Debug)]
pub struct PersistentStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> PersistentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load and parse a value, treating every failure as absence.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored value, using default");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored value is not valid JSON for its type, using default");
                None
            }
        }
    }

    /// Read the stored text as-is, for values written without JSON encoding.
    pub fn load_raw(&self, key: &str) -> Option<String> {
        match self.backend.read(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored value, using default");
                None
            }
        }
    }

    /// Serialize and overwrite a value.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.backend.write(key, &raw)?;
        debug!(key, bytes = raw.len(), "Saved value");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use compass_model::{
        Difficulty, InstallMode, LearningPath, MindMapNode, PathBlueprint, MilestoneBlueprint,
        PathLibrary, PracticeQuestion, ProjectIdea, SkillLevel, StudentProfile, StudentStage,
        StudyNotes, TaskBoard, ThemePreference, Weekday, Enrichment, SimplifiedMaterial,
    };

    fn store() -> PersistentStore<MemoryBackend> {
        PersistentStore::new(MemoryBackend::new())
    }

    fn enriched_path() -> LearningPath {
        let blueprint = PathBlueprint {
            subject: "Distributed Systems".to_string(),
            goal: "Distributed Systems Engineer".to_string(),
            milestones: vec![
                MilestoneBlueprint {
                    id: "m0".to_string(),
                    title: "Networking basics".to_string(),
                    description: "Sockets and latency".to_string(),
                    practical_actions: vec!["Write an echo server".to_string()],
                    preventive_advice: Some("Do not skip failure modes".to_string()),
                },
                MilestoneBlueprint {
                    id: "m1".to_string(),
                    title: "Replication".to_string(),
                    description: "Leaders and followers".to_string(),
                    practical_actions: vec![],
                    preventive_advice: None,
                },
            ],
        };
        let mut path = LearningPath::from_blueprint("path_1", blueprint, StudentStage::Junior);
        path.merge_enrichment(
            "m0",
            Enrichment::Notes(StudyNotes {
                title: "Reliable delivery".to_string(),
                content: "TCP retransmits".to_string(),
                concepts: vec!["RTT".to_string()],
            }),
        );
        path.merge_enrichment(
            "m0",
            Enrichment::MindMap(
                MindMapNode::leaf("Networking").with_child(MindMapNode::leaf("TCP")),
            ),
        );
        path.merge_enrichment(
            "m0",
            Enrichment::Exam(vec![PracticeQuestion {
                question: "What does RTT stand for?".to_string(),
                options: vec!["Round-trip time".to_string(), "Retry timer".to_string()],
                correct_answer: 0,
                explanation: "Round-trip time.".to_string(),
            }]),
        );
        path.merge_enrichment(
            "m1",
            Enrichment::Materials(SimplifiedMaterial {
                summary: "Copies of data on several machines".to_string(),
                key_points: vec!["Quorums".to_string()],
                analogy: Some("A choir singing the same song".to_string()),
            }),
        );
        path
    }

    #[test]
    fn test_round_trip_every_entity() {
        let store = store();

        let profile = StudentProfile {
            user_id: "user_k3j4h5g6f".to_string(),
            name: "Grace Hopper".to_string(),
            email: "grace.hopper@compass.ai".to_string(),
            stage: StudentStage::Senior,
            skill_level: SkillLevel::Advanced,
            primary_goal: "Compiler engineer".to_string(),
        };
        store.save("profile", &profile).unwrap();
        assert_eq!(store.load::<StudentProfile>("profile"), Some(profile));

        let mut library = PathLibrary::new();
        library.install(enriched_path(), InstallMode::Add);
        store.save("paths", &library.paths).unwrap();
        assert_eq!(store.load::<Vec<LearningPath>>("paths"), Some(library.paths.clone()));
        store.save("activePathId", &library.active_path_id).unwrap();
        assert_eq!(
            store.load::<Option<String>>("activePathId"),
            Some(Some("path_1".to_string()))
        );

        let mut tasks = TaskBoard::new();
        tasks.add(Weekday::Mon, 9, "Deep Work").unwrap();
        store.save("tasks", &tasks).unwrap();
        assert_eq!(store.load::<TaskBoard>("tasks"), Some(tasks));

        let ideas = vec![ProjectIdea {
            title: "Build a KV store".to_string(),
            description: "Log-structured".to_string(),
            difficulty: Difficulty::Intermediate,
            why_this: "Touches replication".to_string(),
        }];
        store.save("projectIdeas", &ideas).unwrap();
        assert_eq!(store.load::<Vec<ProjectIdea>>("projectIdeas"), Some(ideas));

        store.save("themePreference", &ThemePreference::Dark).unwrap();
        assert_eq!(store.load("themePreference"), Some(ThemePreference::Dark));

        store.save("sessionActive", &true).unwrap();
        assert_eq!(store.load::<bool>("sessionActive"), Some(true));
    }

    #[test]
    fn test_invalid_json_loads_as_none() {
        let store = store();
        store.backend().write("paths", "{not json").unwrap();
        assert_eq!(store.load::<Vec<LearningPath>>("paths"), None);

        // Valid JSON of the wrong shape is treated the same way
        store.backend().write("profile", "[1, 2, 3]").unwrap();
        assert_eq!(store.load::<StudentProfile>("profile"), None);
    }

    #[test]
    fn test_missing_key_loads_as_none() {
        assert_eq!(store().load::<bool>("sessionActive"), None);
    }

    #[test]
    fn test_save_overwrites() {
        let store = store();
        store.save("theme", &ThemePreference::Light).unwrap();
        store.save("theme", &ThemePreference::Dark).unwrap();
        assert_eq!(store.load("theme"), Some(ThemePreference::Dark));

        store.remove("theme").unwrap();
        assert_eq!(store.load::<ThemePreference>("theme"), None);
    }
}
