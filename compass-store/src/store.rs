//! State store: one owner for [`AppState`], one write per transaction.

use compass_model::{LearningPath, PathLibrary, ProjectIdea, StudentProfile, TaskBoard, ThemePreference};
use tracing::{debug, info, warn};

use crate::adapter::PersistentStore;
use crate::backend::KeyValueBackend;
use crate::error::StoreError;
use crate::keys::StateKey;
use crate::state::{AppState, StatePatch, StateSnapshot, SNAPSHOT_VERSION};

/// Owns the in-memory [`AppState`] and writes it through to durable storage
/// after every mutation.
///
/// The whole state is serialized as a single snapshot value, so there is no
/// window in which one slice is saved and another is not.
pub struct StateStore<B> {
    persistent: PersistentStore<B>,
    state: AppState,
}

impl<B: KeyValueBackend> StateStore<B> {
    /// Load state from a backend.
    pub fn open(backend: B) -> Self {
        Self::hydrate(PersistentStore::new(backend))
    }

    /// Load state from durable storage.
    ///
    /// Reads the snapshot when present. Otherwise assembles state from the
    /// per-slice keys older clients wrote, saves it as a snapshot and drops
    /// the old keys. Missing or unparsable slices fall back to defaults, and
    /// a dangling active path id is cleared.
    pub fn hydrate(persistent: PersistentStore<B>) -> Self {
        let snapshot: Option<StateSnapshot> = persistent.load(StateKey::Snapshot.as_str());

        let mut store = match snapshot {
            Some(snapshot) => {
                if snapshot.version > SNAPSHOT_VERSION {
                    warn!(
                        version = snapshot.version,
                        supported = SNAPSHOT_VERSION,
                        "Snapshot written by a newer client, reading what we understand"
                    );
                }
                debug!(saved_at = %snapshot.saved_at, "Hydrated from snapshot");
                Self {
                    persistent,
                    state: snapshot.state,
                }
            }
            None => {
                let state = load_legacy(&persistent);
                let mut store = Self { persistent, state };
                if store.has_legacy_data() {
                    store.migrate_legacy();
                }
                store
            }
        };

        if store.state.repair() {
            info!("Repaired stored state during hydrate");
        }
        store
    }

    /// Current state.
    pub fn get(&self) -> &AppState {
        &self.state
    }

    /// Replace some slices and persist.
    pub fn set(&mut self, patch: StatePatch) -> Result<(), StoreError> {
        self.update(|state| patch.apply(state))
    }

    /// Mutate state in place and persist.
    ///
    /// When the write fails the in-memory state is rolled back, so memory
    /// never runs ahead of storage.
    pub fn update<R>(&mut self, mutate: impl FnOnce(&mut AppState) -> R) -> Result<R, StoreError> {
        let previous = self.state.clone();
        let result = mutate(&mut self.state);
        self.state.repair();
        if let Err(e) = self.persist() {
            warn!(error = %e, "State write failed, rolling back");
            self.state = previous;
            return Err(e);
        }
        Ok(result)
    }

    /// Write the full state as one snapshot.
    pub fn persist(&self) -> Result<(), StoreError> {
        let snapshot = StateSnapshot::new(self.state.clone());
        self.persistent.save(StateKey::Snapshot.as_str(), &snapshot)
    }

    /// Drop all state, in memory and on disk.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.state = AppState::default();
        self.persistent.remove(StateKey::Snapshot.as_str())?;
        for key in StateKey::LEGACY {
            self.persistent.remove(key.as_str())?;
        }
        info!("Cleared all stored state");
        Ok(())
    }

    pub fn persistent(&self) -> &PersistentStore<B> {
        &self.persistent
    }

    fn has_legacy_data(&self) -> bool {
        StateKey::LEGACY
            .iter()
            .any(|key| self.persistent.load_raw(key.as_str()).is_some())
    }

    fn migrate_legacy(&mut self) {
        self.state.repair();
        match self.persist() {
            Ok(()) => {
                for key in StateKey::LEGACY {
                    if let Err(e) = self.persistent.remove(key.as_str()) {
                        warn!(key = %key, error = %e, "Failed to remove migrated key");
                    }
                }
                info!("Migrated per-slice state into a snapshot");
            }
            Err(e) => {
                warn!(error = %e, "Failed to write migrated snapshot, keeping per-slice keys");
            }
        }
    }
}

/// Assemble state from the per-slice layout.
///
/// Older clients wrote the active path id, theme and session flag as bare
/// strings rather than JSON, so those are read raw.
fn load_legacy<B: KeyValueBackend>(persistent: &PersistentStore<B>) -> AppState {
    let profile: Option<StudentProfile> = persistent.load(StateKey::Profile.as_str());
    let paths: Vec<LearningPath> = persistent
        .load(StateKey::Paths.as_str())
        .unwrap_or_default();
    let active_path_id = persistent
        .load_raw(StateKey::ActivePathId.as_str())
        .map(|raw| unquote(&raw))
        .filter(|id| !id.is_empty() && id != "null");
    let tasks: TaskBoard = persistent
        .load(StateKey::Tasks.as_str())
        .unwrap_or_default();
    let project_ideas: Vec<ProjectIdea> = persistent
        .load(StateKey::ProjectIdeas.as_str())
        .unwrap_or_default();
    let theme = match persistent
        .load_raw(StateKey::Theme.as_str())
        .map(|raw| unquote(&raw))
        .as_deref()
    {
        Some("dark") => ThemePreference::Dark,
        _ => ThemePreference::Light,
    };
    let session_active = persistent
        .load_raw(StateKey::SessionActive.as_str())
        .map(|raw| unquote(&raw) == "true")
        .unwrap_or(false);

    AppState {
        profile,
        library: PathLibrary::from_parts(paths, active_path_id),
        tasks,
        project_ideas,
        theme,
        session_active,
    }
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use compass_model::{
        InstallMode, MilestoneBlueprint, PathBlueprint, StudentStage, Task, Weekday,
    };
    use std::sync::Arc;

    fn path(id: &str) -> LearningPath {
        LearningPath::from_blueprint(
            id,
            PathBlueprint {
                subject: "Rust".to_string(),
                goal: "Systems programmer".to_string(),
                milestones: vec![
                    MilestoneBlueprint {
                        id: "m0".to_string(),
                        title: "Ownership".to_string(),
                        description: "Moves and borrows".to_string(),
                        practical_actions: vec![],
                        preventive_advice: None,
                    },
                    MilestoneBlueprint {
                        id: "m1".to_string(),
                        title: "Traits".to_string(),
                        description: "Generics".to_string(),
                        practical_actions: vec![],
                        preventive_advice: None,
                    },
                ],
            },
            StudentStage::Sophomore,
        )
    }

    #[test]
    fn test_write_through_survives_reload() {
        let backend = Arc::new(MemoryBackend::new());

        let mut store = StateStore::open(backend.clone());
        store
            .update(|state| {
                state.library.install(path("p1"), InstallMode::Add);
                state.library.complete_milestone("p1", "m0");
                state.tasks.add(Weekday::Mon, 9, "Deep Work").unwrap();
                state.session_active = true;
            })
            .unwrap();

        let reloaded = StateStore::open(backend);
        assert_eq!(reloaded.get(), store.get());
        assert_eq!(
            reloaded.get().current_path().unwrap().current_milestone().unwrap().id,
            "m1"
        );
    }

    #[test]
    fn test_single_key_per_transaction() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = StateStore::open(backend.clone());
        store
            .set(StatePatch::new().theme(ThemePreference::Dark).session_active(true))
            .unwrap();

        assert_eq!(backend.len(), 1);
        assert!(backend.read(StateKey::Snapshot.as_str()).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_default() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .write(StateKey::Snapshot.as_str(), "{\"version\": 2, \"state\": ")
            .unwrap();

        let store = StateStore::open(backend);
        assert_eq!(store.get(), &AppState::default());
    }

    #[test]
    fn test_dangling_active_id_cleared_on_hydrate() {
        let backend = Arc::new(MemoryBackend::new());
        let mut state = AppState::default();
        state.library.paths.push(path("p1"));
        state.library.active_path_id = Some("p-missing".to_string());
        PersistentStore::new(backend.clone())
            .save(StateKey::Snapshot.as_str(), &StateSnapshot::new(state))
            .unwrap();

        let store = StateStore::open(backend);
        assert!(store.get().library.active_path_id.is_none());
        assert!(store.get().current_path().is_none());
        assert_eq!(store.get().library.len(), 1);
    }

    #[test]
    fn test_inverted_task_dropped_on_hydrate() {
        let backend = Arc::new(MemoryBackend::new());
        let block = |id: &str, start: u8, end: u8| Task {
            id: id.to_string(),
            day: Weekday::Wed,
            start,
            end,
            title: "Lab".to_string(),
            color: "sky".to_string(),
            notified: false,
            reminder_active: false,
        };
        let mut state = AppState::default();
        state.tasks = serde_json::from_value(serde_json::json!([
            block("inverted", 11, 9),
            block("late", 23, 26),
            block("fine", 9, 11),
        ]))
        .unwrap();
        PersistentStore::new(backend.clone())
            .save(StateKey::Snapshot.as_str(), &StateSnapshot::new(state))
            .unwrap();

        let store = StateStore::open(backend);
        let tasks = store.get().tasks.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "fine");
        assert_eq!(tasks[0].duration_hours(), 2);
    }

    #[test]
    fn test_legacy_keys_are_migrated() {
        let backend = Arc::new(MemoryBackend::new());
        let legacy = PersistentStore::new(backend.clone());
        legacy
            .save(StateKey::Paths.as_str(), &vec![path("p1"), path("p2")])
            .unwrap();
        // Older clients stored these three as bare strings
        backend.write(StateKey::ActivePathId.as_str(), "p2").unwrap();
        backend.write(StateKey::Theme.as_str(), "dark").unwrap();
        backend.write(StateKey::SessionActive.as_str(), "true").unwrap();
        backend.write(StateKey::Tasks.as_str(), "corrupt[").unwrap();

        let store = StateStore::open(backend.clone());
        let state = store.get();
        assert_eq!(state.library.len(), 2);
        assert_eq!(state.current_path().unwrap().id, "p2");
        assert_eq!(state.theme, ThemePreference::Dark);
        assert!(state.session_active);
        assert!(state.tasks.is_empty());

        // Old keys are gone, snapshot holds everything
        assert_eq!(backend.len(), 1);
        let reloaded = StateStore::open(backend);
        assert_eq!(reloaded.get(), store.get());
    }

    #[test]
    fn test_empty_backend_writes_nothing_on_open() {
        let backend = Arc::new(MemoryBackend::new());
        let store = StateStore::open(backend.clone());
        assert_eq!(store.get(), &AppState::default());
        assert!(backend.is_empty());
    }

    /// Accepts reads, refuses writes.
    struct ReadOnlyBackend(MemoryBackend);

    impl KeyValueBackend for ReadOnlyBackend {
        fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.read(key)
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.0.remove(key)
        }
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut store = StateStore::open(ReadOnlyBackend(MemoryBackend::new()));

        let err = store.update(|state| {
            state.library.install(path("p1"), InstallMode::Add);
            state.session_active = true;
        });
        assert!(matches!(err, Err(StoreError::Io(_))));
        assert_eq!(store.get(), &AppState::default());

        assert!(store
            .set(StatePatch::new().theme(ThemePreference::Dark))
            .is_err());
        assert_eq!(store.get().theme, ThemePreference::Light);
    }

    #[test]
    fn test_clear() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = StateStore::open(backend.clone());
        store.set(StatePatch::new().session_active(true)).unwrap();

        store.clear().unwrap();
        assert!(backend.is_empty());
        assert!(!store.get().session_active);
    }
}
