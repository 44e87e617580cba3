//! The set of learning paths a student owns, and which one is active.

use serde::{Deserialize, Serialize};

use crate::enrichment::Enrichment;
use crate::path::LearningPath;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// How a freshly generated path joins the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub enum InstallMode {
    /// Keep existing paths untouched and append.
    #[default]
    Add,
    /// Archive every existing path, then append.
    ArchiveReplace,
    /// Drop every existing path.
    HardReset,
}

/// Ordered collection of paths plus the active path reference.
///
/// `active_path_id` is either `None` or the id of a path in `paths`. A
/// dangling id (possible after a partial write by an older client) is
/// cleared by [`PathLibrary::repair_active`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PathLibrary {
    pub paths: Vec<LearningPath>,
    pub active_path_id: Option<String>,
}

impl PathLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from independently stored slices, repairing the active id.
    pub fn from_parts(paths: Vec<LearningPath>, active_path_id: Option<String>) -> Self {
        let mut library = Self {
            paths,
            active_path_id,
        };
        library.repair_active();
        library
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, path_id: &str) -> Option<&LearningPath> {
        self.paths.iter().find(|p| p.id == path_id)
    }

    pub fn get_mut(&mut self, path_id: &str) -> Option<&mut LearningPath> {
        self.paths.iter_mut().find(|p| p.id == path_id)
    }

    /// The active path. A dangling active id resolves to `None`.
    pub fn active(&self) -> Option<&LearningPath> {
        self.active_path_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut LearningPath> {
        let id = self.active_path_id.clone()?;
        self.get_mut(&id)
    }

    /// Paths that are not archived.
    pub fn unarchived(&self) -> impl Iterator<Item = &LearningPath> {
        self.paths.iter().filter(|p| !p.is_archived)
    }

    /// Add a generated path and make it active.
    pub fn install(&mut self, path: LearningPath, mode: InstallMode) {
        match mode {
            InstallMode::Add => {}
            InstallMode::ArchiveReplace => {
                for existing in &mut self.paths {
                    existing.is_archived = true;
                }
            }
            InstallMode::HardReset => self.paths.clear(),
        }

        tracing::info!(path_id = %path.id, subject = %path.subject, ?mode, "Installing learning path");
        self.active_path_id = Some(path.id.clone());
        self.paths.push(path);
    }

    /// Switch the active path. Unknown ids are rejected.
    pub fn set_active(&mut self, path_id: &str) -> bool {
        if self.get(path_id).is_none() {
            return false;
        }
        self.active_path_id = Some(path_id.to_string());
        true
    }

    /// Set the archive flag. The path stays in the library.
    pub fn set_archived(&mut self, path_id: &str, archived: bool) -> bool {
        match self.get_mut(path_id) {
            Some(path) => {
                path.is_archived = archived;
                true
            }
            None => false,
        }
    }

    pub fn set_public(&mut self, path_id: &str, public: bool) -> bool {
        match self.get_mut(path_id) {
            Some(path) => {
                path.is_public = public;
                true
            }
            None => false,
        }
    }

    /// Delete a path. Clears the active id when it pointed at it.
    pub fn remove(&mut self, path_id: &str) -> Option<LearningPath> {
        let index = self.paths.iter().position(|p| p.id == path_id)?;
        let removed = self.paths.remove(index);
        if self.active_path_id.as_deref() == Some(path_id) {
            self.active_path_id = None;
        }
        Some(removed)
    }

    /// Clear an active id that no longer matches any path.
    ///
    /// Returns `true` when a repair was needed.
    pub fn repair_active(&mut self) -> bool {
        let dangling = matches!(&self.active_path_id, Some(id) if self.get(id).is_none());
        if dangling {
            tracing::debug!(active_path_id = ?self.active_path_id, "Dropping dangling active path id");
            self.active_path_id = None;
        }
        dangling
    }

    /// Complete a milestone on the given path.
    pub fn complete_milestone(&mut self, path_id: &str, milestone_id: &str) -> bool {
        self.get_mut(path_id)
            .map(|p| p.complete_milestone(milestone_id))
            .unwrap_or(false)
    }

    /// Attach an enrichment to a milestone on the given path.
    pub fn merge_enrichment(
        &mut self,
        path_id: &str,
        milestone_id: &str,
        enrichment: Enrichment,
    ) -> bool {
        self.get_mut(path_id)
            .map(|p| p.merge_enrichment(milestone_id, enrichment))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::tests::path;

    fn library_ab() -> PathLibrary {
        let mut library = PathLibrary::new();
        library.install(path("A", 2), InstallMode::Add);
        library.install(path("B", 2), InstallMode::Add);
        library
    }

    fn summary(library: &PathLibrary) -> Vec<(String, bool)> {
        library
            .paths
            .iter()
            .map(|p| (p.id.clone(), p.is_archived))
            .collect()
    }

    #[test]
    fn test_archive_replace() {
        let mut library = library_ab();
        library.install(path("C", 2), InstallMode::ArchiveReplace);

        assert_eq!(
            summary(&library),
            vec![
                ("A".to_string(), true),
                ("B".to_string(), true),
                ("C".to_string(), false)
            ]
        );
        assert_eq!(library.active().unwrap().id, "C");
    }

    #[test]
    fn test_hard_reset() {
        let mut library = library_ab();
        library.install(path("C", 2), InstallMode::HardReset);

        assert_eq!(summary(&library), vec![("C".to_string(), false)]);
        assert_eq!(library.active_path_id.as_deref(), Some("C"));
    }

    #[test]
    fn test_add_keeps_archive_flags() {
        let mut library = library_ab();
        library.set_archived("A", true);
        library.install(path("C", 2), InstallMode::Add);

        assert_eq!(
            summary(&library),
            vec![
                ("A".to_string(), true),
                ("B".to_string(), false),
                ("C".to_string(), false)
            ]
        );
        assert_eq!(library.active().unwrap().id, "C");
    }

    #[test]
    fn test_dangling_active_is_repaired() {
        let library = PathLibrary::from_parts(vec![path("A", 1)], Some("ghost".to_string()));
        assert!(library.active_path_id.is_none());
        assert!(library.active().is_none());

        let library = PathLibrary::from_parts(vec![path("A", 1)], Some("A".to_string()));
        assert_eq!(library.active().unwrap().id, "A");
    }

    #[test]
    fn test_remove_active_clears_reference() {
        let mut library = library_ab();
        assert!(library.remove("B").is_some());
        assert!(library.active_path_id.is_none());
        assert!(library.remove("B").is_none());
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_set_active_rejects_unknown() {
        let mut library = library_ab();
        assert!(!library.set_active("Z"));
        assert!(library.set_active("A"));
        assert_eq!(library.active().unwrap().id, "A");
    }

    #[test]
    fn test_complete_through_library() {
        let mut library = library_ab();
        assert!(library.complete_milestone("A", "m0"));
        assert!(!library.complete_milestone("Z", "m0"));
        assert_eq!(library.get("A").unwrap().completed_count(), 1);
        assert_eq!(library.get("B").unwrap().completed_count(), 0);
    }
}
