//! Names of the durable keys.

/// A durable key.
///
/// The per-slice keys are the layout older clients wrote, one key per
/// slice. Current state lives in a single [`StateKey::Snapshot`] value so a
/// transaction is one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Profile,
    Paths,
    ActivePathId,
    Tasks,
    ProjectIdeas,
    Theme,
    SessionActive,
    Snapshot,
}

impl StateKey {
    /// The per-slice keys, in the order older clients wrote them.
    pub const LEGACY: [StateKey; 7] = [
        StateKey::Profile,
        StateKey::Paths,
        StateKey::ActivePathId,
        StateKey::SessionActive,
        StateKey::Tasks,
        StateKey::ProjectIdeas,
        StateKey::Theme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Profile => "compass_profile_v1",
            StateKey::Paths => "compass_paths_v1",
            StateKey::ActivePathId => "compass_active_id",
            StateKey::Tasks => "compass_tasks_v1",
            StateKey::ProjectIdeas => "compass_lab_ideas_v1",
            StateKey::Theme => "compass_theme",
            StateKey::SessionActive => "compass_session",
            StateKey::Snapshot => "compass_state_v2",
        }
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
