//! Focus timer ("monk mode"): a single countdown session.
//!
//! The timer holds no clock. The shell calls [`FocusTimer::tick`] with the
//! seconds that elapsed.

/// Length of one focus session.
pub const FOCUS_SESSION_SECS: u32 = 25 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    duration_secs: u32,
    remaining_secs: u32,
    state: FocusState,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(FOCUS_SESSION_SECS)
    }
}

impl FocusTimer {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            state: FocusState::Idle,
        }
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Session is on screen (running or paused).
    pub fn is_active(&self) -> bool {
        matches!(self.state, FocusState::Running | FocusState::Paused)
    }

    /// Start a fresh session from the full duration.
    pub fn start(&mut self) {
        self.remaining_secs = self.duration_secs;
        self.state = FocusState::Running;
        tracing::debug!(duration_secs = self.duration_secs, "Focus session started");
    }

    pub fn pause(&mut self) {
        if self.state == FocusState::Running {
            self.state = FocusState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == FocusState::Paused {
            self.state = FocusState::Running;
        }
    }

    /// Abandon the session and reset the clock.
    pub fn stop(&mut self) {
        self.state = FocusState::Idle;
        self.remaining_secs = self.duration_secs;
    }

    /// Advance a running timer. Returns `true` on the tick that finishes
    /// the session.
    pub fn tick(&mut self, elapsed_secs: u32) -> bool {
        if self.state != FocusState::Running {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(elapsed_secs);
        if self.remaining_secs == 0 {
            self.state = FocusState::Finished;
            tracing::info!(duration_secs = self.duration_secs, "Focus session complete");
            return true;
        }
        false
    }

    /// Remaining time as `mm:ss`.
    pub fn formatted(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }
}

/// Format seconds as zero-padded `mm:ss`. Minutes are not wrapped at 60.
pub fn format_mm_ss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
