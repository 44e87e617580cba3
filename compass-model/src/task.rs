//! Weekly planner blocks.
//!
//! Tasks are a flat, unordered set. Overlapping blocks on the same day are
//! allowed. A block whose start is not before its end, or that leaves the
//! 0..=24 hour day, is rejected.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Length of a block created from a start hour alone.
pub const DEFAULT_DURATION_HOURS: u8 = 2;

/// Last hour of the planner day.
pub const DAY_END_HOUR: u8 = 24;

/// Display colours a new block is drawn from.
pub const TASK_PALETTE: [&str; 6] = ["indigo", "amber", "emerald", "rose", "sky", "violet"];

/// Planner weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
}

/// A scheduled block on the weekly calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub day: Weekday,
    /// Start hour, inclusive.
    pub start: u8,
    /// End hour, exclusive.
    pub end: u8,
    pub title: String,
    pub color: String,
    #[serde(default)]
    pub notified: bool,
    #[serde(default)]
    pub reminder_active: bool,
}

impl Task {
    pub fn duration_hours(&self) -> u8 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the block covers a forward range inside the day.
    pub fn is_valid_range(&self) -> bool {
        check_range(self.start, self.end).is_ok()
    }

    /// Whether two blocks share at least one hour on the same day.
    pub fn overlaps(&self, other: &Task) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

/// Rejected planner input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidRange { start: u8, end: u8 },

    #[error("Time range {start}-{end} falls outside the day")]
    OutOfDay { start: u8, end: u8 },

    #[error("Task title is empty")]
    EmptyTitle,
}

fn check_range(start: u8, end: u8) -> Result<(), TaskError> {
    if start >= end {
        return Err(TaskError::InvalidRange { start, end });
    }
    if end > DAY_END_HOUR {
        return Err(TaskError::OutOfDay { start, end });
    }
    Ok(())
}

/// The student's weekly schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskBoard {
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored blocks, dropping any with an invalid range.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut board = Self { tasks };
        board.retain_valid();
        board
    }

    /// Drop blocks whose range could not have been scheduled. Returns how
    /// many were dropped.
    pub fn retain_valid(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| {
            let valid = t.is_valid_range();
            if !valid {
                tracing::warn!(task_id = %t.id, start = t.start, end = t.end, "Dropping task with invalid range");
            }
            valid
        });
        before - self.tasks.len()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Blocks scheduled on a day, earliest first.
    pub fn for_day(&self, day: Weekday) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.day == day).collect();
        tasks.sort_by_key(|t| (t.start, t.end));
        tasks
    }

    /// Add a block of the default duration starting at `start`.
    pub fn add(
        &mut self,
        day: Weekday,
        start: u8,
        title: impl Into<String>,
    ) -> Result<&Task, TaskError> {
        self.add_with_rng(day, start, title, &mut rand::thread_rng())
    }

    /// [`TaskBoard::add`] with an explicit colour source.
    pub fn add_with_rng<R: Rng + ?Sized>(
        &mut self,
        day: Weekday,
        start: u8,
        title: impl Into<String>,
        rng: &mut R,
    ) -> Result<&Task, TaskError> {
        let end = start.saturating_add(DEFAULT_DURATION_HOURS);
        self.add_block_with_rng(day, start, end, title, rng)
    }

    /// Add a block with an explicit end hour.
    pub fn add_block(
        &mut self,
        day: Weekday,
        start: u8,
        end: u8,
        title: impl Into<String>,
    ) -> Result<&Task, TaskError> {
        self.add_block_with_rng(day, start, end, title, &mut rand::thread_rng())
    }

    fn add_block_with_rng<R: Rng + ?Sized>(
        &mut self,
        day: Weekday,
        start: u8,
        end: u8,
        title: impl Into<String>,
        rng: &mut R,
    ) -> Result<&Task, TaskError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        check_range(start, end)?;

        let color = TASK_PALETTE
            .choose(rng)
            .copied()
            .unwrap_or(TASK_PALETTE[0])
            .to_string();

        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            day,
            start,
            end,
            title: title.trim().to_string(),
            color,
            notified: false,
            reminder_active: false,
        };

        tracing::debug!(task_id = %task.id, ?day, start, end, "Task scheduled");
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Delete a block.
    pub fn remove(&mut self, task_id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == task_id)?;
        Some(self.tasks.remove(index))
    }

    /// Flip the reminder flag. Returns the new value.
    ///
    /// This is a display toggle only; nothing is scheduled.
    pub fn toggle_reminder(&mut self, task_id: &str) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == task_id)?;
        task.reminder_active = !task.reminder_active;
        Some(task.reminder_active)
    }

    /// Record that the student has been told about this block.
    pub fn mark_notified(&mut self, task_id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.notified = true;
                true
            }
            None => false,
        }
    }
}
