//! Scheduling strategies.
//!
//! A strategy turns a task list, single-day zone templates and the calendar's
//! existing events into managed events plus one outcome per task. Tasks that
//! cannot be placed are deferred with a reason instead of failing the batch.

mod sequence;
mod session;
mod slots;

pub use sequence::SequenceStrategy;
pub use session::SchedulingSession;
pub use slots::{find_open_slots, OpenSlot};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::splitting::DEFAULT_PREFERRED_CHUNK_MINUTES;
use crate::task::Task;
use crate::timeblock::{Event, TimeBlockZone};

/// What to do with the rest of the batch after a task cannot be placed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Defer the task and keep placing the others
    #[default]
    Continue,
    /// Stop at the first failure; every later task is reported as halted
    HaltOnFailure,
}

/// Strategy tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyConfig {
    /// Days the zone templates are projected across
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Preferred chunk length for split tasks (minutes)
    #[serde(default = "default_preferred_chunk")]
    pub preferred_chunk_minutes: i64,
    #[serde(default)]
    pub batch_policy: BatchPolicy,
}

fn default_horizon_days() -> u32 {
    7
}

fn default_preferred_chunk() -> i64 {
    DEFAULT_PREFERRED_CHUNK_MINUTES
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            preferred_chunk_minutes: default_preferred_chunk(),
            batch_policy: BatchPolicy::default(),
        }
    }
}

/// Why a task was not placed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferReason {
    /// The task failed validation
    Invalid { errors: Vec<String> },
    /// No zone in the horizon offers the task's zone type and energy level
    NoMatchingZone,
    /// No matching zone had room for the task
    NoSlot,
    /// Chunk `chunk` (1-indexed) of a split task found no room
    NoSlotForChunk { chunk: usize },
    /// The split ran out of chunks with `remaining` minutes unplaced
    SplitIncomplete { remaining: i64 },
    /// The task is part of a dependency cycle
    DependencyCycle,
    /// A dependency was not scheduled
    DependencyDeferred { dependency: String },
    /// A dependency is not in the task list
    UnknownDependency { dependency: String },
    /// Not attempted because an earlier task failed
    Halted,
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::Invalid { errors } => write!(f, "invalid task: {}", errors.join("; ")),
            DeferReason::NoMatchingZone => write!(f, "no zone matches the task's zone type and energy level"),
            DeferReason::NoSlot => write!(f, "no open slot in any matching zone"),
            DeferReason::NoSlotForChunk { chunk } => write!(f, "no open slot for chunk {chunk}"),
            DeferReason::SplitIncomplete { remaining } => {
                write!(f, "split exhausted with {remaining} minutes unplaced")
            }
            DeferReason::DependencyCycle => write!(f, "dependency cycle"),
            DeferReason::DependencyDeferred { dependency } => {
                write!(f, "dependency '{dependency}' was not scheduled")
            }
            DeferReason::UnknownDependency { dependency } => {
                write!(f, "unknown dependency '{dependency}'")
            }
            DeferReason::Halted => write!(f, "halted after an earlier failure"),
        }
    }
}

/// Result for a single task.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Scheduled {
        task_id: String,
        event_ids: Vec<String>,
    },
    Deferred {
        task_id: String,
        reason: DeferReason,
    },
}

impl TaskOutcome {
    pub fn task_id(&self) -> &str {
        match self {
            TaskOutcome::Scheduled { task_id, .. } | TaskOutcome::Deferred { task_id, .. } => task_id,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self, TaskOutcome::Scheduled { .. })
    }
}

/// Managed events produced by one pass and the outcome of every task.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ScheduleReport {
    pub events: Vec<Event>,
    pub outcomes: Vec<TaskOutcome>,
}

impl ScheduleReport {
    pub fn scheduled_task_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_scheduled())
            .map(TaskOutcome::task_id)
            .collect()
    }

    /// Deferred tasks with their reasons.
    pub fn deferred(&self) -> Vec<(&str, &DeferReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                TaskOutcome::Deferred { task_id, reason } => Some((task_id.as_str(), reason)),
                TaskOutcome::Scheduled { .. } => None,
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_scheduled)
    }

    /// Events placed for `task_id` (one, or one per chunk).
    pub fn events_for(&self, task_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.task_id.as_deref() == Some(task_id))
            .collect()
    }

    pub fn outcome_for(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.task_id() == task_id)
    }
}

/// Places tasks into zones.
pub trait SchedulingStrategy {
    /// Schedule `tasks` into `zones` (single-day templates) around
    /// `existing_events`. The report holds only newly created managed events.
    fn schedule(
        &self,
        tasks: &[Task],
        zones: &[TimeBlockZone],
        existing_events: &[Event],
    ) -> ScheduleReport;

    /// Days the strategy spreads `zones` across. Callers fetch obstacles
    /// for at least this span.
    fn horizon_days(&self) -> u32;
}
