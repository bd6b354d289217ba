//! Task model: schedulable units of work and the rules governing where they
//! may be placed.
//!
//! A [`Task`] is a plain value. Editing a task means building a new value with
//! the same id; the scheduler always works from the latest list it is given.

pub mod sequence;

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// Longest duration or buffer a task may ask for, in minutes (one leap year).
pub const MAX_TASK_MINUTES: i64 = 366 * 24 * 60;

/// Work mode a task needs and a zone offers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    /// Sustained focus
    Deep,
    /// Lower-intensity work
    Light,
    /// Administrative tasks
    Admin,
}

impl ZoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Deep => "deep",
            ZoneType::Light => "light",
            ZoneType::Admin => "admin",
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Energy level a task requires and a zone provides.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    /// Low energy (e.g., end of day)
    Low,
    /// Medium energy
    Medium,
    /// High energy (e.g., morning)
    High,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyLevel::Low => "low",
            EnergyLevel::Medium => "medium",
            EnergyLevel::High => "high",
        }
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling rules attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskConstraints {
    pub zone_type: ZoneType,
    pub energy_level: EnergyLevel,
    #[serde(default)]
    pub is_splittable: bool,
    /// Smallest chunk a split may produce (minutes)
    #[serde(default)]
    pub min_chunk_duration: i64,
    #[serde(default = "default_max_split_count")]
    pub max_split_count: u32,
    /// Idle minutes enforced before and after the task
    #[serde(default)]
    pub required_buffer: i64,
    /// Ids of tasks that must be scheduled first
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn default_max_split_count() -> u32 {
    1
}

impl TaskConstraints {
    /// Non-splittable constraints with no buffer and no dependencies.
    pub fn new(zone_type: ZoneType, energy_level: EnergyLevel) -> Self {
        Self {
            zone_type,
            energy_level,
            is_splittable: false,
            min_chunk_duration: 0,
            max_split_count: 1,
            required_buffer: 0,
            dependencies: Vec::new(),
        }
    }

    /// Allow splitting into at most `max_split_count` chunks of at least
    /// `min_chunk_duration` minutes.
    pub fn splittable(mut self, min_chunk_duration: i64, max_split_count: u32) -> Self {
        self.is_splittable = true;
        self.min_chunk_duration = min_chunk_duration;
        self.max_split_count = max_split_count;
        self
    }

    pub fn with_buffer(mut self, minutes: i64) -> Self {
        self.required_buffer = minutes;
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    pub title: String,
    /// Duration in minutes
    pub duration: i64,
    pub due_date: NaiveDateTime,
    #[serde(default)]
    pub project_id: String,
    /// Position within the project's natural order
    #[serde(default)]
    pub sequence_number: i64,
    pub constraints: TaskConstraints,
}

impl Task {
    /// Create a task outside of any project (empty project id, sequence 0).
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        duration: i64,
        due_date: NaiveDateTime,
        constraints: TaskConstraints,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration,
            due_date,
            project_id: String::new(),
            sequence_number: 0,
            constraints,
        }
    }

    /// Place the task at `sequence_number` within `project_id`.
    pub fn in_project(mut self, project_id: impl Into<String>, sequence_number: i64) -> Self {
        self.project_id = project_id.into();
        self.sequence_number = sequence_number;
        self
    }

    /// Validate against the current local time.
    pub fn validate(&self) -> Vec<String> {
        self.validate_at(chrono::Local::now().naive_local())
    }

    /// Validate all task properties relative to `now`.
    ///
    /// Returns human-readable messages; an empty list means the task is valid.
    pub fn validate_at(&self, now: NaiveDateTime) -> Vec<String> {
        let mut errors = Vec::new();

        if self.duration <= 0 {
            errors.push("Task duration must be positive".to_string());
        } else if self.duration > MAX_TASK_MINUTES {
            errors.push(format!("Task duration cannot exceed {MAX_TASK_MINUTES} minutes"));
        }

        if !(0..=MAX_TASK_MINUTES).contains(&self.constraints.required_buffer) {
            errors.push(format!(
                "Required buffer must be between 0 and {MAX_TASK_MINUTES} minutes"
            ));
        }

        if self.due_date < now {
            errors.push("Due date cannot be in the past".to_string());
        }

        if self.sequence_number < 0 {
            errors.push("Sequence number must be non-negative".to_string());
        }

        if self.constraints.is_splittable {
            let total_min = self
                .constraints
                .min_chunk_duration
                .saturating_mul(i64::from(self.constraints.max_split_count));
            if total_min > self.duration {
                errors.push(format!(
                    "Total minimum chunk duration ({} min) exceeds task duration ({} min)",
                    total_min, self.duration
                ));
            }
        }

        errors
    }

    /// Minimum duration needed for a single block.
    pub fn minimum_duration(&self) -> i64 {
        if self.constraints.is_splittable {
            self.constraints.min_chunk_duration
        } else {
            self.duration
        }
    }

    /// Id of the `index`-th chunk (1-indexed) produced by splitting this task.
    pub fn chunk_id(&self, index: usize) -> String {
        format!("{}_chunk_{}", self.id, index)
    }

    /// Split the task into chunks of the given sizes.
    ///
    /// Chunks form a dependency chain: the first inherits this task's
    /// dependencies, every later chunk depends on its predecessor only.
    pub fn split(&self, chunk_sizes: &[i64]) -> Result<Vec<Task>, SplitError> {
        let max = self.constraints.max_split_count;
        if chunk_sizes.len() > max as usize {
            return Err(SplitError::TooManyChunks {
                max,
                requested: chunk_sizes.len(),
            });
        }

        let sum: i64 = chunk_sizes.iter().sum();
        if sum != self.duration {
            return Err(SplitError::SumMismatch {
                sum,
                duration: self.duration,
            });
        }

        let min = self.constraints.min_chunk_duration;
        if chunk_sizes.iter().any(|&size| size < min) {
            return Err(SplitError::ChunkBelowMinimum { min });
        }

        if !self.constraints.is_splittable {
            return Err(SplitError::NotSplittable);
        }

        let count = chunk_sizes.len();
        let base_sequence = self.sequence_number * 1000;

        let chunks = chunk_sizes
            .iter()
            .enumerate()
            .map(|(offset, &size)| {
                let index = offset + 1;
                let dependencies = if index == 1 {
                    self.constraints.dependencies.clone()
                } else {
                    vec![self.chunk_id(index - 1)]
                };

                Task {
                    id: self.chunk_id(index),
                    title: format!("{} (Part {}/{})", self.title, index, count),
                    duration: size,
                    due_date: self.due_date,
                    project_id: self.project_id.clone(),
                    sequence_number: base_sequence + index as i64,
                    constraints: TaskConstraints {
                        is_splittable: false,
                        max_split_count: 1,
                        dependencies,
                        ..self.constraints.clone()
                    },
                }
            })
            .collect();

        Ok(chunks)
    }
}
