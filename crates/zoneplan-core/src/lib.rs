//! # Zoneplan Core Library
//!
//! Constraint-based task scheduling into typed work zones. Tasks carry a
//! duration, a due date, a zone type and energy level, buffers, dependencies
//! and optional splitting rules; the scheduler places them as MANAGED events
//! around FIXED calendar events.
//!
//! ## Architecture
//!
//! - **Domain model**: [`Task`], [`Event`] and the [`TimeBlock`] family
//! - **Conflict detection**: overlap, buffer and zone-rule checks plus the
//!   15-minute slot search
//! - **Splitting**: chunk-size heuristics and zone cost ranking
//! - **Scheduling**: the pluggable [`SchedulingStrategy`] and its sequence-based
//!   implementation
//! - **Scheduler**: orchestration over [`TaskSource`] and [`CalendarSource`]
//!   collaborators
//! - **Config**: TOML configuration of strategy, window and daily zones
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Pulls tasks and events, plans, writes managed events back
//! - [`SequenceStrategy`]: Dependency-aware, due-date ordered placement
//! - [`PlannerConfig`]: Application configuration management

pub mod config;
pub mod conflict;
pub mod error;
pub mod scheduler;
pub mod scheduling;
pub mod splitting;
pub mod task;
pub mod timeblock;

pub use config::{PlannerConfig, ZoneTemplate};
pub use conflict::{
    find_available_slot, find_conflicts, find_zone_transition_conflicts, ConflictKind,
    SchedulingConflict, TransitionKind, ZoneTransitionConflict,
};
pub use error::{ConfigError, CoreError, SplitError, ValidationError};
pub use scheduler::{
    CalendarSource, Clock, FixedClock, InMemoryCalendar, InMemoryTaskSource, Scheduler,
    SchedulerConfig, SystemClock, TaskSource,
};
pub use scheduling::{
    BatchPolicy, DeferReason, ScheduleReport, SchedulingStrategy, SequenceStrategy,
    StrategyConfig, TaskOutcome,
};
pub use splitting::{ChunkPlacement, SplitMetrics, SplitStrategy};
pub use task::sequence::SequenceManager;
pub use task::{EnergyLevel, Task, TaskConstraints, ZoneType};
pub use timeblock::{
    AdminTimeBlockZone, AdminZoneConfig, AdminZoneKind, DayPart, Event, PlainBlock, TimeBlock,
    TimeBlockType, TimeBlockZone, ZoneRules,
};
