//! Scheduling orchestrator.
//!
//! The [`Scheduler`] pulls tasks and calendar events from external sources,
//! runs a scheduling strategy and writes the resulting managed events back.
//! Every pass is a full rebuild: all previously managed events are replaced.

pub mod memory;

pub use memory::{InMemoryCalendar, InMemoryTaskSource};

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::{clock_time, hhmm, PlannerConfig, ZoneTemplate};
use crate::error::Result;
use crate::scheduling::{DeferReason, ScheduleReport, SchedulingStrategy, SequenceStrategy, TaskOutcome};
use crate::task::Task;
use crate::timeblock::{Event, TimeBlockType, TimeBlockZone};

/// Source of tasks to schedule (a task tracker).
pub trait TaskSource {
    fn get_tasks(&self) -> Result<Vec<Task>>;

    /// Called once per task after its events were persisted.
    fn mark_scheduled(&mut self, _task_id: &str) -> Result<()> {
        Ok(()) // default no-op
    }
}

/// Calendar the schedule is read from and written to.
pub trait CalendarSource {
    /// Events intersecting `[start, end)`.
    fn get_events(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Event>>;

    /// Persist one event, returning its calendar id.
    fn create_event(&mut self, event: Event) -> Result<String>;

    /// Remove every event of type MANAGED.
    fn remove_managed_events(&mut self) -> Result<()>;

    /// Persist several events. Stops at the first failure; events created
    /// before it stay persisted.
    fn create_events(&mut self, events: Vec<Event>) -> Result<Vec<String>> {
        events.into_iter().map(|e| self.create_event(e)).collect()
    }

    /// Swap the managed schedule for `events`. Calendars that support
    /// transactions should override this to make the swap atomic.
    fn replace_managed_events(&mut self, events: Vec<Event>) -> Result<Vec<String>> {
        self.remove_managed_events()?;
        self.create_events(events)
    }
}

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock stopped at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Planning window settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Start of the planning window on the current day
    #[serde(default = "default_day_start", with = "hhmm")]
    pub day_start: NaiveTime,
    /// Default length of the planning window in days
    #[serde(default = "default_planning_horizon")]
    pub planning_horizon_days: u32,
}

fn default_day_start() -> NaiveTime {
    clock_time(9, 0)
}

fn default_planning_horizon() -> u32 {
    7
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            planning_horizon_days: default_planning_horizon(),
        }
    }
}

/// Coordinates a task source, a calendar and a scheduling strategy.
pub struct Scheduler<T, C, S = SequenceStrategy> {
    tasks: T,
    calendar: C,
    strategy: S,
    config: SchedulerConfig,
    zones: Vec<ZoneTemplate>,
    clock: Box<dyn Clock>,
}

impl<T: TaskSource, C: CalendarSource> Scheduler<T, C> {
    /// Scheduler with the sequence strategy and default settings.
    pub fn new(tasks: T, calendar: C) -> Self {
        Self {
            tasks,
            calendar,
            strategy: SequenceStrategy::default(),
            config: SchedulerConfig::default(),
            zones: Vec::new(),
            clock: Box::new(SystemClock),
        }
    }

    /// Scheduler configured from a [`PlannerConfig`].
    pub fn from_config(tasks: T, calendar: C, config: &PlannerConfig) -> Self {
        Self {
            strategy: SequenceStrategy::new(config.strategy),
            config: config.scheduler.clone(),
            zones: config.zones.clone(),
            ..Self::new(tasks, calendar)
        }
    }
}

impl<T: TaskSource, C: CalendarSource, S: SchedulingStrategy> Scheduler<T, C, S> {
    pub fn with_strategy<S2: SchedulingStrategy>(self, strategy: S2) -> Scheduler<T, C, S2> {
        Scheduler {
            tasks: self.tasks,
            calendar: self.calendar,
            strategy,
            config: self.config,
            zones: self.zones,
            clock: self.clock,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Use these daily zones instead of the default deep-work zone.
    pub fn with_zones(mut self, zones: Vec<ZoneTemplate>) -> Self {
        self.zones = zones;
        self
    }

    pub fn task_source(&self) -> &T {
        &self.tasks
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    pub fn calendar_mut(&mut self) -> &mut C {
        &mut self.calendar
    }

    /// Span to fetch obstacles over: `[today day_start, +days)` widened to
    /// every zone the strategy projects, padded by the largest buffer.
    fn obstacle_window(
        &self,
        now: NaiveDateTime,
        days: u32,
        zones: &[TimeBlockZone],
        tasks: &[Task],
    ) -> (NaiveDateTime, NaiveDateTime) {
        let start = now.date().and_time(self.config.day_start);
        let end = start + Duration::days(i64::from(days));

        let padding = zones
            .iter()
            .map(|z| z.buffer_required)
            .chain(tasks.iter().map(|t| t.constraints.required_buffer))
            .max()
            .map_or(Duration::zero(), Duration::minutes);

        TimeBlockZone::project_across(zones, self.strategy.horizon_days())
            .iter()
            .fold((start, end), |(start, end), zone| {
                (start.min(zone.start - padding), end.max(zone.end + padding))
            })
    }

    /// Zones for `date`: the configured templates, or the default zone.
    fn zones_on(&self, date: NaiveDate) -> Result<Vec<TimeBlockZone>> {
        if self.zones.is_empty() {
            return Ok(vec![ZoneTemplate::default().on(date)?]);
        }

        let zones = self
            .zones
            .iter()
            .map(|template| template.on(date))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(zones)
    }

    /// Schedule every task from the task source over the next
    /// `planning_horizon` days and replace the calendar's managed events.
    ///
    /// Events are fetched for the planning window and for every zone the
    /// strategy may place into, whichever reaches further.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails. A failure while writing events
    /// can leave the managed schedule partially written.
    pub fn schedule_tasks(&mut self, planning_horizon: u32) -> Result<ScheduleReport> {
        let tasks = self.tasks.get_tasks()?;
        if tasks.is_empty() {
            tracing::info!("no tasks to schedule");
            return Ok(ScheduleReport::default());
        }

        let now = self.clock.now();
        let (valid, rejected) = partition_valid(&tasks, now);
        let zones = self.zones_on(now.date())?;
        let (start, end) = self.obstacle_window(now, planning_horizon, &zones, &valid);
        let existing: Vec<Event> = self
            .calendar
            .get_events(start, end)?
            .into_iter()
            .filter(|e| !e.is_managed())
            .collect();

        tracing::info!(tasks = tasks.len(), existing = existing.len(), %start, %end, "scheduling tasks");
        self.run(&valid, rejected, &zones, &existing)
    }

    /// Rebuild the managed schedule for `tasks`.
    ///
    /// `fixed_events` are the obstacles to plan around; when absent, the FIXED
    /// events over the configured planning window are fetched from the
    /// calendar and seed the default zone. The whole list is always
    /// rescheduled; `affected_task_ids` is only checked against the task list.
    pub fn reschedule(
        &mut self,
        tasks: &[Task],
        affected_task_ids: Option<&[String]>,
        fixed_events: Option<Vec<Event>>,
    ) -> Result<ScheduleReport> {
        if let Some(affected) = affected_task_ids {
            let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
            for id in affected.iter().filter(|id| !known.contains(id.as_str())) {
                tracing::warn!(task = %id, "affected task is not in the task list");
            }
            tracing::debug!(affected = affected.len(), "rescheduling all tasks");
        }

        let now = self.clock.now();
        let (valid, rejected) = partition_valid(tasks, now);
        let mut zones = self.zones_on(now.date())?;
        let fixed = match fixed_events {
            Some(events) => events,
            None => {
                let (start, end) =
                    self.obstacle_window(now, self.config.planning_horizon_days, &zones, &valid);
                self.calendar
                    .get_events(start, end)?
                    .into_iter()
                    .filter(|e| e.kind == TimeBlockType::Fixed)
                    .collect()
            }
        };
        if self.zones.is_empty() {
            for zone in &mut zones {
                zone.events = fixed.clone();
            }
        }

        self.run(&valid, rejected, &zones, &fixed)
    }

    fn run(
        &mut self,
        valid: &[Task],
        rejected: Vec<TaskOutcome>,
        zones: &[TimeBlockZone],
        existing: &[Event],
    ) -> Result<ScheduleReport> {
        let mut report = self.strategy.schedule(valid, zones, existing);
        blame_invalid_dependencies(&mut report, &rejected);
        report.outcomes.extend(rejected);

        let ids = self.calendar.replace_managed_events(report.events.clone())?;
        tracing::info!(created = ids.len(), "managed events replaced");

        let scheduled: Vec<String> = report
            .scheduled_task_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        for task_id in &scheduled {
            self.tasks.mark_scheduled(task_id)?;
        }

        Ok(report)
    }
}

/// Split `tasks` into those valid at `now` and deferred outcomes for the rest.
fn partition_valid(tasks: &[Task], now: NaiveDateTime) -> (Vec<Task>, Vec<TaskOutcome>) {
    let mut valid = Vec::with_capacity(tasks.len());
    let mut rejected = Vec::new();
    for task in tasks {
        let errors = task.validate_at(now);
        if errors.is_empty() {
            valid.push(task.clone());
        } else {
            tracing::warn!(task = %task.id, ?errors, "skipping invalid task");
            rejected.push(TaskOutcome::Deferred {
                task_id: task.id.clone(),
                reason: DeferReason::Invalid { errors },
            });
        }
    }
    (valid, rejected)
}

/// Tasks depending on an invalid task see it as unknown; report the
/// dependency as deferred instead.
fn blame_invalid_dependencies(report: &mut ScheduleReport, rejected: &[TaskOutcome]) {
    let invalid: HashSet<&str> = rejected.iter().map(TaskOutcome::task_id).collect();
    for outcome in &mut report.outcomes {
        let TaskOutcome::Deferred { reason, .. } = outcome else {
            continue;
        };
        let dependency = match reason {
            DeferReason::UnknownDependency { dependency } if invalid.contains(dependency.as_str()) => {
                dependency.clone()
            }
            _ => continue,
        };
        *reason = DeferReason::DependencyDeferred { dependency };
    }
}
