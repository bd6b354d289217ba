//! Sequence-based scheduling.
//!
//! Tasks are placed one at a time. Among the tasks whose dependencies are all
//! scheduled, the next one is chosen by due date, then project, then sequence
//! number. Placements form a chain: every new event starts after the previous
//! managed event plus the larger of the two buffers.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDateTime};

use super::session::SchedulingSession;
use super::slots::find_open_slots;
use super::{BatchPolicy, DeferReason, ScheduleReport, SchedulingStrategy, StrategyConfig, TaskOutcome};
use crate::conflict::{find_available_slot, find_conflicts};
use crate::splitting::SplitStrategy;
use crate::task::sequence::scheduling_order;
use crate::task::Task;
use crate::timeblock::{Event, TimeBlock, TimeBlockType, TimeBlockZone};

#[derive(Debug, Clone, Default)]
pub struct SequenceStrategy {
    config: StrategyConfig,
}

impl SequenceStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn splitter(&self) -> SplitStrategy {
        SplitStrategy::new(self.config.preferred_chunk_minutes)
    }

    /// Earliest start for `task`: after the last managed event (plus the
    /// larger buffer) and after its dependencies finish.
    fn start_floor(&self, task: &Task, session: &SchedulingSession) -> Option<NaiveDateTime> {
        let chain = session.last_managed_event().map(|last| {
            let buffer = task.constraints.required_buffer.max(last.buffer_required);
            last.end + Duration::minutes(buffer)
        });
        chain.max(session.dependency_floor(task))
    }

    fn place(
        &self,
        task: &Task,
        zones: &[TimeBlockZone],
        session: &mut SchedulingSession,
    ) -> Result<Vec<String>, DeferReason> {
        let constraints = &task.constraints;
        let has_matching_zone = zones
            .iter()
            .any(|z| z.zone_type == constraints.zone_type && z.energy_level == constraints.energy_level);
        if !has_matching_zone {
            return Err(DeferReason::NoMatchingZone);
        }

        let floor = self.start_floor(task, session);
        if constraints.is_splittable {
            self.place_split(task, zones, floor, session)
        } else {
            self.place_single(task, zones, floor, session)
        }
    }

    fn place_single(
        &self,
        task: &Task,
        zones: &[TimeBlockZone],
        floor: Option<NaiveDateTime>,
        session: &mut SchedulingSession,
    ) -> Result<Vec<String>, DeferReason> {
        let duration = Duration::minutes(task.duration);

        for zone in zones.iter().filter(|z| z.zone_type == task.constraints.zone_type) {
            let candidate = floor.map_or(zone.start, |f| f.max(zone.start));
            if candidate + duration > zone.end.min(task.due_date) {
                continue;
            }

            let margin = task.constraints.required_buffer.max(zone.buffer_required);
            let block = TimeBlock::Zone(session.zone_view(zone, margin));

            let start = match find_conflicts(task, candidate, &block) {
                None => candidate,
                Some(conflict) if conflict.kind.is_positional() => {
                    match find_available_slot(task, &block, candidate) {
                        Some(start) => start,
                        None => continue,
                    }
                }
                Some(conflict) => {
                    tracing::debug!(task = %task.id, zone_start = %zone.start, %conflict, "zone rejected task");
                    continue;
                }
            };

            let event = Event::new(
                task.id.clone(),
                task.title.clone(),
                start,
                start + duration,
                TimeBlockType::Managed,
            )
            .with_buffer(task.constraints.required_buffer)
            .for_task(task.id.clone());

            tracing::debug!(task = %task.id, %start, "placed task");
            return Ok(session.commit(&task.id, vec![event]));
        }

        Err(DeferReason::NoSlot)
    }

    fn place_split(
        &self,
        task: &Task,
        zones: &[TimeBlockZone],
        floor: Option<NaiveDateTime>,
        session: &mut SchedulingSession,
    ) -> Result<Vec<String>, DeferReason> {
        let constraints = &task.constraints;
        let chunk_size = self
            .splitter()
            .chunk_size(task.duration, constraints.min_chunk_duration);
        let sizes = plan_chunks(
            task.duration,
            chunk_size,
            constraints.min_chunk_duration,
            constraints.max_split_count,
        )
        .map_err(|remaining| DeferReason::SplitIncomplete { remaining })?;

        let mut not_before = floor;
        let mut pending: Vec<Event> = Vec::with_capacity(sizes.len());

        for (offset, &size) in sizes.iter().enumerate() {
            let index = offset + 1;
            let length = Duration::minutes(size);

            let placed = zones
                .iter()
                .filter(|z| {
                    z.zone_type == constraints.zone_type
                        && z.energy_level == constraints.energy_level
                        && size >= z.min_duration
                })
                .find_map(|zone| {
                    let buffer = constraints.required_buffer.max(zone.buffer_required);
                    let padding = Duration::minutes(buffer);
                    let mut committed = session.events_between(zone.start - padding, zone.end + padding);
                    committed.extend(pending.iter().cloned());

                    let from = not_before.map_or(zone.start, |nb| nb.max(zone.start));
                    find_open_slots(zone, &committed, size, buffer, from)
                        .into_iter()
                        .next()
                        .filter(|slot| slot.start + length <= task.due_date)
                        .map(|slot| (slot.start, buffer))
                });

            let Some((start, buffer)) = placed else {
                return Err(DeferReason::NoSlotForChunk { chunk: index });
            };

            let end = start + length;
            pending.push(
                Event::new(
                    task.chunk_id(index),
                    format!("{} (Part {})", task.title, index),
                    start,
                    end,
                    TimeBlockType::Managed,
                )
                .with_buffer(constraints.required_buffer)
                .for_task(task.id.clone()),
            );
            not_before = Some(end + Duration::minutes(buffer));
        }

        tracing::debug!(task = %task.id, chunks = pending.len(), "placed split task");
        Ok(session.commit(&task.id, pending))
    }
}

/// Chunk sizes for a split: greedy `chunk_size` pieces, at most `max_chunks`
/// of them. A trailing piece shorter than `min_chunk` is folded into the one
/// before it. Returns the unplaced minutes when the chunks run out.
fn plan_chunks(duration: i64, chunk_size: i64, min_chunk: i64, max_chunks: u32) -> Result<Vec<i64>, i64> {
    let chunk_size = chunk_size.max(1);
    let mut sizes = Vec::new();
    let mut remaining = duration;

    while remaining > 0 && sizes.len() < max_chunks as usize {
        let size = remaining.min(chunk_size);
        sizes.push(size);
        remaining -= size;
    }

    if remaining > 0 {
        return Err(remaining);
    }

    if sizes.len() > 1 && sizes.last().is_some_and(|&last| last < min_chunk) {
        if let Some(last) = sizes.pop() {
            if let Some(previous) = sizes.last_mut() {
                *previous += last;
            }
        }
    }

    Ok(sizes)
}

/// Explain why each task left in `blocked` never became ready.
fn classify_blocked(
    blocked: &[&Task],
    known: &HashSet<&str>,
    deferred: &HashSet<String>,
    session: &SchedulingSession,
) -> Vec<TaskOutcome> {
    let pending: HashMap<&str, &Task> = blocked.iter().map(|t| (t.id.as_str(), *t)).collect();

    blocked
        .iter()
        .map(|task| {
            let unmet: Vec<&String> = task
                .constraints
                .dependencies
                .iter()
                .filter(|dep| !session.is_scheduled(dep))
                .collect();

            let reason = if let Some(dep) = unmet.iter().find(|dep| !known.contains(dep.as_str())) {
                DeferReason::UnknownDependency {
                    dependency: (*dep).clone(),
                }
            } else if let Some(dep) = unmet.iter().find(|dep| deferred.contains(dep.as_str())) {
                DeferReason::DependencyDeferred {
                    dependency: (*dep).clone(),
                }
            } else if on_cycle(task, &pending, session) {
                DeferReason::DependencyCycle
            } else {
                DeferReason::DependencyDeferred {
                    dependency: unmet.first().map(|d| (*d).clone()).unwrap_or_default(),
                }
            };

            TaskOutcome::Deferred {
                task_id: task.id.clone(),
                reason,
            }
        })
        .collect()
}

/// Whether `task` can reach itself through unscheduled dependencies.
fn on_cycle(task: &Task, pending: &HashMap<&str, &Task>, session: &SchedulingSession) -> bool {
    let mut stack: Vec<&str> = task.constraints.dependencies.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    while let Some(id) = stack.pop() {
        if id == task.id {
            return true;
        }
        if session.is_scheduled(id) || !seen.insert(id) {
            continue;
        }
        if let Some(dep_task) = pending.get(id) {
            stack.extend(dep_task.constraints.dependencies.iter().map(String::as_str));
        }
    }

    false
}

/// Existing events plus the events carried by the zone templates. An event
/// present in both is kept once.
fn collect_obstacles(zones: &[TimeBlockZone], existing_events: &[Event]) -> Vec<Event> {
    let mut seen: HashSet<(&str, NaiveDateTime, NaiveDateTime)> = HashSet::new();
    existing_events
        .iter()
        .chain(zones.iter().flat_map(|z| z.events.iter()))
        .filter(|e| seen.insert((e.id.as_str(), e.start, e.end)))
        .cloned()
        .collect()
}

impl SchedulingStrategy for SequenceStrategy {
    fn schedule(
        &self,
        tasks: &[Task],
        zones: &[TimeBlockZone],
        existing_events: &[Event],
    ) -> ScheduleReport {
        let mut all_zones = TimeBlockZone::project_across(zones, self.config.horizon_days);
        all_zones.sort_by_key(|z| z.start);

        let mut session = SchedulingSession::new(&collect_obstacles(zones, existing_events));
        let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let mut remaining: Vec<&Task> = tasks.iter().collect();
        let mut deferred: HashSet<String> = HashSet::new();
        let mut outcomes = Vec::with_capacity(tasks.len());

        tracing::debug!(
            tasks = tasks.len(),
            zones = all_zones.len(),
            existing = existing_events.len(),
            "starting schedule pass"
        );

        while !remaining.is_empty() {
            let next = remaining
                .iter()
                .enumerate()
                .filter(|(_, t)| {
                    t.constraints
                        .dependencies
                        .iter()
                        .all(|dep| session.is_scheduled(dep))
                })
                .min_by(|(_, a), (_, b)| scheduling_order(a, b))
                .map(|(i, _)| i);

            let Some(index) = next else {
                tracing::warn!(blocked = remaining.len(), "no task has its dependencies met");
                outcomes.extend(classify_blocked(&remaining, &known, &deferred, &session));
                remaining.clear();
                break;
            };

            let task = remaining.remove(index);
            match self.place(task, &all_zones, &mut session) {
                Ok(event_ids) => outcomes.push(TaskOutcome::Scheduled {
                    task_id: task.id.clone(),
                    event_ids,
                }),
                Err(reason) => {
                    tracing::warn!(task = %task.id, %reason, "deferred task");
                    deferred.insert(task.id.clone());
                    outcomes.push(TaskOutcome::Deferred {
                        task_id: task.id.clone(),
                        reason,
                    });

                    if self.config.batch_policy == BatchPolicy::HaltOnFailure {
                        outcomes.extend(remaining.drain(..).map(|t| TaskOutcome::Deferred {
                            task_id: t.id.clone(),
                            reason: DeferReason::Halted,
                        }));
                    }
                }
            }
        }

        let report = ScheduleReport {
            events: session.into_managed_events(),
            outcomes,
        };
        tracing::info!(
            scheduled = report.scheduled_task_ids().len(),
            deferred = report.deferred().len(),
            events = report.events.len(),
            "schedule pass complete"
        );
        report
    }

    fn horizon_days(&self) -> u32 {
        self.config.horizon_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{EnergyLevel, TaskConstraints, ZoneType};
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn deep_zone() -> TimeBlockZone {
        TimeBlockZone::new(at(4, 9, 0), at(4, 13, 0), ZoneType::Deep, EnergyLevel::High, 30, 15).unwrap()
    }

    fn deep_task(id: &str, duration: i64) -> Task {
        Task::new(
            id,
            id,
            duration,
            at(11, 0, 0),
            TaskConstraints::new(ZoneType::Deep, EnergyLevel::High).with_buffer(15),
        )
    }

    fn one_day() -> SequenceStrategy {
        SequenceStrategy::new(StrategyConfig {
            horizon_days: 1,
            ..StrategyConfig::default()
        })
    }

    #[test]
    fn plan_chunks_folds_short_tail() {
        assert_eq!(plan_chunks(240, 120, 60, 4), Ok(vec![120, 120]));
        assert_eq!(plan_chunks(250, 120, 60, 4), Ok(vec![120, 130]));
        assert_eq!(plan_chunks(90, 60, 60, 3), Ok(vec![90]));
        assert_eq!(plan_chunks(400, 120, 60, 2), Err(160));
        assert_eq!(plan_chunks(60, 30, 30, 0), Err(60));
    }

    #[test]
    fn tasks_chain_with_buffer() {
        let tasks = vec![deep_task("a", 60), deep_task("b", 60)];
        let report = one_day().schedule(&tasks, &[deep_zone()], &[]);

        assert!(report.is_complete());
        assert_eq!(report.events[0].start, at(4, 9, 0));
        assert_eq!(report.events[1].start, at(4, 10, 15));
        assert_eq!(report.events[1].task_id.as_deref(), Some("b"));
        assert!(report.events.iter().all(|e| e.kind == TimeBlockType::Managed));
    }

    #[test]
    fn earlier_due_date_goes_first() {
        let mut late = deep_task("late", 60);
        late.due_date = at(10, 0, 0);
        let mut soon = deep_task("soon", 60);
        soon.due_date = at(5, 0, 0);

        let report = one_day().schedule(&[late, soon], &[deep_zone()], &[]);
        assert_eq!(report.scheduled_task_ids(), vec!["soon", "late"]);
    }

    #[test]
    fn fixed_obstacles_are_avoided() {
        let meeting = Event::fixed("m", "Meeting", at(4, 9, 0), at(4, 10, 0));
        let report = one_day().schedule(&[deep_task("a", 60)], &[deep_zone()], &[meeting]);

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].start, at(4, 10, 15));
    }

    #[test]
    fn zone_template_events_are_obstacles() {
        let zone = deep_zone().with_events(vec![Event::fixed("m", "Meeting", at(4, 9, 0), at(4, 11, 0))]);
        let report = one_day().schedule(&[deep_task("a", 60)], &[zone], &[]);
        assert_eq!(report.events[0].start, at(4, 11, 15));
    }

    #[test]
    fn unplaceable_task_is_deferred_and_others_continue() {
        let tasks = vec![deep_task("huge", 300), deep_task("small", 60)];
        let report = one_day().schedule(&tasks, &[deep_zone()], &[]);

        assert_eq!(report.scheduled_task_ids(), vec!["small"]);
        assert_eq!(report.deferred(), vec![("huge", &DeferReason::NoSlot)]);
    }

    #[test]
    fn halt_policy_stops_after_first_failure() {
        let strategy = SequenceStrategy::new(StrategyConfig {
            horizon_days: 1,
            batch_policy: BatchPolicy::HaltOnFailure,
            ..StrategyConfig::default()
        });
        let mut huge = deep_task("huge", 300);
        huge.due_date = at(5, 0, 0);
        let report = strategy.schedule(&[huge, deep_task("small", 60)], &[deep_zone()], &[]);

        assert!(report.events.is_empty());
        assert_eq!(
            report.deferred(),
            vec![("huge", &DeferReason::NoSlot), ("small", &DeferReason::Halted)]
        );
    }

    #[test]
    fn missing_zone_type_is_reported() {
        let mut task = deep_task("light", 30);
        task.constraints.zone_type = ZoneType::Light;
        let report = one_day().schedule(&[task], &[deep_zone()], &[]);
        assert_eq!(report.deferred(), vec![("light", &DeferReason::NoMatchingZone)]);
    }

    #[test]
    fn dependency_failures_are_classified() {
        let mut huge = deep_task("huge", 300);
        huge.due_date = at(5, 0, 0);
        let after_huge = Task {
            constraints: deep_task("x", 30).constraints.with_dependencies(["huge"]),
            ..deep_task("after_huge", 30)
        };
        let orphan = Task {
            constraints: deep_task("x", 30).constraints.with_dependencies(["ghost"]),
            ..deep_task("orphan", 30)
        };
        let report = one_day().schedule(&[huge, after_huge, orphan], &[deep_zone()], &[]);

        assert_eq!(
            report.outcome_for("after_huge"),
            Some(&TaskOutcome::Deferred {
                task_id: "after_huge".into(),
                reason: DeferReason::DependencyDeferred {
                    dependency: "huge".into()
                },
            })
        );
        assert_eq!(
            report.outcome_for("orphan"),
            Some(&TaskOutcome::Deferred {
                task_id: "orphan".into(),
                reason: DeferReason::UnknownDependency {
                    dependency: "ghost".into()
                },
            })
        );
    }

    #[test]
    fn cycle_members_and_dependents_are_told_apart() {
        fn with_deps(id: &str, deps: &[&str]) -> Task {
            Task {
                constraints: deep_task(id, 30).constraints.with_dependencies(deps.iter().copied()),
                ..deep_task(id, 30)
            }
        }
        let tasks = vec![with_deps("a", &["b"]), with_deps("b", &["a"]), with_deps("c", &["a"])];
        let report = one_day().schedule(&tasks, &[deep_zone()], &[]);

        assert!(report.events.is_empty());
        assert_eq!(
            report.deferred(),
            vec![
                ("a", &DeferReason::DependencyCycle),
                ("b", &DeferReason::DependencyCycle),
                (
                    "c",
                    &DeferReason::DependencyDeferred {
                        dependency: "a".into()
                    }
                ),
            ]
        );
    }

    #[test]
    fn split_task_chunks_are_committed_together() {
        let task = Task {
            constraints: deep_task("x", 0).constraints.splittable(60, 4),
            ..deep_task("report", 240)
        };
        let strategy = SequenceStrategy::new(StrategyConfig {
            horizon_days: 2,
            ..StrategyConfig::default()
        });
        let report = strategy.schedule(&[task], &[deep_zone()], &[]);

        assert_eq!(
            report.outcome_for("report"),
            Some(&TaskOutcome::Scheduled {
                task_id: "report".into(),
                event_ids: vec!["report_chunk_1".into(), "report_chunk_2".into()],
            })
        );
        assert_eq!(report.events[0].title, "report (Part 1)");
        assert_eq!(report.events[0].start, at(4, 9, 0));
        assert_eq!(report.events[1].start, at(5, 9, 0));
        assert_eq!(report.events_for("report").len(), 2);
    }

    #[test]
    fn split_without_room_commits_nothing() {
        let task = Task {
            constraints: deep_task("x", 0).constraints.splittable(60, 4),
            ..deep_task("report", 240)
        };
        let report = one_day().schedule(&[task], &[deep_zone()], &[]);

        assert!(report.events.is_empty());
        assert_eq!(
            report.deferred(),
            vec![("report", &DeferReason::NoSlotForChunk { chunk: 2 })]
        );
    }
}
