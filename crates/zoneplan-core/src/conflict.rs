//! Conflict detection for proposed task placements.
//!
//! Everything here is pure: a proposed placement either produces a conflict
//! value or it does not. "No slot" and "no conflict" are `None`, never errors.

use std::fmt;

use chrono::{Duration, NaiveDateTime};

use crate::task::{EnergyLevel, Task, ZoneType};
use crate::timeblock::{events_within, Event, TimeBlock, TimeBlockZone};

/// Step used when scanning a block for an open start time.
pub const SLOT_STEP_MINUTES: i64 = 15;

/// Why a placement was rejected.
///
/// Positional kinds depend on where the task is placed; the zone-rule kinds
/// hold for any start time inside the same block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    Overlap,
    Buffer { minutes: i64 },
    ZoneType(ZoneType),
    EnergyLevel(EnergyLevel),
    BelowZoneMinimum { minutes: i64 },
    AboveZoneMaximum { minutes: i64 },
}

impl ConflictKind {
    pub fn is_positional(&self) -> bool {
        matches!(self, ConflictKind::Overlap | ConflictKind::Buffer { .. })
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Overlap => write!(f, "Time slot has conflicting events"),
            ConflictKind::Buffer { minutes } => {
                write!(f, "Buffer requirement of {minutes} minutes not met")
            }
            ConflictKind::ZoneType(zone) => write!(f, "Task requires {zone} zone"),
            ConflictKind::EnergyLevel(energy) => write!(f, "Task requires {energy} energy level"),
            ConflictKind::BelowZoneMinimum { minutes } => {
                write!(f, "Task duration below zone minimum ({minutes} min)")
            }
            ConflictKind::AboveZoneMaximum { minutes } => {
                write!(f, "Task duration exceeds admin zone maximum ({minutes} min)")
            }
        }
    }
}

/// A rejected placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConflict {
    pub task_id: String,
    /// Events responsible for the conflict (empty for zone-rule conflicts)
    pub conflicting_events: Vec<Event>,
    pub proposed_start: NaiveDateTime,
    pub kind: ConflictKind,
}

impl SchedulingConflict {
    fn new(task: &Task, proposed_start: NaiveDateTime, kind: ConflictKind, events: Vec<Event>) -> Self {
        Self {
            task_id: task.id.clone(),
            conflicting_events: events,
            proposed_start,
            kind,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for SchedulingConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Buffer a placement of `task` in `block` must keep around itself.
pub fn effective_buffer(task: &Task, block: &TimeBlock) -> i64 {
    task.constraints.required_buffer.max(block.buffer_required())
}

/// Check a proposed placement of `task` at `proposed_start` inside `block`.
///
/// Checks run in a fixed order and the first hit wins: direct overlap, buffer
/// violation, then (zones only) zone type, energy level, minimum duration and
/// admin maximum.
pub fn find_conflicts(
    task: &Task,
    proposed_start: NaiveDateTime,
    block: &TimeBlock,
) -> Option<SchedulingConflict> {
    let proposed_end = proposed_start + Duration::minutes(task.duration);
    let required_buffer = effective_buffer(task, block);

    let nearby = events_within(block.events(), proposed_start, proposed_end, required_buffer);

    let direct: Vec<Event> = nearby
        .iter()
        .filter(|e| e.overlaps(proposed_start, proposed_end))
        .map(|e| (*e).clone())
        .collect();
    if !direct.is_empty() {
        return Some(SchedulingConflict::new(task, proposed_start, ConflictKind::Overlap, direct));
    }

    if !nearby.is_empty() {
        let events = nearby.into_iter().cloned().collect();
        return Some(SchedulingConflict::new(
            task,
            proposed_start,
            ConflictKind::Buffer {
                minutes: required_buffer,
            },
            events,
        ));
    }

    let rules = block.zone_rules()?;
    let kind = if rules.zone_type != task.constraints.zone_type {
        ConflictKind::ZoneType(task.constraints.zone_type)
    } else if rules.energy_level != task.constraints.energy_level {
        ConflictKind::EnergyLevel(task.constraints.energy_level)
    } else if task.duration < rules.min_duration {
        ConflictKind::BelowZoneMinimum {
            minutes: rules.min_duration,
        }
    } else {
        match rules.max_duration {
            Some(max) if task.duration > max => ConflictKind::AboveZoneMaximum { minutes: max },
            _ => return None,
        }
    };

    Some(SchedulingConflict::new(task, proposed_start, kind, Vec::new()))
}

/// First start time at or after `start_from` where `task` fits in `block`.
///
/// The scan first jumps past the latest event that already ended (plus the
/// buffer), then advances in [`SLOT_STEP_MINUTES`] steps. The task must end by
/// both its due date and the block's end.
pub fn find_available_slot(
    task: &Task,
    block: &TimeBlock,
    start_from: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let mut candidate = start_from.max(block.start());
    let limit = task.due_date.min(block.end());
    let required_buffer = effective_buffer(task, block);

    if let Some(previous) = block
        .events()
        .iter()
        .filter(|e| e.end <= candidate)
        .max_by_key(|e| e.end)
    {
        candidate = candidate.max(previous.end + Duration::minutes(required_buffer));
    }

    let duration = Duration::minutes(task.duration);
    while candidate + duration <= limit {
        match find_conflicts(task, candidate, block) {
            None => return Some(candidate),
            // Zone rules do not depend on the start time.
            Some(conflict) if !conflict.kind.is_positional() => return None,
            Some(_) => candidate += Duration::minutes(SLOT_STEP_MINUTES),
        }
    }

    None
}

/// Why a task cannot run across zone boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    NoStartingZone,
    BeyondAvailableZones,
    Incompatible {
        from: (ZoneType, EnergyLevel),
        to: (ZoneType, EnergyLevel),
    },
    Gap {
        from: NaiveDateTime,
        to: NaiveDateTime,
    },
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::NoStartingZone => write!(f, "No valid starting zone found"),
            TransitionKind::BeyondAvailableZones => write!(f, "Task extends beyond available zones"),
            TransitionKind::Incompatible { from, to } => write!(
                f,
                "Incompatible zone transition: {}/{} -> {}/{}",
                from.0, from.1, to.0, to.1
            ),
            TransitionKind::Gap { from, to } => write!(f, "Gap between zones: {from} -> {to}"),
        }
    }
}

/// A task placement that straddles zones it cannot run across.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTransitionConflict {
    pub kind: TransitionKind,
    pub start_zone: Option<TimeBlockZone>,
    pub end_zone: Option<TimeBlockZone>,
}

impl ZoneTransitionConflict {
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for ZoneTransitionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Check whether `task` starting at `start_time` can run past the end of its
/// zone into the chronologically next one.
///
/// Overrunning is allowed only into a contiguous zone with the same type and
/// energy level.
pub fn find_zone_transition_conflicts(
    task: &Task,
    start_time: NaiveDateTime,
    zones: &[TimeBlockZone],
) -> Option<ZoneTransitionConflict> {
    let mut sorted: Vec<&TimeBlockZone> = zones.iter().collect();
    sorted.sort_by_key(|z| z.start);

    let Some(index) = sorted.iter().position(|z| z.contains(start_time)) else {
        return Some(ZoneTransitionConflict {
            kind: TransitionKind::NoStartingZone,
            start_zone: None,
            end_zone: None,
        });
    };
    let current = sorted[index];

    let end_time = start_time + Duration::minutes(task.duration);
    if end_time <= current.end {
        return None;
    }

    let Some(next) = sorted.get(index + 1).copied() else {
        return Some(ZoneTransitionConflict {
            kind: TransitionKind::BeyondAvailableZones,
            start_zone: Some(current.clone()),
            end_zone: None,
        });
    };

    let kind = if current.zone_type != next.zone_type || current.energy_level != next.energy_level {
        TransitionKind::Incompatible {
            from: (current.zone_type, current.energy_level),
            to: (next.zone_type, next.energy_level),
        }
    } else if next.start > current.end {
        TransitionKind::Gap {
            from: current.end,
            to: next.start,
        }
    } else {
        return None;
    };

    Some(ZoneTransitionConflict {
        kind,
        start_zone: Some(current.clone()),
        end_zone: Some(next.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskConstraints;
    use crate::timeblock::{AdminTimeBlockZone, AdminZoneConfig, AdminZoneKind, DayPart, PlainBlock, TimeBlockType};
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn task(duration: i64, zone: ZoneType, energy: EnergyLevel, buffer: i64) -> Task {
        Task::new(
            "t",
            "Task",
            duration,
            at(23, 0),
            TaskConstraints::new(zone, energy).with_buffer(buffer),
        )
    }

    fn zone(zone_type: ZoneType, energy: EnergyLevel, min: i64, buffer: i64) -> TimeBlockZone {
        TimeBlockZone::new(at(9, 0), at(13, 0), zone_type, energy, min, buffer).unwrap()
    }

    fn deep_block(events: Vec<Event>) -> TimeBlock {
        zone(ZoneType::Deep, EnergyLevel::High, 30, 15)
            .with_events(events)
            .into()
    }

    #[test]
    fn direct_overlap_is_reported_first() {
        let meeting = Event::fixed("m", "Meeting", at(10, 0), at(11, 0));
        let block = deep_block(vec![meeting.clone()]);
        let t = task(60, ZoneType::Deep, EnergyLevel::High, 15);

        let conflict = find_conflicts(&t, at(10, 30), &block).unwrap();
        assert_eq!(conflict.kind, ConflictKind::Overlap);
        assert_eq!(conflict.message(), "Time slot has conflicting events");
        assert_eq!(conflict.conflicting_events, vec![meeting]);
        assert_eq!(conflict.proposed_start, at(10, 30));
    }

    #[test]
    fn buffer_violation_on_either_side() {
        let block = deep_block(vec![Event::fixed("m", "Meeting", at(10, 0), at(11, 0))]);
        let t = task(30, ZoneType::Deep, EnergyLevel::High, 15);

        let before = find_conflicts(&t, at(9, 20), &block).unwrap();
        assert_eq!(before.message(), "Buffer requirement of 15 minutes not met");

        let after = find_conflicts(&t, at(11, 10), &block).unwrap();
        assert_eq!(after.kind, ConflictKind::Buffer { minutes: 15 });

        assert!(find_conflicts(&t, at(9, 15), &block).is_none());
        assert!(find_conflicts(&t, at(11, 15), &block).is_none());
    }

    #[test]
    fn larger_of_task_and_zone_buffer_applies() {
        let block = deep_block(vec![Event::fixed("m", "Meeting", at(10, 0), at(11, 0))]);
        let t = task(30, ZoneType::Deep, EnergyLevel::High, 30);

        let conflict = find_conflicts(&t, at(11, 15), &block).unwrap();
        assert_eq!(conflict.kind, ConflictKind::Buffer { minutes: 30 });
        assert!(find_conflicts(&t, at(11, 30), &block).is_none());
    }

    #[test]
    fn zone_type_mismatch_wins_over_duration_minimum() {
        let block: TimeBlock = zone(ZoneType::Light, EnergyLevel::High, 120, 0).into();
        let t = task(15, ZoneType::Deep, EnergyLevel::High, 0);

        let conflict = find_conflicts(&t, at(9, 0), &block).unwrap();
        assert_eq!(conflict.message(), "Task requires deep zone");
        assert!(conflict.conflicting_events.is_empty());
    }

    #[test]
    fn energy_mismatch_is_reported() {
        let block: TimeBlock = zone(ZoneType::Deep, EnergyLevel::Low, 30, 15).into();
        let t = task(60, ZoneType::Deep, EnergyLevel::High, 0);

        let conflict = find_conflicts(&t, at(9, 0), &block).unwrap();
        assert_eq!(conflict.message(), "Task requires high energy level");
    }

    #[test]
    fn duration_below_zone_minimum() {
        let block: TimeBlock = zone(ZoneType::Deep, EnergyLevel::High, 45, 0).into();
        let t = task(30, ZoneType::Deep, EnergyLevel::High, 0);

        let conflict = find_conflicts(&t, at(9, 0), &block).unwrap();
        assert_eq!(conflict.message(), "Task duration below zone minimum (45 min)");
    }

    #[test]
    fn admin_zone_maximum_is_checked_last() {
        let config = AdminZoneConfig {
            kind: AdminZoneKind::Review,
            preferred_time: DayPart::Morning,
            max_duration: 45,
            required_buffer: 0,
            energy_threshold: EnergyLevel::Low,
        };
        let block: TimeBlock = AdminTimeBlockZone::new(at(9, 0), at(12, 0), config)
            .unwrap()
            .into();

        let too_long = task(60, ZoneType::Admin, EnergyLevel::Low, 0);
        let conflict = find_conflicts(&too_long, at(9, 0), &block).unwrap();
        assert_eq!(conflict.message(), "Task duration exceeds admin zone maximum (45 min)");

        let wrong_energy = task(60, ZoneType::Admin, EnergyLevel::High, 0);
        let conflict = find_conflicts(&wrong_energy, at(9, 0), &block).unwrap();
        assert_eq!(conflict.kind, ConflictKind::EnergyLevel(EnergyLevel::High));

        let fits = task(45, ZoneType::Admin, EnergyLevel::Low, 0);
        assert!(find_conflicts(&fits, at(9, 0), &block).is_none());
    }

    #[test]
    fn plain_blocks_skip_zone_rules() {
        let block: TimeBlock = PlainBlock::new(at(9, 0), at(12, 0), TimeBlockType::Managed)
            .unwrap()
            .into();
        let t = task(10, ZoneType::Admin, EnergyLevel::Low, 0);
        assert!(find_conflicts(&t, at(9, 0), &block).is_none());
    }

    #[test]
    fn slot_search_clears_back_to_back_meetings() {
        let block = deep_block(vec![
            Event::fixed("m1", "Morning Meeting", at(9, 0), at(10, 0)),
            Event::fixed("m2", "Team Sync", at(10, 15), at(11, 0)),
        ]);
        let t = task(30, ZoneType::Deep, EnergyLevel::High, 15);

        let slot = find_available_slot(&t, &block, at(9, 0));
        assert_eq!(slot, Some(at(11, 15)));
        assert!(find_conflicts(&t, at(11, 0), &block).is_some());
    }

    #[test]
    fn slot_search_jumps_past_finished_event() {
        let block = deep_block(vec![Event::fixed("m", "Meeting", at(9, 0), at(10, 0))]);
        let t = task(30, ZoneType::Deep, EnergyLevel::High, 15);

        // Starting at 10:00, the previous meeting forces 10:15.
        assert_eq!(find_available_slot(&t, &block, at(10, 0)), Some(at(10, 15)));
    }

    #[test]
    fn slot_search_respects_block_end_and_due_date() {
        let block = deep_block(vec![Event::fixed("m", "Meeting", at(9, 0), at(12, 30))]);
        let t = task(60, ZoneType::Deep, EnergyLevel::High, 15);
        assert_eq!(find_available_slot(&t, &block, at(9, 0)), None);

        let mut due_early = task(60, ZoneType::Deep, EnergyLevel::High, 0);
        due_early.due_date = at(9, 45);
        let empty = deep_block(Vec::new());
        assert_eq!(find_available_slot(&due_early, &empty, at(9, 0)), None);
        due_early.due_date = at(10, 0);
        assert_eq!(find_available_slot(&due_early, &empty, at(9, 0)), Some(at(9, 0)));
    }

    #[test]
    fn slot_search_gives_up_on_zone_rule_conflict() {
        let block: TimeBlock = zone(ZoneType::Light, EnergyLevel::High, 0, 0).into();
        let t = task(30, ZoneType::Deep, EnergyLevel::High, 0);
        assert_eq!(find_available_slot(&t, &block, at(9, 0)), None);
    }

    fn contiguous_zones() -> Vec<TimeBlockZone> {
        vec![
            TimeBlockZone::new(at(11, 0), at(13, 0), ZoneType::Deep, EnergyLevel::High, 0, 0).unwrap(),
            TimeBlockZone::new(at(9, 0), at(11, 0), ZoneType::Deep, EnergyLevel::High, 0, 0).unwrap(),
        ]
    }

    #[test]
    fn transition_into_compatible_contiguous_zone_is_allowed() {
        let t = task(120, ZoneType::Deep, EnergyLevel::High, 0);
        assert!(find_zone_transition_conflicts(&t, at(10, 0), &contiguous_zones()).is_none());
    }

    #[test]
    fn transition_without_start_zone() {
        let t = task(30, ZoneType::Deep, EnergyLevel::High, 0);
        let conflict = find_zone_transition_conflicts(&t, at(8, 0), &contiguous_zones()).unwrap();
        assert_eq!(conflict.message(), "No valid starting zone found");
        assert!(conflict.start_zone.is_none());
    }

    #[test]
    fn transition_beyond_last_zone() {
        let t = task(120, ZoneType::Deep, EnergyLevel::High, 0);
        let conflict = find_zone_transition_conflicts(&t, at(12, 0), &contiguous_zones()).unwrap();
        assert_eq!(conflict.message(), "Task extends beyond available zones");
        assert_eq!(conflict.start_zone.unwrap().start, at(11, 0));
        assert!(conflict.end_zone.is_none());
    }

    #[test]
    fn transition_into_incompatible_zone() {
        let zones = vec![
            TimeBlockZone::new(at(9, 0), at(11, 0), ZoneType::Deep, EnergyLevel::High, 0, 0).unwrap(),
            TimeBlockZone::new(at(11, 0), at(13, 0), ZoneType::Light, EnergyLevel::Medium, 0, 0).unwrap(),
        ];
        let t = task(90, ZoneType::Deep, EnergyLevel::High, 0);
        let conflict = find_zone_transition_conflicts(&t, at(10, 0), &zones).unwrap();
        assert_eq!(
            conflict.message(),
            "Incompatible zone transition: deep/high -> light/medium"
        );
    }

    #[test]
    fn transition_across_gap() {
        let zones = vec![
            TimeBlockZone::new(at(9, 0), at(11, 0), ZoneType::Deep, EnergyLevel::High, 0, 0).unwrap(),
            TimeBlockZone::new(at(12, 0), at(14, 0), ZoneType::Deep, EnergyLevel::High, 0, 0).unwrap(),
        ];
        let t = task(90, ZoneType::Deep, EnergyLevel::High, 0);
        let conflict = find_zone_transition_conflicts(&t, at(10, 0), &zones).unwrap();
        assert_eq!(
            conflict.message(),
            "Gap between zones: 2024-03-04 11:00:00 -> 2024-03-04 12:00:00"
        );
    }
}
