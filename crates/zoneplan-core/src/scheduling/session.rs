//! Working state of one scheduling pass.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::task::Task;
use crate::timeblock::{Event, TimeBlockZone};

/// Events committed during one `schedule` call.
///
/// The arena holds the pre-existing obstacles first (sorted by end time), then
/// managed events in commit order. A per-day index keeps zone lookups local.
#[derive(Debug, Default)]
pub struct SchedulingSession {
    events: Vec<Event>,
    existing: usize,
    by_day: BTreeMap<NaiveDate, Vec<usize>>,
    scheduled: HashSet<String>,
    finish_times: HashMap<String, NaiveDateTime>,
}

impl SchedulingSession {
    pub fn new(existing_events: &[Event]) -> Self {
        let mut existing = existing_events.to_vec();
        existing.sort_by_key(|e| e.end);

        let mut session = Self {
            existing: existing.len(),
            ..Self::default()
        };
        for event in existing {
            session.push(event);
        }
        session
    }

    fn push(&mut self, event: Event) {
        let index = self.events.len();
        let mut day = event.start.date();
        while day <= event.end.date() {
            self.by_day.entry(day).or_default().push(index);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        self.events.push(event);
    }

    /// Record the events placed for `task_id` and mark the task scheduled.
    ///
    /// Returns the ids of the committed events.
    pub fn commit(&mut self, task_id: &str, events: Vec<Event>) -> Vec<String> {
        let ids = events.iter().map(|e| e.id.clone()).collect();
        if let Some(finish) = events.iter().map(|e| e.end).max() {
            self.finish_times.insert(task_id.to_string(), finish);
        }
        for event in events {
            self.push(event);
        }
        self.scheduled.insert(task_id.to_string());
        ids
    }

    pub fn is_scheduled(&self, task_id: &str) -> bool {
        self.scheduled.contains(task_id)
    }

    /// End of the last event placed for `task_id`.
    pub fn finish_time(&self, task_id: &str) -> Option<NaiveDateTime> {
        self.finish_times.get(task_id).copied()
    }

    /// Most recently committed managed event.
    pub fn last_managed_event(&self) -> Option<&Event> {
        self.managed_events().last()
    }

    pub fn managed_events(&self) -> &[Event] {
        &self.events[self.existing..]
    }

    pub fn into_managed_events(mut self) -> Vec<Event> {
        self.events.split_off(self.existing)
    }

    /// Earliest start allowed by `task`'s dependencies: the latest dependency
    /// finish plus the task's buffer.
    pub fn dependency_floor(&self, task: &Task) -> Option<NaiveDateTime> {
        task.constraints
            .dependencies
            .iter()
            .filter_map(|dep| self.finish_time(dep))
            .max()
            .map(|finish| finish + Duration::minutes(task.constraints.required_buffer))
    }

    /// Committed events intersecting `[from, to)`, ordered by start.
    pub fn events_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Event> {
        let indices: BTreeSet<usize> = self
            .by_day
            .range(from.date()..=to.date())
            .flat_map(|(_, indices)| indices.iter().copied())
            .collect();

        let mut events: Vec<Event> = indices
            .into_iter()
            .map(|i| &self.events[i])
            .filter(|e| e.overlaps(from, to))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        events
    }

    /// Copy of `zone` holding the committed events that touch it or its
    /// `margin`-minute surroundings.
    pub fn zone_view(&self, zone: &TimeBlockZone, margin: i64) -> TimeBlockZone {
        let margin = Duration::minutes(margin);
        let events = self.events_between(zone.start - margin, zone.end + margin);
        zone.clone().with_events(events)
    }
}
