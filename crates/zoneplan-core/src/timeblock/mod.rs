//! Calendar real estate: bounded time blocks, work zones and placed events.
//!
//! All blocks are half-open intervals `[start, end)`. A block is either a
//! plain window, a work zone with placement rules, or an admin zone that
//! adds a maximum task length on top of the zone rules.

mod zone;

pub use zone::{AdminTimeBlockZone, AdminZoneConfig, AdminZoneKind, DayPart, TimeBlockZone, ZoneRules};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Ownership class of a block or event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TimeBlockType {
    /// Externally owned, never moved by the scheduler
    Fixed,
    /// Produced and owned by the scheduler
    Managed,
    /// Work zone
    Zone,
}

/// A placed calendar entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    /// Task this event was scheduled for (chunks carry their parent's id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: TimeBlockType,
    /// Minutes this event demands around itself
    #[serde(default)]
    pub buffer_required: i64,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kind: TimeBlockType,
    ) -> Self {
        Self {
            id: id.into(),
            task_id: None,
            title: title.into(),
            start,
            end,
            kind,
            buffer_required: 0,
        }
    }

    /// Externally owned event.
    pub fn fixed(
        id: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self::new(id, title, start, end, TimeBlockType::Fixed)
    }

    pub fn with_buffer(mut self, minutes: i64) -> Self {
        self.buffer_required = minutes;
        self
    }

    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn is_managed(&self) -> bool {
        self.kind == TimeBlockType::Managed
    }

    /// Duration in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether this event intersects `[start, end)`.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && self.end > start
    }
}

/// Events intersecting `[start - margin, end + margin)`.
pub(crate) fn events_within(
    events: &[Event],
    start: NaiveDateTime,
    end: NaiveDateTime,
    margin: i64,
) -> Vec<&Event> {
    let from = start - Duration::minutes(margin);
    let to = end + Duration::minutes(margin);
    events.iter().filter(|e| e.overlaps(from, to)).collect()
}

pub(crate) fn check_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), ValidationError> {
    if end <= start {
        return Err(ValidationError::InvalidTimeRange { start, end });
    }
    Ok(())
}

/// A generic bounded window holding events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlainBlock {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: TimeBlockType,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl PlainBlock {
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        kind: TimeBlockType,
    ) -> Result<Self, ValidationError> {
        check_range(start, end)?;
        Ok(Self {
            start,
            end,
            kind,
            events: Vec::new(),
        })
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    /// Events overlapping `[start, start + duration)`.
    pub fn get_conflicts(&self, start: NaiveDateTime, duration: i64) -> Vec<&Event> {
        events_within(&self.events, start, start + Duration::minutes(duration), 0)
    }

    /// Whether the interval fits inside the block without conflicts.
    pub fn is_available(&self, start: NaiveDateTime, duration: i64) -> bool {
        let end = start + Duration::minutes(duration);
        if start < self.start || end > self.end {
            return false;
        }
        self.get_conflicts(start, duration).is_empty()
    }
}

/// Any block a placement can be checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBlock {
    Plain(PlainBlock),
    Zone(TimeBlockZone),
    AdminZone(AdminTimeBlockZone),
}

impl TimeBlock {
    pub fn start(&self) -> NaiveDateTime {
        match self {
            TimeBlock::Plain(b) => b.start,
            TimeBlock::Zone(z) => z.start,
            TimeBlock::AdminZone(a) => a.zone.start,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        match self {
            TimeBlock::Plain(b) => b.end,
            TimeBlock::Zone(z) => z.end,
            TimeBlock::AdminZone(a) => a.zone.end,
        }
    }

    pub fn kind(&self) -> TimeBlockType {
        match self {
            TimeBlock::Plain(b) => b.kind,
            TimeBlock::Zone(_) | TimeBlock::AdminZone(_) => TimeBlockType::Zone,
        }
    }

    pub fn events(&self) -> &[Event] {
        match self {
            TimeBlock::Plain(b) => &b.events,
            TimeBlock::Zone(z) => &z.events,
            TimeBlock::AdminZone(a) => &a.zone.events,
        }
    }

    /// Placement rules, present only for zone variants.
    pub fn zone_rules(&self) -> Option<ZoneRules> {
        match self {
            TimeBlock::Plain(_) => None,
            TimeBlock::Zone(z) => Some(z.rules()),
            TimeBlock::AdminZone(a) => Some(a.rules()),
        }
    }

    /// Buffer the block itself imposes around placed events.
    pub fn buffer_required(&self) -> i64 {
        self.zone_rules().map_or(0, |r| r.buffer_required)
    }

    pub fn get_conflicts(&self, start: NaiveDateTime, duration: i64) -> Vec<&Event> {
        match self {
            TimeBlock::Plain(b) => b.get_conflicts(start, duration),
            TimeBlock::Zone(z) => z.get_conflicts(start, duration),
            TimeBlock::AdminZone(a) => a.zone.get_conflicts(start, duration),
        }
    }

    pub fn is_available(&self, start: NaiveDateTime, duration: i64) -> bool {
        match self {
            TimeBlock::Plain(b) => b.is_available(start, duration),
            TimeBlock::Zone(z) => z.is_available(start, duration),
            TimeBlock::AdminZone(a) => a.is_available(start, duration),
        }
    }
}

impl From<PlainBlock> for TimeBlock {
    fn from(block: PlainBlock) -> Self {
        TimeBlock::Plain(block)
    }
}

impl From<TimeBlockZone> for TimeBlock {
    fn from(zone: TimeBlockZone) -> Self {
        TimeBlock::Zone(zone)
    }
}

impl From<AdminTimeBlockZone> for TimeBlock {
    fn from(zone: AdminTimeBlockZone) -> Self {
        TimeBlock::AdminZone(zone)
    }
}
