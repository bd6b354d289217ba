//! Open-slot search inside a zone.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::timeblock::{Event, TimeBlockZone};

/// A free interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpenSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl OpenSlot {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Free intervals of at least `min_duration` minutes inside `zone`, no earlier
/// than `not_before`.
///
/// Each committed event is padded by `required_buffer` or its own
/// `buffer_required`, whichever is larger, on both sides. Slots are returned
/// in chronological order.
pub fn find_open_slots(
    zone: &TimeBlockZone,
    committed: &[Event],
    min_duration: i64,
    required_buffer: i64,
    not_before: NaiveDateTime,
) -> Vec<OpenSlot> {
    let mut events: Vec<&Event> = committed.iter().collect();
    events.sort_by_key(|e| e.start);

    let min_duration = Duration::minutes(min_duration.max(1));
    let mut slots = Vec::new();
    let mut cursor = zone.start.max(not_before);

    for event in events {
        let padding = Duration::minutes(required_buffer.max(event.buffer_required));
        let gap_end = (event.start - padding).min(zone.end);
        if gap_end - cursor >= min_duration {
            slots.push(OpenSlot {
                start: cursor,
                end: gap_end,
            });
        }
        cursor = cursor.max(event.end + padding);
    }

    if zone.end - cursor >= min_duration {
        slots.push(OpenSlot {
            start: cursor,
            end: zone.end,
        });
    }

    slots
}
