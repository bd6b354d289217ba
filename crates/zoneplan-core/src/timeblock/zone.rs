//! Work zones.
//!
//! A zone is a window reserved for one kind of work at one energy level. Zones
//! are usually written as a single-day template and projected across the
//! planning horizon with [`TimeBlockZone::project_across`].

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{check_range, events_within, Event};
use crate::error::ValidationError;
use crate::task::{EnergyLevel, ZoneType};

/// Placement rules a zone imposes on tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneRules {
    pub zone_type: ZoneType,
    pub energy_level: EnergyLevel,
    /// Shortest task the zone accepts (minutes)
    pub min_duration: i64,
    /// Idle minutes around every placed event
    pub buffer_required: i64,
    /// Longest task the zone accepts, if capped
    pub max_duration: Option<i64>,
}

/// A time window dedicated to one zone type and energy level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeBlockZone {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub zone_type: ZoneType,
    pub energy_level: EnergyLevel,
    #[serde(default)]
    pub min_duration: i64,
    #[serde(default)]
    pub buffer_required: i64,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl TimeBlockZone {
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        zone_type: ZoneType,
        energy_level: EnergyLevel,
        min_duration: i64,
        buffer_required: i64,
    ) -> Result<Self, ValidationError> {
        check_range(start, end)?;
        if min_duration < 0 || buffer_required < 0 {
            return Err(ValidationError::InvalidValue {
                field: "zone".to_string(),
                message: "min_duration and buffer_required must be non-negative".to_string(),
            });
        }
        Ok(Self {
            start,
            end,
            zone_type,
            energy_level,
            min_duration,
            buffer_required,
            events: Vec::new(),
        })
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    pub fn rules(&self) -> ZoneRules {
        ZoneRules {
            zone_type: self.zone_type,
            energy_level: self.energy_level,
            min_duration: self.min_duration,
            buffer_required: self.buffer_required,
            max_duration: None,
        }
    }

    /// Span in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start <= time && time < self.end
    }

    /// Events overlapping `[start, start + duration)` or falling inside the
    /// zone's buffer margin around it.
    pub fn get_conflicts(&self, start: NaiveDateTime, duration: i64) -> Vec<&Event> {
        let end = start + Duration::minutes(duration);
        events_within(&self.events, start, end, self.buffer_required)
    }

    /// Whether a task of `duration` minutes may start at `start`.
    pub fn is_available(&self, start: NaiveDateTime, duration: i64) -> bool {
        if duration < self.min_duration {
            return false;
        }
        let end = start + Duration::minutes(duration);
        if start < self.start || end > self.end {
            return false;
        }
        self.get_conflicts(start, duration).is_empty()
    }

    /// Copy single-day zone templates onto each of `days` consecutive days.
    ///
    /// Every template keeps its time of day and span; the first template's date
    /// anchors day zero. Projected zones start with no events.
    pub fn project_across(templates: &[TimeBlockZone], days: u32) -> Vec<TimeBlockZone> {
        let Some(first) = templates.first() else {
            return Vec::new();
        };
        let anchor = first.start.date();

        (0..i64::from(days))
            .flat_map(|day| {
                let date = anchor + Duration::days(day);
                templates.iter().map(move |zone| {
                    let start = date.and_time(zone.start.time());
                    TimeBlockZone {
                        start,
                        end: start + (zone.end - zone.start),
                        zone_type: zone.zone_type,
                        energy_level: zone.energy_level,
                        min_duration: zone.min_duration,
                        buffer_required: zone.buffer_required,
                        events: Vec::new(),
                    }
                })
            })
            .collect()
    }
}

/// Kind of administrative work an admin zone is reserved for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdminZoneKind {
    Email,
    Planning,
    Review,
}

/// Preferred part of the day for an admin zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminZoneConfig {
    pub kind: AdminZoneKind,
    pub preferred_time: DayPart,
    /// Longest admin task the zone accepts (minutes)
    pub max_duration: i64,
    pub required_buffer: i64,
    /// Energy level the zone runs at
    pub energy_threshold: EnergyLevel,
}

/// An ADMIN zone with a cap on task length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminTimeBlockZone {
    pub zone: TimeBlockZone,
    pub config: AdminZoneConfig,
}

impl AdminTimeBlockZone {
    /// Admin zones accept tasks of 15 minutes or more.
    pub const MIN_DURATION: i64 = 15;

    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        config: AdminZoneConfig,
    ) -> Result<Self, ValidationError> {
        let zone = TimeBlockZone::new(
            start,
            end,
            ZoneType::Admin,
            config.energy_threshold,
            Self::MIN_DURATION,
            config.required_buffer,
        )?;
        Ok(Self { zone, config })
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.zone.events = events;
        self
    }

    pub fn rules(&self) -> ZoneRules {
        ZoneRules {
            max_duration: Some(self.config.max_duration),
            ..self.zone.rules()
        }
    }

    pub fn is_available(&self, start: NaiveDateTime, duration: i64) -> bool {
        duration <= self.config.max_duration && self.zone.is_available(start, duration)
    }
}
