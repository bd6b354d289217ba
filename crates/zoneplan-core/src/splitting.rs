//! Split planning for long tasks.
//!
//! Two independent, side-effect-free analyses: how many chunks a task should
//! be cut into, and which zones are the cheapest places to put them.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::task::{EnergyLevel, ZoneType};
use crate::timeblock::TimeBlockZone;

/// Preferred chunk length in minutes.
pub const DEFAULT_PREFERRED_CHUNK_MINUTES: i64 = 120;

/// Buffer assumed between consecutive chunks.
const INTER_CHUNK_BUFFER: i64 = 15;
/// Buffer assumed on each side of a chunk against neighbouring events.
const EDGE_BUFFER: i64 = 15;

/// Result of [`SplitStrategy::calculate_optimal_split`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitMetrics {
    pub optimal_chunk_count: u32,
    /// Minutes per chunk (the last chunk may be shorter)
    pub chunk_duration: i64,
    /// Estimated buffer minutes the chunks consume
    pub total_buffer_time: i64,
    /// Share of chunk capacity filled by the task, in `0.0..=1.0`
    pub zone_utilization: f64,
}

/// A candidate zone for placing a chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkPlacement {
    pub start_time: NaiveDateTime,
    /// Full zone span in minutes
    pub duration: i64,
    /// Index of the zone in the analyzed slice
    pub zone_index: usize,
    pub zone_type: ZoneType,
    pub energy_level: EnergyLevel,
    /// Lower is more desirable
    pub energy_cost: f64,
    pub context_switches: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SplitStrategy {
    pub preferred_chunk_minutes: i64,
}

impl Default for SplitStrategy {
    fn default() -> Self {
        Self {
            preferred_chunk_minutes: DEFAULT_PREFERRED_CHUNK_MINUTES,
        }
    }
}

fn div_ceil(value: i64, divisor: i64) -> i64 {
    (value + divisor - 1) / divisor
}

impl SplitStrategy {
    pub fn new(preferred_chunk_minutes: i64) -> Self {
        Self {
            preferred_chunk_minutes: preferred_chunk_minutes.max(1),
        }
    }

    /// Chunk count and size for a task of `total_duration` minutes.
    ///
    /// Returns `None` when there are no zones or nothing to split. The
    /// minimum chunk is not applied here; placement enforces it.
    pub fn calculate_optimal_split(
        &self,
        total_duration: i64,
        available_zones: &[TimeBlockZone],
        _min_chunk_duration: i64,
        max_splits: u32,
    ) -> Option<SplitMetrics> {
        if available_zones.is_empty() || total_duration <= 0 {
            return None;
        }

        let count = div_ceil(total_duration, self.preferred_chunk_minutes)
            .clamp(1, i64::from(max_splits) + 1);
        let chunk = div_ceil(total_duration, count);

        let total_buffer_time = (count - 1) * INTER_CHUNK_BUFFER + count * EDGE_BUFFER * 2;
        let zone_utilization = (total_duration as f64 / (count * chunk) as f64).min(1.0);

        let metrics = SplitMetrics {
            optimal_chunk_count: count as u32,
            chunk_duration: chunk,
            total_buffer_time,
            zone_utilization,
        };
        tracing::debug!(
            total_duration,
            chunks = metrics.optimal_chunk_count,
            chunk_duration = metrics.chunk_duration,
            "calculated split"
        );
        Some(metrics)
    }

    /// Chunk length used when placing a splittable task: about half the task,
    /// capped at the preferred length, never below the task's minimum chunk.
    pub fn chunk_size(&self, duration: i64, min_chunk_duration: i64) -> i64 {
        (duration / 2)
            .min(self.preferred_chunk_minutes)
            .max(min_chunk_duration)
    }

    /// Rank the zones starting within `days_ahead` days of the earliest zone
    /// by how cheap they are to work in.
    ///
    /// Deep high-energy zones cost 0.7, other deep zones 0.9 and everything
    /// else 0.5. Equal costs keep chronological order.
    pub fn analyze_zone_patterns(
        &self,
        zones: &[TimeBlockZone],
        days_ahead: u32,
    ) -> Vec<ChunkPlacement> {
        let Some(first_start) = zones.iter().map(|z| z.start).min() else {
            return Vec::new();
        };
        let horizon_end = first_start + Duration::days(i64::from(days_ahead));

        let mut placements: Vec<ChunkPlacement> = zones
            .iter()
            .enumerate()
            .filter(|(_, z)| z.start < horizon_end)
            .map(|(zone_index, zone)| ChunkPlacement {
                start_time: zone.start,
                duration: zone.duration_minutes(),
                zone_index,
                zone_type: zone.zone_type,
                energy_level: zone.energy_level,
                energy_cost: energy_cost(zone.zone_type, zone.energy_level),
                context_switches: 0,
            })
            .collect();

        placements.sort_by_key(|p| p.start_time);
        placements.sort_by(|a, b| a.energy_cost.total_cmp(&b.energy_cost));
        placements
    }
}

fn energy_cost(zone_type: ZoneType, energy_level: EnergyLevel) -> f64 {
    match (zone_type, energy_level) {
        (ZoneType::Deep, EnergyLevel::High) => 0.7,
        (ZoneType::Deep, _) => 0.9,
        _ => 0.5,
    }
}
