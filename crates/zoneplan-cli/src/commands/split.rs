use std::path::Path;

use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use zoneplan_core::{ChunkPlacement, SplitMetrics, SplitStrategy, TimeBlockZone};

use super::load_config;

#[derive(Args)]
pub struct SplitArgs {
    /// Task duration in minutes
    #[arg(long)]
    duration: i64,
    /// Smallest allowed chunk in minutes
    #[arg(long, default_value_t = 30)]
    min_chunk: i64,
    /// Largest number of splits
    #[arg(long, default_value_t = 4)]
    max_splits: u32,
    /// Day the zone templates are laid on (defaults to today)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct SplitPlan {
    metrics: Option<SplitMetrics>,
    chunk_size: i64,
    zones: Vec<ChunkPlacement>,
}

pub fn run(args: SplitArgs, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let date = args
        .from
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let templates = config
        .zone_templates()
        .iter()
        .map(|t| t.on(date))
        .collect::<Result<Vec<_>, _>>()?;
    let zones = TimeBlockZone::project_across(&templates, config.strategy.horizon_days);

    let strategy = SplitStrategy::new(config.strategy.preferred_chunk_minutes);
    let plan = SplitPlan {
        metrics: strategy.calculate_optimal_split(args.duration, &zones, args.min_chunk, args.max_splits),
        chunk_size: strategy.chunk_size(args.duration, args.min_chunk),
        zones: strategy.analyze_zone_patterns(&zones, config.strategy.horizon_days),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &SplitPlan) {
    match &plan.metrics {
        Some(m) => println!(
            "chunks: {} x {} min (buffer {} min, utilization {:.0}%)",
            m.optimal_chunk_count,
            m.chunk_duration,
            m.total_buffer_time,
            m.zone_utilization * 100.0
        ),
        None => println!("chunks: no zones to split into"),
    }
    println!("placement chunk size: {} min", plan.chunk_size);

    println!("zones by cost:");
    for zone in &plan.zones {
        println!(
            "  {}  {}/{}  {} min  cost {:.2}",
            zone.start_time.format("%Y-%m-%d %H:%M"),
            zone.zone_type,
            zone.energy_level,
            zone.duration,
            zone.energy_cost
        );
    }
}
