use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Args;
use zoneplan_core::{
    Event, FixedClock, InMemoryCalendar, InMemoryTaskSource, ScheduleReport, Scheduler, Task,
    TaskOutcome,
};

use super::{load_config, read_json};

#[derive(Args)]
pub struct PlanArgs {
    /// JSON file with an array of tasks
    #[arg(long)]
    tasks: PathBuf,
    /// JSON file with an array of existing calendar events
    #[arg(long)]
    events: Option<PathBuf>,
    /// Planning horizon in days (defaults to the configured one)
    #[arg(long)]
    horizon: Option<u32>,
    /// Plan as if it were this local time (e.g. 2024-03-04T08:00:00)
    #[arg(long)]
    now: Option<NaiveDateTime>,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: PlanArgs, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let tasks: Vec<Task> = read_json(&args.tasks)?;
    let events: Vec<Event> = match &args.events {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    tracing::debug!(tasks = tasks.len(), events = events.len(), "loaded plan input");

    let mut scheduler = Scheduler::from_config(
        InMemoryTaskSource::new(tasks),
        InMemoryCalendar::with_events(events),
        &config,
    );
    if let Some(now) = args.now {
        scheduler = scheduler.with_clock(FixedClock(now));
    }

    let horizon = args.horizon.unwrap_or(config.scheduler.planning_horizon_days);
    let report = scheduler.schedule_tasks(horizon)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ScheduleReport) {
    for outcome in &report.outcomes {
        match outcome {
            TaskOutcome::Scheduled { task_id, .. } => {
                for event in report.events_for(task_id) {
                    println!(
                        "scheduled  {:<16} {} -> {}  {}",
                        task_id,
                        event.start.format("%Y-%m-%d %H:%M"),
                        event.end.format("%H:%M"),
                        event.title
                    );
                }
            }
            TaskOutcome::Deferred { task_id, reason } => {
                println!("deferred   {task_id:<16} {reason}");
            }
        }
    }

    println!(
        "{} scheduled, {} deferred",
        report.scheduled_task_ids().len(),
        report.deferred().len()
    );
}
