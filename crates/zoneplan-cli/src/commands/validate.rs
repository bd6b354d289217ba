use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::Args;
use zoneplan_core::Task;

use super::read_json;

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON file with an array of tasks
    #[arg(long)]
    tasks: PathBuf,
    /// Validate as if it were this local time
    #[arg(long)]
    now: Option<NaiveDateTime>,
}

pub fn run(args: ValidateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let tasks: Vec<Task> = read_json(&args.tasks)?;
    let now = args
        .now
        .unwrap_or_else(|| chrono::Local::now().naive_local());

    let mut invalid = 0;
    for task in &tasks {
        let errors = task.validate_at(now);
        if errors.is_empty() {
            println!("ok       {}", task.id);
            continue;
        }
        invalid += 1;
        for error in errors {
            println!("invalid  {}: {error}", task.id);
        }
    }

    if invalid > 0 {
        return Err(format!("{invalid} of {} tasks invalid", tasks.len()).into());
    }
    Ok(())
}
