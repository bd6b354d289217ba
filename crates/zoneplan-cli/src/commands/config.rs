use std::path::{Path, PathBuf};

use clap::Subcommand;
use zoneplan_core::{ConfigError, PlannerConfig};

use super::load_config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the whole config, or one value
    Show {
        /// Dot-separated key (e.g. "strategy.horizon_days", "zones.0.start")
        key: Option<String>,
    },
    /// Print the config file location
    Path,
    /// Write the default config
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(action: ConfigAction, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show { key: None } => {
            let config = load_config(config_path)?;
            print!("{}", config.to_toml_string()?);
        }
        ConfigAction::Show { key: Some(key) } => {
            let config = load_config(config_path)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Path => {
            println!("{}", config_file(config_path)?.display());
        }
        ConfigAction::Init { force } => {
            let path = config_file(config_path)?;
            if path.exists() && !force {
                return Err(format!(
                    "config already exists at {} (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
            PlannerConfig::default().save_to(&path)?;
            println!("wrote default config to {}", path.display());
        }
    }
    Ok(())
}

fn config_file(config_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => PlannerConfig::path(),
    }
}
