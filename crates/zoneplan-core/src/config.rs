//! TOML-based planner configuration.
//!
//! Holds strategy tuning, the scheduler's planning window and the daily zone
//! templates. Every field has a default, so an empty file is a valid config.
//!
//! Configuration is stored at `~/.config/zoneplan/config.toml`.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::scheduler::SchedulerConfig;
use crate::scheduling::StrategyConfig;
use crate::task::{EnergyLevel, ZoneType};
use crate::timeblock::TimeBlockZone;

/// Serde adapter for `"HH:MM"` times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .map_err(|e| D::Error::custom(format!("invalid time '{raw}' (expected HH:MM): {e}")))
    }
}

pub(crate) fn clock_time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// A daily zone expressed as times of day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZoneTemplate {
    pub zone_type: ZoneType,
    pub energy_level: EnergyLevel,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    #[serde(default)]
    pub min_duration: i64,
    #[serde(default)]
    pub buffer_required: i64,
}

impl Default for ZoneTemplate {
    /// Morning deep-work zone, 09:00-13:00.
    fn default() -> Self {
        Self {
            zone_type: ZoneType::Deep,
            energy_level: EnergyLevel::High,
            start: clock_time(9, 0),
            end: clock_time(13, 0),
            min_duration: 30,
            buffer_required: 15,
        }
    }
}

impl ZoneTemplate {
    /// The zone this template describes on `date`.
    pub fn on(&self, date: NaiveDate) -> Result<TimeBlockZone, ValidationError> {
        TimeBlockZone::new(
            date.and_time(self.start),
            date.and_time(self.end),
            self.zone_type,
            self.energy_level,
            self.min_duration,
            self.buffer_required,
        )
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlannerConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Daily zones; the default deep-work zone is used when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<ZoneTemplate>,
}

/// Returns `~/.config/zoneplan[-dev]/` based on ZONEPLAN_ENV.
///
/// Set ZONEPLAN_ENV=dev to use the development directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or the
/// directory cannot be created.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir().ok_or(ConfigError::NoConfigDir)?.join(".config");

    let env = std::env::var("ZONEPLAN_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base_dir.join("zoneplan-dev")
    } else {
        base_dir.join("zoneplan")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

impl PlannerConfig {
    /// Location of the user configuration file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Reject values no scheduler can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy.horizon_days == 0 {
            return Err(invalid("strategy.horizon_days", "must be at least 1"));
        }
        if self.strategy.preferred_chunk_minutes <= 0 {
            return Err(invalid("strategy.preferred_chunk_minutes", "must be positive"));
        }
        if self.scheduler.planning_horizon_days == 0 {
            return Err(invalid("scheduler.planning_horizon_days", "must be at least 1"));
        }

        for (i, zone) in self.zones.iter().enumerate() {
            if zone.end <= zone.start {
                return Err(invalid(
                    &format!("zones[{i}]"),
                    &format!("end {} must be after start {}", zone.end, zone.start),
                ));
            }
            if zone.min_duration < 0 || zone.buffer_required < 0 {
                return Err(invalid(
                    &format!("zones[{i}]"),
                    "min_duration and buffer_required must be non-negative",
                ));
            }
        }

        Ok(())
    }

    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |e: std::io::Error| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(save_failed)?;
        }
        std::fs::write(path, self.to_toml_string()?).map_err(save_failed)
    }

    /// Load the user configuration, writing the default one if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            return Self::load_from(&path);
        }

        let config = Self::default();
        config.save_to(&path)?;
        Ok(config)
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return None;
        }

        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = match current {
                serde_json::Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }

        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Zone templates in effect: the configured ones, or the default
    /// deep-work zone.
    pub fn zone_templates(&self) -> Vec<ZoneTemplate> {
        if self.zones.is_empty() {
            vec![ZoneTemplate::default()]
        } else {
            self.zones.clone()
        }
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::BatchPolicy;

    #[test]
    fn default_config_roundtrip() {
        let cfg = PlannerConfig::default();
        let toml_str = cfg.to_toml_string().unwrap();
        let parsed = PlannerConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.strategy.horizon_days, 7);
        assert_eq!(parsed.scheduler.day_start, clock_time(9, 0));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = PlannerConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PlannerConfig::default());
        assert_eq!(cfg.zone_templates(), vec![ZoneTemplate::default()]);
    }

    #[test]
    fn parses_zones_and_policy() {
        let cfg = PlannerConfig::from_toml_str(
            r#"
            [strategy]
            horizon_days = 3
            batch_policy = "halt_on_failure"

            [scheduler]
            day_start = "08:30"

            [[zones]]
            zone_type = "deep"
            energy_level = "high"
            start = "08:30"
            end = "12:00"
            min_duration = 45
            buffer_required = 10

            [[zones]]
            zone_type = "admin"
            energy_level = "low"
            start = "16:00"
            end = "17:30"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.strategy.horizon_days, 3);
        assert_eq!(cfg.strategy.preferred_chunk_minutes, 120);
        assert_eq!(cfg.strategy.batch_policy, BatchPolicy::HaltOnFailure);
        assert_eq!(cfg.scheduler.day_start, clock_time(8, 30));
        assert_eq!(cfg.scheduler.planning_horizon_days, 7);
        assert_eq!(cfg.zones.len(), 2);
        assert_eq!(cfg.zones[1].zone_type, ZoneType::Admin);
        assert_eq!(cfg.zones[1].buffer_required, 0);
    }

    #[test]
    fn rejects_bad_time_format() {
        let err = PlannerConfig::from_toml_str("[scheduler]\nday_start = \"9am\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn rejects_inverted_zone() {
        let err = PlannerConfig::from_toml_str(
            r#"
            [[zones]]
            zone_type = "light"
            energy_level = "medium"
            start = "14:00"
            end = "13:00"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "zones[0]"));
    }

    #[test]
    fn rejects_zero_horizon() {
        let err = PlannerConfig::from_toml_str("[strategy]\nhorizon_days = 0\n").unwrap_err();
        assert!(err.to_string().contains("strategy.horizon_days"));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let mut cfg = PlannerConfig::default();
        cfg.zones.push(ZoneTemplate::default());

        assert_eq!(cfg.get("strategy.horizon_days").as_deref(), Some("7"));
        assert_eq!(cfg.get("strategy.batch_policy").as_deref(), Some("continue"));
        assert_eq!(cfg.get("scheduler.day_start").as_deref(), Some("09:00"));
        assert_eq!(cfg.get("zones.0.zone_type").as_deref(), Some("deep"));
        assert!(cfg.get("strategy.missing").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn zone_template_on_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let zone = ZoneTemplate::default().on(date).unwrap();
        assert_eq!(zone.start, date.and_hms_opt(9, 0, 0).unwrap());
        assert_eq!(zone.end, date.and_hms_opt(13, 0, 0).unwrap());
        assert_eq!(zone.min_duration, 30);
        assert_eq!(zone.buffer_required, 15);
    }
}
