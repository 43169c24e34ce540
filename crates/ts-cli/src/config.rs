//! Configuration loading and management.

use std::path::{Path, PathBuf};

use chrono::{NaiveTime, TimeDelta};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use ts_core::authlog::{DEFAULT_LOG_BASE_NAME, DEFAULT_LOG_DIR};
use ts_core::{LogSource, WorkSettings};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Directory holding the auth logs.
    pub log_dir: PathBuf,
    /// Base name of the current auth log; rotated copies add `.N[.gz]`.
    pub log_base_name: String,
    #[serde(with = "hh_mm")]
    pub standard_start: NaiveTime,
    #[serde(with = "hh_mm")]
    pub standard_quit: NaiveTime,
    pub required_day_minutes: i64,
    pub round_interval: u32,
    pub round_threshold: u32,
    pub work_weekend: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let settings = WorkSettings::default();
        Self {
            database_path: data_dir.join("timesheet.db"),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_base_name: DEFAULT_LOG_BASE_NAME.to_string(),
            standard_start: settings.standard_start,
            standard_quit: settings.standard_quit,
            required_day_minutes: settings.required_day.num_minutes(),
            round_interval: settings.round_interval,
            round_threshold: settings.round_threshold,
            work_weekend: settings.work_weekend,
            default_project: settings.default_project,
            debug: false,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment
                .merge(Toml::file(config_dir.join("config.toml")))
                .merge(Yaml::file(config_dir.join("config.yaml")))
                .merge(Json::file(config_dir.join("config.json")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        // Load from environment variables (TS_*)
        figment = figment.merge(Env::prefixed("TS_"));

        figment.extract()
    }

    /// Work rules for backfill and the flex balance.
    pub fn work_settings(&self) -> WorkSettings {
        WorkSettings {
            standard_start: self.standard_start,
            standard_quit: self.standard_quit,
            required_day: TimeDelta::minutes(self.required_day_minutes),
            round_interval: self.round_interval,
            round_threshold: self.round_threshold,
            work_weekend: self.work_weekend,
            default_project: self.default_project.clone(),
        }
    }

    pub fn log_source(&self) -> LogSource {
        LogSource::new(&self.log_dir, &self.log_base_name)
    }
}

/// Serializes clock times as `HH:MM`.
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(value.trim(), FORMAT)
            .map_err(|err| de::Error::custom(format!("invalid time {value:?} (expected HH:MM): {err}")))
    }
}

/// Returns the platform-specific config directory for ts.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ts"))
}

/// Returns the platform-specific data directory for ts.
///
/// On Linux: `~/.local/share/ts`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn test_dirs_data_path_ends_with_ts() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "ts");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("timesheet.db"));
        assert_eq!(config.log_dir, PathBuf::from("/var/log"));
    }

    #[test]
    fn test_default_work_settings() {
        let settings = Config::default().work_settings();
        assert_eq!(settings, WorkSettings::default());
        assert_eq!(settings.required_day, TimeDelta::minutes(450));
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(
            &path,
            r#"
log_dir = "/tmp/logs"
standard_start = "08:30"
round_threshold = 0
default_project = "ops"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(
            config.standard_start,
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(config.round_threshold, 0);
        assert_eq!(config.default_project.as_deref(), Some("ops"));
        // Untouched fields keep their defaults.
        assert_eq!(config.round_interval, 15);
    }

    #[test]
    fn test_load_from_json_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("custom.json");
        fs::write(&path, r#"{"work_weekend": true, "standard_quit": "17:00"}"#).unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert!(config.work_weekend);
        assert_eq!(
            config.standard_quit,
            NaiveTime::from_hms_opt(17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_invalid_time_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, r#"standard_start = "9am""#).unwrap();

        let err = Config::load_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("expected HH:MM"));
    }
}
