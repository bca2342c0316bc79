use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const CONFIG_FILE: &str = "todo-reminder.json";

/// Longest check interval accepted, one year.
const MAX_CHECK_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Longest startup delay accepted, one day.
const MAX_STARTUP_DELAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Task list, one task per line.
    pub tasks_file: PathBuf,
    /// Where log output goes; `null` turns logging off.
    pub log_file: Option<PathBuf>,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub startup_check_delay_ms: u64,
    pub check_interval_secs: u64,
    /// Skip reminders already shown for the same task earlier that day.
    pub dedupe_reminders: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_file: PathBuf::from("tasks.txt"),
            log_file: Some(PathBuf::from("todo-reminder.log")),
            log_level: "info".to_string(),
            startup_check_delay_ms: 1000,
            check_interval_secs: 24 * 60 * 60,
            dedupe_reminders: true,
        }
    }
}

impl Config {
    /// Reads `path` if it exists, falling back to defaults otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_CHECK_INTERVAL_SECS).contains(&self.check_interval_secs),
            "check_interval_secs must be between 1 and {MAX_CHECK_INTERVAL_SECS}, got {}",
            self.check_interval_secs
        );
        ensure!(
            self.startup_check_delay_ms <= MAX_STARTUP_DELAY_MS,
            "startup_check_delay_ms must be at most {MAX_STARTUP_DELAY_MS}, got {}",
            self.startup_check_delay_ms
        );
        Ok(())
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_check_delay_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}
