//! System configuration (`~/.config/savepoint/config.toml`)
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! `SP_CONFIG` points at an alternative file.

use anyhow::{Context, Result};
use coordinator::{AutosaveConfig, BackoffPolicy};
use journal::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SP_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub autosave: AutosaveSection,
    pub snapshots: SnapshotSection,
    pub gc: GcSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSection {
    pub debounce_ms: u64,
    pub max_retries: u32,
    pub backoff: BackoffKind,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// 0 disables the per-attempt timeout
    pub attempt_timeout_ms: u64,
}

impl Default for AutosaveSection {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            max_retries: 3,
            backoff: BackoffKind::Exponential,
            base_delay_ms: 250,
            max_delay_ms: 5000,
            attempt_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSection {
    /// Record an autosave snapshot every N successful saves (0 = off)
    pub autosnapshot_every: u64,
}

impl Default for SnapshotSection {
    fn default() -> Self {
        Self {
            autosnapshot_every: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcSection {
    pub retain_count: usize,
    /// 0 = no time window
    pub retain_hours: u64,
    pub retain_labeled: bool,
}

impl Default for GcSection {
    fn default() -> Self {
        Self {
            retain_count: 200,
            retain_hours: 7 * 24,
            retain_labeled: true,
        }
    }
}

/// Every settable key, in display order
pub const KEYS: &[&str] = &[
    "autosave.debounce_ms",
    "autosave.max_retries",
    "autosave.backoff",
    "autosave.base_delay_ms",
    "autosave.max_delay_ms",
    "autosave.attempt_timeout_ms",
    "snapshots.autosnapshot_every",
    "gc.retain_count",
    "gc.retain_hours",
    "gc.retain_labeled",
];

fn check_range(key: &str, value: u64, min: u64, max: u64) -> Result<()> {
    if value < min || value > max {
        anyhow::bail!("{} must be between {} and {} (got {})", key, min, max, value);
    }
    Ok(())
}

impl SystemConfig {
    /// Check every value against its valid range
    pub fn validate(&self) -> Result<()> {
        let a = &self.autosave;
        check_range("autosave.debounce_ms", a.debounce_ms, 10, 60_000)?;
        check_range("autosave.max_retries", a.max_retries as u64, 1, 20)?;
        check_range("autosave.base_delay_ms", a.base_delay_ms, 10, 60_000)?;
        check_range("autosave.max_delay_ms", a.max_delay_ms, a.base_delay_ms, 600_000)?;
        if a.attempt_timeout_ms != 0 {
            check_range("autosave.attempt_timeout_ms", a.attempt_timeout_ms, 100, 600_000)?;
        }
        check_range(
            "snapshots.autosnapshot_every",
            self.snapshots.autosnapshot_every,
            0,
            10_000,
        )?;
        check_range("gc.retain_count", self.gc.retain_count as u64, 1, 1_000_000)?;
        check_range("gc.retain_hours", self.gc.retain_hours, 0, 8760)?;

        // The coordinator has its own checks; surface them here too
        self.autosave_config()
            .validate()
            .context("Invalid autosave settings")?;
        Ok(())
    }

    /// Coordinator settings described by the `[autosave]` section
    pub fn autosave_config(&self) -> AutosaveConfig {
        let a = &self.autosave;
        let backoff = match a.backoff {
            BackoffKind::Fixed => BackoffPolicy::Fixed(Duration::from_millis(a.base_delay_ms)),
            BackoffKind::Exponential => BackoffPolicy::Exponential {
                base: Duration::from_millis(a.base_delay_ms),
                max: Duration::from_millis(a.max_delay_ms),
            },
        };
        let timeout = (a.attempt_timeout_ms > 0).then(|| Duration::from_millis(a.attempt_timeout_ms));

        AutosaveConfig::default()
            .with_debounce(Duration::from_millis(a.debounce_ms))
            .with_max_retries(a.max_retries)
            .with_backoff(backoff)
            .with_attempt_timeout(timeout)
    }

    /// Snapshot retention described by the `[gc]` section
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            retain_count: self.gc.retain_count,
            retain_window_ms: self.gc.retain_hours * 60 * 60 * 1000,
            retain_labeled: self.gc.retain_labeled,
        }
    }

    /// Read one value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "autosave.debounce_ms" => self.autosave.debounce_ms.to_string(),
            "autosave.max_retries" => self.autosave.max_retries.to_string(),
            "autosave.backoff" => match self.autosave.backoff {
                BackoffKind::Fixed => "fixed".to_string(),
                BackoffKind::Exponential => "exponential".to_string(),
            },
            "autosave.base_delay_ms" => self.autosave.base_delay_ms.to_string(),
            "autosave.max_delay_ms" => self.autosave.max_delay_ms.to_string(),
            "autosave.attempt_timeout_ms" => self.autosave.attempt_timeout_ms.to_string(),
            "snapshots.autosnapshot_every" => self.snapshots.autosnapshot_every.to_string(),
            "gc.retain_count" => self.gc.retain_count.to_string(),
            "gc.retain_hours" => self.gc.retain_hours.to_string(),
            "gc.retain_labeled" => self.gc.retain_labeled.to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'sp config list' to see available keys.",
                key
            ),
        };
        Ok(value)
    }

    /// Set one value by dotted key, then validate the whole config
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        const INT: &str = "Invalid value: must be a non-negative integer";
        const BOOL: &str = "Invalid value: must be 'true' or 'false'";

        match key {
            "autosave.debounce_ms" => self.autosave.debounce_ms = value.parse().context(INT)?,
            "autosave.max_retries" => self.autosave.max_retries = value.parse().context(INT)?,
            "autosave.backoff" => {
                self.autosave.backoff = match value {
                    "fixed" => BackoffKind::Fixed,
                    "exponential" => BackoffKind::Exponential,
                    _ => anyhow::bail!("Invalid value: must be 'fixed' or 'exponential'"),
                }
            }
            "autosave.base_delay_ms" => self.autosave.base_delay_ms = value.parse().context(INT)?,
            "autosave.max_delay_ms" => self.autosave.max_delay_ms = value.parse().context(INT)?,
            "autosave.attempt_timeout_ms" => {
                self.autosave.attempt_timeout_ms = value.parse().context(INT)?
            }
            "snapshots.autosnapshot_every" => {
                self.snapshots.autosnapshot_every = value.parse().context(INT)?
            }
            "gc.retain_count" => self.gc.retain_count = value.parse().context(INT)?,
            "gc.retain_hours" => self.gc.retain_hours = value.parse().context(INT)?,
            "gc.retain_labeled" => self.gc.retain_labeled = value.parse().context(BOOL)?,
            _ => anyhow::bail!(
                "Unknown config key: {}. Use 'sp config list' to see available keys.",
                key
            ),
        }

        self.validate().context("Invalid configuration value")
    }
}

/// Location of the config file (`SP_CONFIG` wins)
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("savepoint").join("config.toml"))
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load() -> Result<SystemConfig> {
    let Some(path) = config_file_path() else {
        return Ok(SystemConfig::default());
    };
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn parse(contents: &str) -> Result<SystemConfig> {
    let config: SystemConfig = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Write the config file, creating its directory
pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(())
}

/// Create the config file with defaults if it does not exist
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save(&SystemConfig::default())?;
    }
    Ok(path)
}

/// Commented example config
pub fn example_config() -> &'static str {
    r#"# Savepoint configuration
# Location: ~/.config/savepoint/config.toml (override with SP_CONFIG)

[autosave]
# Quiet period after the last edit before saving (10-60000)
debounce_ms = 1000
# Attempts per save, including the first (1-20)
max_retries = 3
# "fixed" waits base_delay_ms between attempts;
# "exponential" doubles it per retry up to max_delay_ms
backoff = "exponential"
base_delay_ms = 250
max_delay_ms = 5000
# Per-attempt timeout (0 = no timeout)
attempt_timeout_ms = 30000

[snapshots]
# Record an autosave snapshot every N successful saves (0 = off)
autosnapshot_every = 20

[gc]
# Newest snapshots kept per workspace
retain_count = 200
# Snapshots younger than this are kept (0 = no time window)
retain_hours = 168
# Never collect labeled snapshots
retain_labeled = true
"#
}
