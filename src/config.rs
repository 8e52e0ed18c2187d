use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_REFRESH_INTERVAL_MS: i64 = 2_000;

/// Supported poll cadence range.
pub const MIN_REFRESH_INTERVAL_MS: i64 = 500;
pub const MAX_REFRESH_INTERVAL_MS: i64 = 60_000;

/// Where the client places newly arriving comments. `Inherit` keeps
/// whatever order the host page already renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingMode {
    Ascending,
    Descending,
    #[default]
    Inherit,
}

/// Tuning for the poll and retention cycle. Clients poll every
/// `refresh_interval_ms`; change-log entries are kept for twice that unless
/// an explicit override widens the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub refresh_interval_ms: i64,
    pub ordering: OrderingMode,
    pub retention_window_override_ms: Option<i64>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            ordering: OrderingMode::Inherit,
            retention_window_override_ms: None,
        }
    }
}

impl RealtimeConfig {
    /// How long an entry stays queryable. With the default window a client
    /// polling on schedule has two full cycles to pick any entry up before
    /// the sweep may remove it.
    pub fn retention_window_ms(&self) -> i64 {
        self.retention_window_override_ms
            .unwrap_or(self.refresh_interval_ms * 2)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS
            || self.refresh_interval_ms > MAX_REFRESH_INTERVAL_MS
        {
            anyhow::bail!(
                "refresh_interval_ms must be between {} and {}, got {}",
                MIN_REFRESH_INTERVAL_MS,
                MAX_REFRESH_INTERVAL_MS,
                self.refresh_interval_ms
            );
        }
        if let Some(window) = self.retention_window_override_ms {
            if window < self.refresh_interval_ms {
                anyhow::bail!(
                    "retention_window_override_ms ({}) must not be shorter than refresh_interval_ms ({})",
                    window,
                    self.refresh_interval_ms
                );
            }
        }
        Ok(())
    }

    /// Reads the config from a JSON file, writing and returning the
    /// defaults if the file does not exist yet.
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
