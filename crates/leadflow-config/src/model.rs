// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Leadflow.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::time::Duration;

use leadflow_core::Trigger;
use serde::{Deserialize, Serialize};

/// Top-level Leadflow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadflowConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Status transition settings.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Callback due-alert scheduler settings.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Campaign definitions. Empty means the compiled-in campaign set.
    #[serde(default)]
    pub campaigns: Vec<CampaignSpecConfig>,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in log lines and alert titles.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "leadflow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long SQLite waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("leadflow").join("leadflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("leadflow.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Status transition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// How far in the past a requested callback time may be before it is
    /// rejected. Absorbs clock skew between the caller and this process.
    #[serde(default = "default_callback_grace_secs")]
    pub callback_grace_secs: u64,

    /// Deadline for each lead store call made by a transition or DNC migration.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

impl WorkflowConfig {
    pub fn callback_grace(&self) -> Duration {
        Duration::from_secs(self.callback_grace_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            callback_grace_secs: default_callback_grace_secs(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

fn default_callback_grace_secs() -> u64 {
    60
}

fn default_store_timeout_ms() -> u64 {
    5000
}

/// Callback due-alert scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsConfig {
    /// Run the scheduler under `leadflow serve`.
    #[serde(default = "default_alerts_enabled")]
    pub enabled: bool,

    /// Seconds between scan ticks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Look-ahead: callbacks due within this many seconds are alerted.
    #[serde(default = "default_due_window_secs")]
    pub due_window_secs: u64,

    /// Look-behind: callbacks overdue by more than this are never alerted.
    #[serde(default = "default_stale_cutoff_secs")]
    pub stale_cutoff_secs: u64,

    /// Maximum candidate leads fetched per tick.
    #[serde(default = "default_max_candidates_per_tick")]
    pub max_candidates_per_tick: usize,

    /// Dedup records kept per namespace before the oldest are pruned. A
    /// record is never pruned while its callback could still be alerted.
    #[serde(default = "default_dedup_retention")]
    pub dedup_retention: usize,

    /// Deadline for each store call made during a tick.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Staff members that get their own scheduler and dedup namespace.
    /// Empty runs a single scheduler over all leads.
    #[serde(default)]
    pub owners: Vec<String>,
}

impl AlertsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn due_window(&self) -> Duration {
        Duration::from_secs(self.due_window_secs)
    }

    pub fn stale_cutoff(&self) -> Duration {
        Duration::from_secs(self.stale_cutoff_secs)
    }

    /// How far behind a newly alerted callback a dedup record must be before
    /// it may be pruned: anything older is past every scheduler's stale cutoff.
    pub fn dedup_horizon(&self) -> Duration {
        self.stale_cutoff().saturating_add(self.due_window())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: default_alerts_enabled(),
            poll_interval_secs: default_poll_interval_secs(),
            due_window_secs: default_due_window_secs(),
            stale_cutoff_secs: default_stale_cutoff_secs(),
            max_candidates_per_tick: default_max_candidates_per_tick(),
            dedup_retention: default_dedup_retention(),
            store_timeout_ms: default_store_timeout_ms(),
            owners: Vec::new(),
        }
    }
}

fn default_alerts_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    25
}

fn default_due_window_secs() -> u64 {
    60
}

fn default_stale_cutoff_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_candidates_per_tick() -> usize {
    25
}

fn default_dedup_retention() -> usize {
    500
}

/// One campaign definition in a `[[campaigns]]` array.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignSpecConfig {
    /// Campaign key leads refer to (e.g. `ECO4`).
    pub key: String,

    /// Ordered status vocabulary.
    pub statuses: Vec<String>,

    /// Statuses shown in active views.
    #[serde(default)]
    pub active: Vec<String>,

    /// Statuses shown in archive views.
    #[serde(default)]
    pub archive: Vec<String>,

    /// Status name to trigger tag. Unlisted statuses have no trigger.
    #[serde(default)]
    pub triggers: BTreeMap<String, Trigger>,
}
