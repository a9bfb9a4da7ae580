// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the SQLite database,
//! and the campaign registry, and prints one line per check.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use leadflow_config::model::LeadflowConfig;
use leadflow_workflow::CampaignRegistry;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run every check and print the report. With `plain`, colors are off.
pub async fn run_doctor(config: &LeadflowConfig, config_path: Option<&Path>, plain: bool) {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_config(config_path),
        check_campaigns(config),
        check_alert_scopes(config),
        check_database(&config.storage.database_path).await,
        check_memory_baseline(),
    ];

    println!();
    println!("  leadflow doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    use colored::Colorize;

    let duration_ms = result.duration.as_millis();
    if !use_color {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        return format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        );
    }

    let (symbol, message) = match result.status {
        CheckStatus::Pass => ("✓".green(), result.message.normal()),
        CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
        CheckStatus::Fail => ("✗".red(), result.message.red()),
    };
    format!(
        "    {symbol} {:<20} {message} ({duration_ms}ms)",
        result.name
    )
}

/// Re-load the configuration to count errors independently of startup.
fn check_config(config_path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match config_path {
        Some(path) => leadflow_config::load_and_validate_path(path),
        None => leadflow_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

fn check_campaigns(config: &LeadflowConfig) -> CheckResult {
    let start = Instant::now();
    match CampaignRegistry::from_config(config) {
        Ok(registry) => {
            let source = match registry.version() {
                Some(v) => format!("built-in set v{v}"),
                None => "from config".to_string(),
            };
            let keys: Vec<&str> = registry.keys().collect();
            CheckResult::new(
                "Campaigns",
                CheckStatus::Pass,
                format!("{} ({source}): {}", keys.len(), keys.join(", ")),
                start,
            )
        }
        Err(e) => CheckResult::new("Campaigns", CheckStatus::Fail, e.to_string(), start),
    }
}

fn check_alert_scopes(config: &LeadflowConfig) -> CheckResult {
    let start = Instant::now();
    let alerts = &config.alerts;
    if !alerts.enabled {
        return CheckResult::new(
            "Alerts",
            CheckStatus::Warn,
            "disabled (alerts.enabled = false)",
            start,
        );
    }
    let scopes = leadflow_alerts::scopes_from_config(alerts);
    CheckResult::new(
        "Alerts",
        CheckStatus::Pass,
        format!(
            "{} scheduler(s), every {}s, window {}s",
            scopes.len(),
            alerts.poll_interval_secs,
            alerts.due_window_secs
        ),
        start,
    )
}

/// Open the database read-only in spirit: no migrations, just integrity and
/// schema checks. A missing file only warns.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };

    let result = conn
        .call(|conn| -> Result<(String, i64), rusqlite::Error> {
            let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
            let migrations: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'refinery_schema_history'",
                [],
                |row| row.get(0),
            )?;
            let applied = if migrations > 0 {
                conn.query_row("SELECT COUNT(*) FROM refinery_schema_history", [], |row| {
                    row.get(0)
                })?
            } else {
                0
            };
            Ok((integrity, applied))
        })
        .await;

    match result {
        Ok((integrity, _)) if integrity != "ok" => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("integrity check: {integrity}"),
            start,
        ),
        Ok((_, 0)) => CheckResult::new(
            "Database",
            CheckStatus::Warn,
            "no migrations applied (run `leadflow serve` once)",
            start,
        ),
        Ok((_, applied)) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("ok, {applied} migration(s) applied"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}
