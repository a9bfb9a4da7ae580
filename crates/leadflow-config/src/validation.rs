// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as window ordering, positive limits, and campaign partition rules.

use std::collections::HashSet;

use leadflow_core::{CALLBACK_STATUS, Trigger};

use crate::diagnostic::ConfigError;
use crate::model::{CampaignSpecConfig, LeadflowConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.app.log_level.as_str()) {
        fail(format!(
            "app.log_level `{}` is not one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.workflow.store_timeout_ms == 0 {
        fail("workflow.store_timeout_ms must be greater than 0".to_string());
    }

    let alerts = &config.alerts;
    if alerts.poll_interval_secs == 0 {
        fail("alerts.poll_interval_secs must be greater than 0".to_string());
    }
    if alerts.due_window_secs == 0 {
        fail("alerts.due_window_secs must be greater than 0".to_string());
    }
    if alerts.stale_cutoff_secs <= alerts.due_window_secs {
        fail(format!(
            "alerts.stale_cutoff_secs ({}) must be greater than alerts.due_window_secs ({})",
            alerts.stale_cutoff_secs, alerts.due_window_secs
        ));
    }
    if alerts.max_candidates_per_tick == 0 {
        fail("alerts.max_candidates_per_tick must be greater than 0".to_string());
    }
    if alerts.dedup_retention < alerts.max_candidates_per_tick {
        fail(format!(
            "alerts.dedup_retention ({}) must be at least alerts.max_candidates_per_tick ({})",
            alerts.dedup_retention, alerts.max_candidates_per_tick
        ));
    }
    if alerts.store_timeout_ms == 0 {
        fail("alerts.store_timeout_ms must be greater than 0".to_string());
    }

    let mut seen_owners = HashSet::new();
    for (i, owner) in alerts.owners.iter().enumerate() {
        if owner.trim().is_empty() {
            fail(format!("alerts.owners[{i}] must not be empty"));
        } else if !seen_owners.insert(owner.trim()) {
            fail(format!("duplicate owner `{owner}` in alerts.owners"));
        }
    }

    let mut seen_keys = HashSet::new();
    for spec in &config.campaigns {
        if !seen_keys.insert(spec.key.as_str()) {
            fail(format!("duplicate campaign key `{}` in [[campaigns]]", spec.key));
        }
        for problem in campaign_problems(spec) {
            fail(format!("campaign `{}`: {problem}", spec.key));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check one campaign definition against the partition and trigger rules.
///
/// Returns every problem found; an empty list means the campaign is valid.
/// The campaign registry applies the same rules to compiled-in campaigns.
pub fn campaign_problems(spec: &CampaignSpecConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if spec.key.trim().is_empty() {
        problems.push("key must not be empty".to_string());
    }
    if spec.statuses.is_empty() {
        problems.push("statuses must not be empty".to_string());
    }

    let mut vocabulary = HashSet::new();
    for status in &spec.statuses {
        if status.trim().is_empty() {
            problems.push("status names must not be empty".to_string());
        } else if !vocabulary.insert(status.as_str()) {
            problems.push(format!("status `{status}` is listed twice"));
        }
    }

    for status in &spec.active {
        if !vocabulary.contains(status.as_str()) {
            problems.push(format!("active status `{status}` is not in statuses"));
        }
    }
    for status in &spec.archive {
        if !vocabulary.contains(status.as_str()) {
            problems.push(format!("archive status `{status}` is not in statuses"));
        }
        if spec.active.contains(status) {
            problems.push(format!("status `{status}` is both active and archived"));
        }
    }

    for (status, trigger) in &spec.triggers {
        if !vocabulary.contains(status.as_str()) {
            problems.push(format!("trigger for unknown status `{status}`"));
        }
        // callback_at is only legal while status == Callback.
        if *trigger == Trigger::RequireCallback && status != CALLBACK_STATUS {
            problems.push(format!(
                "REQUIRE_CALLBACK may only be attached to `{CALLBACK_STATUS}`, not `{status}`"
            ));
        }
    }
    if vocabulary.contains(CALLBACK_STATUS)
        && spec.triggers.get(CALLBACK_STATUS) != Some(&Trigger::RequireCallback)
    {
        problems.push(format!("`{CALLBACK_STATUS}` must use the REQUIRE_CALLBACK trigger"));
    }

    problems
}
