// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed failures of the workflow operations.

use chrono::{DateTime, Utc};
use leadflow_core::{LeadId, LeadflowError};
use thiserror::Error;

/// Campaign registry failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No campaign is registered under the key.
    #[error("unknown campaign `{0}`")]
    NotFound(String),

    /// A campaign definition broke the partition or trigger rules.
    #[error("invalid campaign `{campaign}`: {reason}")]
    Invalid { campaign: String, reason: String },
}

/// A rejected or failed status transition.
///
/// Every variant except [`Persistence`](Self::Persistence) is raised before
/// the store is touched.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("lead belongs to unknown campaign `{campaign}`")]
    UnknownCampaign { campaign: String },

    #[error("`{status}` is not a status of campaign `{campaign}`")]
    InvalidStatus { campaign: String, status: String },

    #[error("status `{status}` requires a callback time")]
    MissingCallbackTime { status: String },

    #[error("callback time {callback_at} is in the past")]
    CallbackInPast { callback_at: DateTime<Utc> },

    #[error("status `{status}` requires `{field}`")]
    MissingAttribution { status: String, field: &'static str },

    #[error("lead not found: {lead_id}")]
    LeadNotFound { lead_id: LeadId },

    #[error("failed to persist transition")]
    Persistence(#[source] LeadflowError),
}

/// A failed do-not-call migration.
#[derive(Debug, Error)]
pub enum DncError {
    #[error("`{field}` must not be empty")]
    MissingField { field: &'static str },

    /// Step one failed; the lead is untouched.
    #[error("failed to insert do-not-call backlog entry")]
    BacklogInsertFailed(#[source] LeadflowError),

    /// Step two failed; retry the delete only.
    #[error("lead {lead_id} backlogged but not removed")]
    DeleteFailed {
        lead_id: LeadId,
        #[source]
        source: LeadflowError,
    },
}

impl DncError {
    /// Returns `true` for the recoverable half-done state, which the caller
    /// resolves with [`DncMigration::retry_delete`](crate::DncMigration::retry_delete).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeleteFailed { .. })
    }
}
