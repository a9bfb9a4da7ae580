// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status transition coordinator.
//!
//! Resolves the trigger for a requested status, checks that the caller
//! supplied the data the trigger demands, computes the field delta, and
//! persists it through the lead store. Any status may move to any other
//! status in the same campaign; the trigger payload is the only gate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use leadflow_config::model::WorkflowConfig;
use leadflow_core::{
    CALLBACK_STATUS, CallbackSchedule, Clock, FieldChange, Lead, LeadId, LeadStore, LeadUpdate,
    SentToAttribution, Trigger, normalize_timestamp, saturating_delta, with_deadline,
};
use tracing::{info, warn};

use crate::error::TransitionError;
use crate::registry::CampaignRegistry;

/// Caller-supplied data for a transition. Only the fields the target
/// status's trigger asks for are read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionPayload {
    pub callback_at: Option<DateTime<Utc>>,
    pub callback_note: Option<String>,
    pub staff_name: Option<String>,
    pub sent_to_client_name: Option<String>,
}

impl TransitionPayload {
    pub fn callback(at: DateTime<Utc>) -> Self {
        Self {
            callback_at: Some(at),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.callback_note = Some(note.into());
        self
    }

    pub fn sent_to(staff_name: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            staff_name: Some(staff_name.into()),
            sent_to_client_name: Some(client_name.into()),
            ..Self::default()
        }
    }

    pub fn prospect(staff_name: impl Into<String>) -> Self {
        Self {
            staff_name: Some(staff_name.into()),
            ..Self::default()
        }
    }
}

/// Applies status transitions to leads.
pub struct TransitionCoordinator {
    store: Arc<dyn LeadStore>,
    registry: Arc<CampaignRegistry>,
    clock: Arc<dyn Clock>,
    callback_grace: Duration,
    store_timeout: Duration,
}

impl TransitionCoordinator {
    pub fn new(
        store: Arc<dyn LeadStore>,
        registry: Arc<CampaignRegistry>,
        clock: Arc<dyn Clock>,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            callback_grace: config.callback_grace(),
            store_timeout: config.store_timeout(),
        }
    }

    pub fn registry(&self) -> &CampaignRegistry {
        &self.registry
    }

    /// Move `lead` to `target`.
    ///
    /// On success returns the lead as persisted. On any error `lead` is left
    /// as it was and, unless the error is [`TransitionError::Persistence`],
    /// the store was never called.
    pub async fn request_transition(
        &self,
        lead: &Lead,
        target: &str,
        payload: TransitionPayload,
    ) -> Result<Lead, TransitionError> {
        let (trigger, update) = self.plan(lead, target, payload)?;

        let persisted = with_deadline(
            self.store_timeout,
            self.store.update_lead(&lead.id, &update),
        )
        .await;
        if let Err(e) = persisted {
            warn!(lead_id = %lead.id, to = target, error = %e, "transition not persisted");
            return Err(TransitionError::Persistence(e));
        }

        info!(
            lead_id = %lead.id,
            campaign = %lead.campaign,
            from = %lead.status,
            to = target,
            trigger = %trigger,
            "lead status changed"
        );
        Ok(update.apply_to(lead))
    }

    /// Load a lead by id and transition it.
    pub async fn transition_by_id(
        &self,
        lead_id: &LeadId,
        target: &str,
        payload: TransitionPayload,
    ) -> Result<Lead, TransitionError> {
        let lead = with_deadline(self.store_timeout, self.store.get_lead(lead_id))
            .await
            .map_err(TransitionError::Persistence)?
            .ok_or_else(|| TransitionError::LeadNotFound {
                lead_id: lead_id.clone(),
            })?;
        self.request_transition(&lead, target, payload).await
    }

    /// Validate the request and compute the delta without touching the store.
    pub fn plan(
        &self,
        lead: &Lead,
        target: &str,
        payload: TransitionPayload,
    ) -> Result<(Trigger, LeadUpdate), TransitionError> {
        let campaign =
            self.registry
                .get(&lead.campaign)
                .map_err(|_| TransitionError::UnknownCampaign {
                    campaign: lead.campaign.clone(),
                })?;
        if !campaign.has_status(target) {
            return Err(TransitionError::InvalidStatus {
                campaign: lead.campaign.clone(),
                status: target.to_string(),
            });
        }

        let trigger = campaign.trigger_for(target);
        let now = self.clock.now();
        let mut update = LeadUpdate {
            status: target.to_string(),
            callback: FieldChange::Keep,
            sent_to: None,
            prospect_owner: None,
            updated_at: normalize_timestamp(now),
        };

        match trigger {
            Trigger::None => {}
            Trigger::RequireCallback => {
                let at = payload
                    .callback_at
                    .ok_or_else(|| TransitionError::MissingCallbackTime {
                        status: target.to_string(),
                    })?;
                let earliest = now
                    .checked_sub_signed(saturating_delta(self.callback_grace))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                if at < earliest {
                    return Err(TransitionError::CallbackInPast { callback_at: at });
                }
                update.callback = FieldChange::Set(CallbackSchedule {
                    at: normalize_timestamp(at),
                    note: non_blank(payload.callback_note.as_deref()),
                });
            }
            Trigger::RequireSentToClient => {
                let staff_name = required(target, "staff_name", payload.staff_name.as_deref())?;
                let client_name = required(
                    target,
                    "sent_to_client_name",
                    payload.sent_to_client_name.as_deref(),
                )?;
                update.sent_to = Some(SentToAttribution {
                    staff_name,
                    client_name,
                });
            }
            Trigger::RequireProspectClient => {
                update.prospect_owner =
                    Some(required(target, "staff_name", payload.staff_name.as_deref())?);
            }
        }

        // callback_at is non-null only while the status is Callback. The
        // store enforces this again against the row it holds.
        if target != CALLBACK_STATUS {
            update.callback = FieldChange::Clear;
        }

        Ok((trigger, update))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(
    status: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<String, TransitionError> {
    non_blank(value).ok_or_else(|| TransitionError::MissingAttribution {
        status: status.to_string(),
        field,
    })
}
