// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the workflow crates.

use std::fmt;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LeadflowError;

/// Name of the status that carries a scheduled callback.
pub const CALLBACK_STATUS: &str = "Callback";

/// Truncate a timestamp to the millisecond precision used by storage.
///
/// Due events are keyed by their timestamp, so every timestamp that enters
/// a lead goes through here before it is compared or persisted.
pub fn normalize_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Convert a configured duration to a signed delta, saturating at
/// [`TimeDelta::MAX`] instead of failing on overflow.
pub fn saturating_delta(d: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

/// Unique identifier for a lead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl LeadId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    LeadStore,
    AlertDedup,
    Notification,
}

/// Extra data a status demands before a transition into it may complete.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    /// No extra data; the transition applies directly.
    #[default]
    None,
    /// A callback time (and optional note) must be supplied.
    RequireCallback,
    /// Staff name and receiving client name must be supplied.
    RequireSentToClient,
    /// Staff name of the prospect owner must be supplied.
    RequireProspectClient,
}

/// Attribution recorded when a lead is sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentToAttribution {
    pub staff_name: String,
    pub client_name: String,
}

/// A prospective customer moving through a campaign workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    /// Key of the campaign this lead belongs to.
    pub campaign: String,
    /// Current status, a member of the campaign's vocabulary.
    pub status: String,
    pub full_name: String,
    pub phone: String,
    /// Staff member who owns the lead; used for per-user alert scopes.
    pub assigned_to: Option<String>,
    /// Set if and only if `status == "Callback"`.
    pub callback_at: Option<DateTime<Utc>>,
    pub callback_note: Option<String>,
    pub sent_to: Option<SentToAttribution>,
    pub prospect_owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Create a lead as intake flows do: fresh id, no callback, no attribution.
    pub fn new(
        campaign: impl Into<String>,
        status: impl Into<String>,
        full_name: impl Into<String>,
        phone: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let now = normalize_timestamp(now);
        Self {
            id: LeadId::generate(),
            campaign: campaign.into(),
            status: status.into(),
            full_name: full_name.into(),
            phone: phone.into(),
            assigned_to: None,
            callback_at: None,
            callback_note: None,
            sent_to: None,
            prospect_owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assign the lead to a staff member.
    pub fn assigned(mut self, owner: impl Into<String>) -> Self {
        self.assigned_to = Some(owner.into());
        self
    }

    pub fn is_callback(&self) -> bool {
        self.status == CALLBACK_STATUS
    }

    /// `true` if the lead carries a callback time exactly when it is in
    /// `Callback`.
    pub fn has_consistent_callback(&self) -> bool {
        self.is_callback() == self.callback_at.is_some()
    }

    /// Reject a lead whose callback time disagrees with its status.
    ///
    /// Stores call this on insert.
    pub fn ensure_consistent_callback(&self) -> Result<(), LeadflowError> {
        if self.has_consistent_callback() {
            return Ok(());
        }
        let reason = if self.is_callback() {
            "status Callback requires a callback time"
        } else {
            "only a Callback lead may carry a callback time"
        };
        Err(LeadflowError::InvalidLead {
            id: self.id.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Three-way change for an optional field in an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldChange<T> {
    /// Leave the stored value as it is.
    #[default]
    Keep,
    /// Overwrite the stored value.
    Set(T),
    /// Null the stored value.
    Clear,
}

/// A scheduled callback: due time plus an optional note for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackSchedule {
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Field delta persisted by a status transition.
///
/// `None` attribution fields mean "untouched", never "clear".
#[derive(Debug, Clone, PartialEq)]
pub struct LeadUpdate {
    pub status: String,
    pub callback: FieldChange<CallbackSchedule>,
    pub sent_to: Option<SentToAttribution>,
    pub prospect_owner: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LeadUpdate {
    /// Apply this delta to a copy of `lead`.
    ///
    /// Any status other than `Callback` leaves the lead without a callback,
    /// whatever `callback` says. Stores apply the delta to the row they hold,
    /// so this holds even when the caller planned from an outdated copy.
    pub fn apply_to(&self, lead: &Lead) -> Lead {
        let mut updated = lead.clone();
        updated.status = self.status.clone();
        match &self.callback {
            FieldChange::Keep => {}
            FieldChange::Set(schedule) => {
                updated.callback_at = Some(schedule.at);
                updated.callback_note = schedule.note.clone();
            }
            FieldChange::Clear => {
                updated.callback_at = None;
                updated.callback_note = None;
            }
        }
        if self.status != CALLBACK_STATUS {
            updated.callback_at = None;
            updated.callback_note = None;
        }
        if let Some(sent_to) = &self.sent_to {
            updated.sent_to = Some(sent_to.clone());
        }
        if let Some(owner) = &self.prospect_owner {
            updated.prospect_owner = Some(owner.clone());
        }
        updated.updated_at = self.updated_at;
        updated
    }
}

/// Ordering for lead queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeadOrder {
    /// Earliest callback first; leads without a callback sort last.
    CallbackAtAsc,
    /// Newest lead first.
    #[default]
    CreatedAtDesc,
}

/// Filter, order, and limit for [`LeadStore::query_leads`](crate::LeadStore::query_leads).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadQuery {
    pub status: Option<String>,
    pub campaign: Option<String>,
    pub assigned_to: Option<String>,
    /// Inclusive upper bound on `callback_at`; excludes leads without one.
    pub callback_due_before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `callback_at`; excludes leads without one.
    pub callback_due_after: Option<DateTime<Utc>>,
    /// Keyset cursor: only leads strictly after this `(callback_at, id)`
    /// pair, in [`LeadOrder::CallbackAtAsc`] order. Excludes leads without a
    /// callback.
    pub after_callback_key: Option<(DateTime<Utc>, LeadId)>,
    pub order: LeadOrder,
    pub limit: Option<usize>,
}

impl LeadQuery {
    /// Returns `true` if `lead` passes every filter in this query.
    ///
    /// Backends that cannot push filters down use this to stay consistent
    /// with the SQL implementation.
    pub fn matches(&self, lead: &Lead) -> bool {
        if let Some(status) = &self.status {
            if &lead.status != status {
                return false;
            }
        }
        if let Some(campaign) = &self.campaign {
            if &lead.campaign != campaign {
                return false;
            }
        }
        if let Some(owner) = &self.assigned_to {
            if lead.assigned_to.as_ref() != Some(owner) {
                return false;
            }
        }
        if let Some(before) = self.callback_due_before {
            match lead.callback_at {
                Some(at) if at <= before => {}
                _ => return false,
            }
        }
        if let Some(after) = self.callback_due_after {
            match lead.callback_at {
                Some(at) if at >= after => {}
                _ => return false,
            }
        }
        if let Some((cursor_at, cursor_id)) = &self.after_callback_key {
            match lead.callback_at {
                Some(at) if (at, &lead.id) > (*cursor_at, cursor_id) => {}
                _ => return false,
            }
        }
        true
    }
}

/// An immutable note attached to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub lead_id: LeadId,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(
        lead_id: LeadId,
        author: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            lead_id,
            author: author.into(),
            body: body.into(),
            created_at: normalize_timestamp(now),
        }
    }
}

/// Snapshot of a lead moved into the do-not-call backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DncBacklogEntry {
    pub lead_id: LeadId,
    pub campaign: String,
    pub status: String,
    pub full_name: String,
    /// Unique across the backlog.
    pub phone: String,
    pub assigned_to: Option<String>,
    pub callback_at: Option<DateTime<Utc>>,
    pub callback_note: Option<String>,
    pub sent_to: Option<SentToAttribution>,
    pub prospect_owner: Option<String>,
    pub lead_created_at: DateTime<Utc>,
    pub reason: String,
    pub performed_by: String,
    pub backlogged_at: DateTime<Utc>,
}

impl DncBacklogEntry {
    /// Snapshot `lead` with the migration reason and actor.
    pub fn from_lead(
        lead: &Lead,
        reason: impl Into<String>,
        performed_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lead_id: lead.id.clone(),
            campaign: lead.campaign.clone(),
            status: lead.status.clone(),
            full_name: lead.full_name.clone(),
            phone: lead.phone.clone(),
            assigned_to: lead.assigned_to.clone(),
            callback_at: lead.callback_at,
            callback_note: lead.callback_note.clone(),
            sent_to: lead.sent_to.clone(),
            prospect_owner: lead.prospect_owner.clone(),
            lead_created_at: lead.created_at,
            reason: reason.into(),
            performed_by: performed_by.into(),
            backlogged_at: normalize_timestamp(now),
        }
    }
}

/// Which leads a scheduler instance watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlertScope {
    /// Every lead; all observers share one dedup key space.
    All,
    /// Only leads assigned to the given staff member; dedup keys are per user.
    OwnedBy(String),
}

impl AlertScope {
    /// Dedup namespace for keys recorded under this scope.
    pub fn namespace(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::OwnedBy(user) => format!("user:{user}"),
        }
    }

    /// Owner filter to push into the lead query.
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::OwnedBy(user) => Some(user),
        }
    }
}

impl fmt::Display for AlertScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::OwnedBy(user) => write!(f, "owned-by:{user}"),
        }
    }
}

/// Identity of a due event: at most one alert is delivered per key.
///
/// Rescheduling a callback changes `callback_at` and therefore the key, so a
/// rescheduled callback is a new event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub namespace: String,
    pub lead_id: LeadId,
    pub callback_at: DateTime<Utc>,
}

impl DedupKey {
    pub fn new(scope: &AlertScope, lead_id: LeadId, callback_at: DateTime<Utc>) -> Self {
        Self {
            namespace: scope.namespace(),
            lead_id,
            callback_at: normalize_timestamp(callback_at),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.namespace,
            self.lead_id,
            self.callback_at.timestamp_millis()
        )
    }
}

/// How long alert dedup records are kept.
///
/// Each namespace keeps its newest `per_namespace` records. Older ones are
/// pruned only once their callback time is more than `horizon` before the
/// key being recorded, so a key that can still come up as a candidate is
/// never dropped; a namespace may exceed its cap while that holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupRetention {
    pub per_namespace: usize,
    pub horizon: std::time::Duration,
}

impl DedupRetention {
    pub fn new(per_namespace: usize, horizon: std::time::Duration) -> Self {
        Self {
            per_namespace: per_namespace.max(1),
            horizon,
        }
    }

    /// Records in `key`'s namespace due strictly before this may be pruned.
    pub fn prune_before(&self, key: &DedupKey) -> DateTime<Utc> {
        key.callback_at
            .checked_sub_signed(saturating_delta(self.horizon))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A human-visible alert for a due callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackAlert {
    pub lead_id: LeadId,
    pub callback_at: DateTime<Utc>,
    pub title: String,
    pub message: String,
}
