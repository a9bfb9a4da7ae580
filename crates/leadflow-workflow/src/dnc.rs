// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Do-not-call migration.
//!
//! Two steps: snapshot the lead into the backlog, then delete it from the
//! active store. A phone number that is already backlogged does not stop the
//! delete. A failed delete is reported as [`DncError::DeleteFailed`] and is
//! finished with [`DncMigration::retry_delete`], which never writes to the
//! backlog again.

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::{Clock, DncBacklogEntry, Lead, LeadId, LeadStore, with_deadline};
use tracing::{error, info, warn};

use crate::error::DncError;

/// How a successful migration went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DncOutcome {
    /// Backlog entry written and lead removed.
    Migrated,
    /// The phone number was already backlogged; the lead was still removed.
    AlreadyBacklogged,
    /// The lead was already gone from the active store.
    AlreadyRemoved,
}

pub struct DncMigration {
    store: Arc<dyn LeadStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl DncMigration {
    pub fn new(store: Arc<dyn LeadStore>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            store_timeout,
        }
    }

    /// Move `lead` into the do-not-call backlog and remove it.
    pub async fn migrate(
        &self,
        lead: &Lead,
        reason: &str,
        performed_by: &str,
    ) -> Result<DncOutcome, DncError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DncError::MissingField { field: "reason" });
        }
        let performed_by = performed_by.trim();
        if performed_by.is_empty() {
            return Err(DncError::MissingField {
                field: "performed_by",
            });
        }

        let entry = DncBacklogEntry::from_lead(lead, reason, performed_by, self.clock.now());
        let already_backlogged =
            match with_deadline(self.store_timeout, self.store.insert_backlog(&entry)).await {
                Ok(()) => false,
                Err(e) if e.is_conflict() => {
                    warn!(lead_id = %lead.id, "phone already on do-not-call backlog");
                    true
                }
                Err(e) => {
                    warn!(lead_id = %lead.id, error = %e, "do-not-call backlog insert failed");
                    return Err(DncError::BacklogInsertFailed(e));
                }
            };

        let removed = self.delete(&lead.id).await?;
        info!(
            lead_id = %lead.id,
            performed_by,
            already_backlogged,
            "lead moved to do-not-call backlog"
        );
        Ok(match (already_backlogged, removed) {
            (_, false) => DncOutcome::AlreadyRemoved,
            (true, true) => DncOutcome::AlreadyBacklogged,
            (false, true) => DncOutcome::Migrated,
        })
    }

    /// Finish a migration whose delete step failed.
    pub async fn retry_delete(&self, lead_id: &LeadId) -> Result<DncOutcome, DncError> {
        let removed = self.delete(lead_id).await?;
        info!(lead_id = %lead_id, removed, "do-not-call delete retried");
        Ok(if removed {
            DncOutcome::Migrated
        } else {
            DncOutcome::AlreadyRemoved
        })
    }

    async fn delete(&self, lead_id: &LeadId) -> Result<bool, DncError> {
        with_deadline(self.store_timeout, self.store.delete_lead(lead_id))
            .await
            .map_err(|source| {
                error!(lead_id = %lead_id, error = %source, "lead backlogged but not removed");
                DncError::DeleteFailed {
                    lead_id: lead_id.clone(),
                    source,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use leadflow_test_utils::{ManualClock, MemoryLeadStore};
    use tracing_test::traced_test;

    fn setup() -> (Arc<MemoryLeadStore>, DncMigration, Lead) {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let store = Arc::new(MemoryLeadStore::new());
        let migration = DncMigration::new(
            store.clone(),
            Arc::new(ManualClock::new(now)),
            Duration::from_secs(5),
        );
        let lead = Lead::new("SOLAR", "Not Interested", "Ada", "07700 900002", now);
        (store, migration, lead)
    }

    #[tokio::test]
    async fn migrate_backlogs_then_deletes() {
        let (store, migration, lead) = setup();
        store.seed(lead.clone()).await;

        let outcome = migration.migrate(&lead, " rude ", "kim").await.unwrap();
        assert_eq!(outcome, DncOutcome::Migrated);
        assert!(store.lead(&lead.id).await.is_none());
        let backlog = store.backlog().await;
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].reason, "rude");
        assert_eq!(backlog[0].performed_by, "kim");
    }

    #[tokio::test]
    async fn blank_reason_is_rejected_before_any_write() {
        let (store, migration, lead) = setup();
        store.seed(lead.clone()).await;

        let err = migration.migrate(&lead, "  ", "kim").await.unwrap_err();
        assert!(matches!(err, DncError::MissingField { field: "reason" }));
        let err = migration.migrate(&lead, "rude", "").await.unwrap_err();
        assert!(matches!(err, DncError::MissingField { field: "performed_by" }));
        assert!(store.backlog().await.is_empty());
        assert!(store.lead(&lead.id).await.is_some());
    }

    #[tokio::test]
    async fn backlog_failure_aborts_before_delete() {
        let (store, migration, lead) = setup();
        store.seed(lead.clone()).await;
        store.set_fail_backlog(true);

        let err = migration.migrate(&lead, "rude", "kim").await.unwrap_err();
        assert!(matches!(err, DncError::BacklogInsertFailed(_)));
        assert_eq!(store.delete_calls(), 0);
        assert!(store.lead(&lead.id).await.is_some());
    }

    #[tokio::test]
    async fn delete_failure_is_retryable_without_reinserting() {
        let (store, migration, lead) = setup();
        store.seed(lead.clone()).await;
        store.set_fail_deletes(true);

        let err = migration.migrate(&lead, "rude", "kim").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.backlog().await.len(), 1);
        assert!(store.lead(&lead.id).await.is_some());

        store.set_fail_deletes(false);
        let backlog_calls = store.backlog_calls();
        let outcome = migration.retry_delete(&lead.id).await.unwrap();
        assert_eq!(outcome, DncOutcome::Migrated);
        assert_eq!(store.backlog_calls(), backlog_calls);
        assert!(store.lead(&lead.id).await.is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn migrating_twice_keeps_one_backlog_entry() {
        let (store, migration, lead) = setup();
        store.seed(lead.clone()).await;
        store.set_fail_deletes(true);
        assert!(migration.migrate(&lead, "rude", "kim").await.is_err());

        store.set_fail_deletes(false);
        let outcome = migration.migrate(&lead, "rude", "kim").await.unwrap();
        assert_eq!(outcome, DncOutcome::AlreadyBacklogged);
        assert_eq!(store.backlog().await.len(), 1);
        assert!(store.lead(&lead.id).await.is_none());
        assert!(logs_contain("phone already on do-not-call backlog"));
        assert!(logs_contain("lead backlogged but not removed"));
    }

    #[tokio::test]
    async fn migrating_a_removed_lead_reports_it() {
        let (store, migration, lead) = setup();
        let outcome = migration.migrate(&lead, "rude", "kim").await.unwrap();
        assert_eq!(outcome, DncOutcome::AlreadyRemoved);
        assert_eq!(store.backlog().await.len(), 1);
    }
}
