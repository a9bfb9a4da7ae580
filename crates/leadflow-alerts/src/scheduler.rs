// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback due-alert scheduler.
//!
//! Each tick scans for leads in `Callback` whose due time falls inside the
//! look-ahead window, skips due events that are stale or already recorded,
//! and alerts on the first remaining one. The dedup record is written before
//! the alert is emitted, so an interrupted tick errs toward a missed alert
//! rather than a repeated one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use leadflow_config::model::AlertsConfig;
use leadflow_core::{
    AlertDedupStore, AlertScope, CALLBACK_STATUS, Clock, DedupKey, Lead, LeadId, LeadOrder,
    LeadQuery, LeadStore, LeadflowError, Note, NotificationSink, saturating_delta, with_deadline,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::message::compose_alert;

/// Tuning for one scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSchedulerConfig {
    pub poll_interval: Duration,
    /// Callbacks due within this much of `now` are alerted.
    pub due_window: Duration,
    /// Callbacks overdue by more than this are never alerted.
    pub stale_cutoff: Duration,
    pub scope: AlertScope,
    pub max_candidates_per_tick: usize,
    /// Deadline for every store and sink call in a tick.
    pub store_timeout: Duration,
}

impl Default for AlertSchedulerConfig {
    fn default() -> Self {
        Self::from_config(&AlertsConfig::default(), AlertScope::All)
    }
}

impl AlertSchedulerConfig {
    pub fn from_config(config: &AlertsConfig, scope: AlertScope) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            due_window: config.due_window(),
            stale_cutoff: config.stale_cutoff(),
            scope,
            max_candidates_per_tick: config.max_candidates_per_tick,
            store_timeout: config.store_timeout(),
        }
    }
}

/// One scope per configured owner, or a single shared scope when none are set.
pub fn scopes_from_config(config: &AlertsConfig) -> Vec<AlertScope> {
    if config.owners.is_empty() {
        vec![AlertScope::All]
    } else {
        config
            .owners
            .iter()
            .map(|owner| AlertScope::OwnedBy(owner.trim().to_string()))
            .collect()
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// One due event was recorded and an alert emitted for it.
    ///
    /// `delivered` is `false` if the sink rejected the alert; the event stays
    /// recorded and is not retried.
    Alerted {
        lead_id: LeadId,
        callback_at: DateTime<Utc>,
        delivered: bool,
    },
    /// Nothing to alert.
    Idle {
        candidates: usize,
        stale: usize,
        duplicate: usize,
    },
    /// The candidate query failed; nothing was recorded or emitted.
    ReadFailed { error: String },
    /// Recording the dedup key failed; nothing was emitted.
    DedupFailed { lead_id: LeadId, error: String },
}

impl TickOutcome {
    pub fn alerted(&self) -> bool {
        matches!(self, Self::Alerted { .. })
    }
}

/// Polls for due callbacks and emits at most one alert per tick.
pub struct CallbackAlertScheduler {
    config: AlertSchedulerConfig,
    store: Arc<dyn LeadStore>,
    dedup: Arc<dyn AlertDedupStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl CallbackAlertScheduler {
    pub fn new(
        config: AlertSchedulerConfig,
        store: Arc<dyn LeadStore>,
        dedup: Arc<dyn AlertDedupStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            dedup,
            sink,
            clock,
        }
    }

    pub fn config(&self) -> &AlertSchedulerConfig {
        &self.config
    }

    /// Run one scan.
    pub async fn tick(&self) -> TickOutcome {
        let now = self.clock.now();
        let due_before = shift_forward(now, self.config.due_window);
        let stale_before = shift_back(now, self.config.stale_cutoff);

        let mut cursor = None;
        let mut scanned = 0;
        let mut stale = 0;
        let mut duplicate = 0;
        loop {
            let query = LeadQuery {
                status: Some(CALLBACK_STATUS.to_string()),
                assigned_to: self.config.scope.owner().map(str::to_string),
                callback_due_before: Some(due_before),
                callback_due_after: Some(stale_before),
                after_callback_key: cursor.take(),
                order: LeadOrder::CallbackAtAsc,
                limit: Some(self.config.max_candidates_per_tick),
                ..LeadQuery::default()
            };
            let page = match with_deadline(
                self.config.store_timeout,
                self.store.query_leads(&query),
            )
            .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(scope = %self.config.scope, error = %e, "callback scan failed");
                    return TickOutcome::ReadFailed {
                        error: e.to_string(),
                    };
                }
            };
            scanned += page.len();

            for lead in &page {
                let Some(callback_at) = lead.callback_at else {
                    continue;
                };
                if callback_at < stale_before {
                    stale += 1;
                    continue;
                }

                let key = DedupKey::new(&self.config.scope, lead.id.clone(), callback_at);
                match with_deadline(self.config.store_timeout, self.dedup.try_record(&key)).await
                {
                    Ok(false) => {
                        duplicate += 1;
                    }
                    Ok(true) => return self.alert(lead, key.callback_at, now).await,
                    Err(e) => {
                        warn!(
                            scope = %self.config.scope,
                            lead_id = %lead.id,
                            error = %e,
                            "failed to record callback alert; not emitting"
                        );
                        return TickOutcome::DedupFailed {
                            lead_id: lead.id.clone(),
                            error: e.to_string(),
                        };
                    }
                }
            }

            // Only a full page can have more candidates behind it.
            if page.len() < self.config.max_candidates_per_tick {
                break;
            }
            match page.last() {
                Some(last) => match last.callback_at {
                    Some(at) => cursor = Some((at, last.id.clone())),
                    None => break,
                },
                None => break,
            }
        }

        debug!(
            scope = %self.config.scope,
            candidates = scanned,
            stale,
            duplicate,
            "no callback due"
        );
        TickOutcome::Idle {
            candidates: scanned,
            stale,
            duplicate,
        }
    }

    async fn alert(&self, lead: &Lead, callback_at: DateTime<Utc>, now: DateTime<Utc>) -> TickOutcome {
        let latest_note = self.latest_note(&lead.id).await;
        let alert = compose_alert(lead, callback_at, latest_note.as_ref(), now);

        let delivered =
            match with_deadline(self.config.store_timeout, self.sink.emit(&alert)).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        scope = %self.config.scope,
                        lead_id = %lead.id,
                        sink = self.sink.name(),
                        error = %e,
                        "callback alert not delivered"
                    );
                    false
                }
            };
        info!(
            scope = %self.config.scope,
            lead_id = %lead.id,
            callback_at = %callback_at,
            delivered,
            "callback alert emitted"
        );
        TickOutcome::Alerted {
            lead_id: lead.id.clone(),
            callback_at,
            delivered,
        }
    }

    async fn latest_note(&self, lead_id: &LeadId) -> Option<Note> {
        let notes: Result<Vec<Note>, LeadflowError> =
            with_deadline(self.config.store_timeout, self.store.recent_notes(lead_id, 1)).await;
        match notes {
            Ok(notes) => notes.into_iter().next(),
            Err(e) => {
                debug!(lead_id = %lead_id, error = %e, "latest note unavailable for alert");
                None
            }
        }
    }

    /// Tick on `poll_interval` until `cancel` fires.
    ///
    /// The first scan runs immediately. Cancellation also interrupts a tick
    /// in flight.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            scope = %self.config.scope,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "callback alert scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.tick() => {}
            }
        }

        info!(scope = %self.config.scope, "callback alert scheduler stopped");
    }
}

fn shift_forward(now: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    now.checked_add_signed(saturating_delta(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn shift_back(now: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(saturating_delta(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use leadflow_test_utils::{ManualClock, MemoryDedupStore, MemoryLeadStore, RecordingSink};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryLeadStore>,
        dedup: Arc<MemoryDedupStore>,
        sink: Arc<RecordingSink>,
        clock: Arc<ManualClock>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryLeadStore::new()),
                dedup: Arc::new(MemoryDedupStore::default()),
                sink: Arc::new(RecordingSink::new()),
                clock: Arc::new(ManualClock::new(t0())),
            }
        }

        fn scheduler(&self, scope: AlertScope) -> CallbackAlertScheduler {
            let config = AlertSchedulerConfig {
                scope,
                ..AlertSchedulerConfig::default()
            };
            CallbackAlertScheduler::new(
                config,
                self.store.clone(),
                self.dedup.clone(),
                self.sink.clone(),
                self.clock.clone(),
            )
        }

        async fn callback(&self, name: &str, owner: &str, at: DateTime<Utc>) -> Lead {
            let mut lead = Lead::new("ECO4", "Callback", name, "0700", t0()).assigned(owner);
            lead.callback_at = Some(at);
            self.store.seed(lead.clone()).await;
            lead
        }
    }

    #[tokio::test]
    async fn alerts_once_per_due_event() {
        let fx = Fixture::new();
        let lead = fx.callback("Ada", "sam", t0() + chrono::Duration::seconds(30)).await;
        let scheduler = fx.scheduler(AlertScope::All);

        let first = scheduler.tick().await;
        assert_eq!(
            first,
            TickOutcome::Alerted {
                lead_id: lead.id.clone(),
                callback_at: t0() + chrono::Duration::seconds(30),
                delivered: true,
            }
        );

        fx.clock.advance(chrono::Duration::minutes(2));
        let second = scheduler.tick().await;
        assert_eq!(
            second,
            TickOutcome::Idle {
                candidates: 1,
                stale: 0,
                duplicate: 1
            }
        );
        assert_eq!(fx.sink.alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn callbacks_outside_the_window_wait() {
        let fx = Fixture::new();
        fx.callback("Ada", "sam", t0() + chrono::Duration::minutes(5)).await;
        let scheduler = fx.scheduler(AlertScope::All);

        assert!(!scheduler.tick().await.alerted());
        fx.clock.advance(chrono::Duration::minutes(4));
        assert!(scheduler.tick().await.alerted());
    }

    #[tokio::test]
    async fn at_most_one_alert_per_tick_in_due_order() {
        let fx = Fixture::new();
        let later = fx.callback("Later", "sam", t0() + chrono::Duration::seconds(40)).await;
        let sooner = fx.callback("Sooner", "sam", t0() + chrono::Duration::seconds(10)).await;
        let scheduler = fx.scheduler(AlertScope::All);

        let first = scheduler.tick().await;
        assert!(matches!(first, TickOutcome::Alerted { ref lead_id, .. } if *lead_id == sooner.id));
        let second = scheduler.tick().await;
        assert!(matches!(second, TickOutcome::Alerted { ref lead_id, .. } if *lead_id == later.id));
        assert!(!scheduler.tick().await.alerted());
    }

    #[tokio::test]
    async fn full_page_of_alerted_leads_does_not_hide_a_new_one() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(AlertScope::All);
        let page = scheduler.config().max_candidates_per_tick;
        for i in 0..page {
            let at = t0() - chrono::Duration::hours(1) + chrono::Duration::seconds(i as i64);
            fx.callback(&format!("Overdue {i}"), "sam", at).await;
        }
        for _ in 0..page {
            assert!(scheduler.tick().await.alerted());
        }
        assert!(!scheduler.tick().await.alerted());

        let fresh = fx.callback("Fresh", "sam", t0() + chrono::Duration::seconds(30)).await;
        let outcome = scheduler.tick().await;
        assert_eq!(
            outcome,
            TickOutcome::Alerted {
                lead_id: fresh.id.clone(),
                callback_at: t0() + chrono::Duration::seconds(30),
                delivered: true,
            }
        );

        assert_eq!(
            scheduler.tick().await,
            TickOutcome::Idle {
                candidates: page + 1,
                stale: 0,
                duplicate: page + 1,
            }
        );
        assert_eq!(fx.sink.alerts().await.len(), page + 1);
    }

    #[tokio::test]
    async fn stale_due_times_are_never_alerted() {
        let fx = Fixture::new();
        fx.callback("Ancient", "sam", t0() - chrono::Duration::hours(25)).await;
        let scheduler = fx.scheduler(AlertScope::All);

        assert!(!scheduler.tick().await.alerted());
        assert!(fx.sink.alerts().await.is_empty());
        assert_eq!(fx.dedup.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rescheduled_callback_is_a_new_event() {
        let fx = Fixture::new();
        let mut lead = fx.callback("Ada", "sam", t0() + chrono::Duration::seconds(30)).await;
        let scheduler = fx.scheduler(AlertScope::All);
        assert!(scheduler.tick().await.alerted());

        lead.callback_at = Some(t0() + chrono::Duration::seconds(50));
        fx.store.seed(lead).await;
        assert!(scheduler.tick().await.alerted());
        assert_eq!(fx.sink.alerts().await.len(), 2);
    }

    #[tokio::test]
    async fn owner_scopes_filter_and_keep_separate_keys() {
        let fx = Fixture::new();
        fx.callback("Shared", "sam", t0() + chrono::Duration::seconds(30)).await;
        fx.callback("Kims", "kim", t0() + chrono::Duration::seconds(20)).await;

        let everyone = fx.scheduler(AlertScope::All);
        let sam = fx.scheduler(AlertScope::OwnedBy("sam".into()));

        let sam_outcome = sam.tick().await;
        assert!(sam_outcome.alerted());
        assert!(!sam.tick().await.alerted());

        // The shared feed has its own key space, so Sam's alert does not hide it.
        assert!(everyone.tick().await.alerted());
        assert!(everyone.tick().await.alerted());
        assert!(!everyone.tick().await.alerted());
    }

    #[tokio::test]
    async fn failed_read_has_no_side_effects() {
        let fx = Fixture::new();
        fx.callback("Ada", "sam", t0()).await;
        fx.store.set_fail_reads(true);
        let scheduler = fx.scheduler(AlertScope::All);

        assert!(matches!(scheduler.tick().await, TickOutcome::ReadFailed { .. }));
        assert_eq!(fx.dedup.len().await.unwrap(), 0);
        assert!(fx.sink.alerts().await.is_empty());

        fx.store.set_fail_reads(false);
        assert!(scheduler.tick().await.alerted());
    }

    #[tokio::test]
    async fn failed_dedup_record_suppresses_emit() {
        let fx = Fixture::new();
        fx.callback("Ada", "sam", t0()).await;
        fx.dedup.set_fail_records(true);
        let scheduler = fx.scheduler(AlertScope::All);

        assert!(matches!(scheduler.tick().await, TickOutcome::DedupFailed { .. }));
        assert!(fx.sink.alerts().await.is_empty());

        fx.dedup.set_fail_records(false);
        assert!(scheduler.tick().await.alerted());
    }

    #[tokio::test]
    async fn sink_failure_is_recorded_and_not_retried() {
        let fx = Fixture::new();
        fx.callback("Ada", "sam", t0()).await;
        fx.sink.set_fail(true);
        let scheduler = fx.scheduler(AlertScope::All);

        assert!(matches!(
            scheduler.tick().await,
            TickOutcome::Alerted {
                delivered: false,
                ..
            }
        ));
        fx.sink.set_fail(false);
        assert!(!scheduler.tick().await.alerted());
    }

    #[tokio::test]
    async fn alert_includes_latest_note_when_available() {
        let fx = Fixture::new();
        let lead = fx.callback("Ada", "sam", t0()).await;
        fx.store
            .add_note(&Note::new(lead.id.clone(), "kim", "prefers evenings", t0()))
            .await
            .unwrap();
        let scheduler = fx.scheduler(AlertScope::All);

        scheduler.tick().await;
        let alerts = fx.sink.alerts().await;
        assert!(alerts[0].message.contains("prefers evenings"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_cancel() {
        let fx = Fixture::new();
        fx.callback("Ada", "sam", t0()).await;
        let scheduler = Arc::new(fx.scheduler(AlertScope::All));
        let cancel = CancellationToken::new();

        let handle = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };
        tokio::time::sleep(Duration::from_secs(60)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(fx.sink.alerts().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_a_stalled_tick() {
        let fx = Fixture::new();
        fx.store.set_delay(Some(Duration::from_secs(3600)));
        let scheduler = Arc::new(CallbackAlertScheduler::new(
            AlertSchedulerConfig {
                store_timeout: Duration::from_secs(7200),
                ..AlertSchedulerConfig::default()
            },
            fx.store.clone(),
            fx.dedup.clone(),
            fx.sink.clone(),
            fx.clock.clone(),
        ));
        let cancel = CancellationToken::new();
        let handle = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run should return promptly")
            .unwrap();
    }

    #[test]
    fn scopes_follow_owner_list() {
        let mut config = AlertsConfig::default();
        assert_eq!(scopes_from_config(&config), vec![AlertScope::All]);
        config.owners = vec!["sam".into(), "kim".into()];
        assert_eq!(
            scopes_from_config(&config),
            vec![
                AlertScope::OwnedBy("sam".into()),
                AlertScope::OwnedBy("kim".into())
            ]
        );
    }
}
