// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end workflow tests.
//!
//! Each scenario runs twice, once over the in-memory store and once over a
//! temp SQLite database, through an isolated TestHarness. Tests are
//! independent and order-insensitive.

use std::sync::Arc;

use chrono::TimeDelta;
use leadflow_alerts::{CallbackAlertScheduler, TickOutcome};
use leadflow_config::model::AlertsConfig;
use leadflow_core::{AlertScope, LeadStore, Note};
use leadflow_test_utils::{TestHarness, TestHarnessBuilder};
use leadflow_workflow::{DncOutcome, TransitionError, TransitionPayload};

fn builder(sqlite: bool) -> TestHarnessBuilder {
    let builder = TestHarness::builder();
    if sqlite { builder.with_sqlite() } else { builder }
}

async fn harness(sqlite: bool) -> TestHarness {
    builder(sqlite).build().await.unwrap()
}

/// Declare a memory and a SQLite test for one scenario.
macro_rules! both_backends {
    ($scenario:ident, $memory:ident, $sqlite:ident) => {
        #[tokio::test]
        async fn $memory() {
            $scenario(false).await;
        }

        #[tokio::test]
        async fn $sqlite() {
            $scenario(true).await;
        }
    };
}

// ---- Callback lifecycle: one alert per due event ----

async fn callback_alerts_exactly_once(sqlite: bool) {
    let h = harness(sqlite).await;
    let lead = h
        .seed_lead("ECO4", "New Lead", "Ada Byron", "07700900001")
        .await
        .unwrap();

    let due = h.now() + TimeDelta::minutes(5);
    let lead = h
        .coordinator
        .request_transition(
            &lead,
            "Callback",
            TransitionPayload::callback(due).with_note("asked for a call after lunch"),
        )
        .await
        .unwrap();
    assert_eq!(lead.callback_at, Some(due));

    // Five minutes out is beyond the 60s look-ahead.
    assert!(!h.tick().await.alerted());
    assert!(h.alerts().await.is_empty());

    h.advance(TimeDelta::minutes(5));
    let outcome = h.tick().await;
    assert_eq!(
        outcome,
        TickOutcome::Alerted {
            lead_id: lead.id.clone(),
            callback_at: due,
            delivered: true,
        }
    );

    h.advance(TimeDelta::seconds(25));
    assert!(!h.tick().await.alerted());

    let alerts = h.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].title, "Callback due: Ada Byron");
    assert!(alerts[0].message.contains("asked for a call after lunch"));
}
both_backends!(
    callback_alerts_exactly_once,
    memory_callback_alerts_exactly_once,
    sqlite_callback_alerts_exactly_once
);

// ---- Leaving Callback clears the schedule ----

async fn leaving_callback_clears_schedule(sqlite: bool) {
    let h = harness(sqlite).await;
    let lead = h
        .seed_lead("ECO4", "New Lead", "Grace Hopper", "07700900002")
        .await
        .unwrap();
    let lead = h
        .coordinator
        .request_transition(
            &lead,
            "Callback",
            TransitionPayload::callback(h.now() + TimeDelta::hours(1)).with_note("evening"),
        )
        .await
        .unwrap();

    let contacted = h
        .coordinator
        .request_transition(&lead, "Contacted", TransitionPayload::default())
        .await
        .unwrap();
    assert_eq!(contacted.callback_at, None);
    assert_eq!(contacted.callback_note, None);

    let stored = h.store.get_lead(&lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "Contacted");
    assert_eq!(stored.callback_at, None);
    assert_eq!(stored.callback_note, None);

    // Nothing is left to alert on.
    h.advance(TimeDelta::hours(1));
    assert!(!h.tick().await.alerted());
}
both_backends!(
    leaving_callback_clears_schedule,
    memory_leaving_callback_clears_schedule,
    sqlite_leaving_callback_clears_schedule
);

// ---- Missing callback time never touches the store ----

async fn missing_callback_time_is_rejected(sqlite: bool) {
    let h = harness(sqlite).await;
    let lead = h
        .seed_lead("SOLAR", "Contacted", "Alan Turing", "07700900003")
        .await
        .unwrap();

    let err = h
        .coordinator
        .request_transition(&lead, "Callback", TransitionPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::MissingCallbackTime { .. }));

    let stored = h.store.get_lead(&lead.id).await.unwrap().unwrap();
    assert_eq!(stored, lead);
}
both_backends!(
    missing_callback_time_is_rejected,
    memory_missing_callback_time_is_rejected,
    sqlite_missing_callback_time_is_rejected
);

// ---- Rescheduling replaces the due event ----

async fn reschedule_alerts_only_new_time(sqlite: bool) {
    let h = harness(sqlite).await;
    let lead = h
        .seed_lead("HOME_INSULATION", "New Lead", "Katherine Johnson", "07700900004")
        .await
        .unwrap();

    let first = h.now() + TimeDelta::minutes(30);
    let second = h.now() + TimeDelta::minutes(10);
    let lead = h
        .coordinator
        .request_transition(&lead, "Callback", TransitionPayload::callback(first))
        .await
        .unwrap();
    h.coordinator
        .request_transition(&lead, "Callback", TransitionPayload::callback(second))
        .await
        .unwrap();

    h.advance(TimeDelta::minutes(10));
    match h.tick().await {
        TickOutcome::Alerted { callback_at, .. } => assert_eq!(callback_at, second),
        other => panic!("expected an alert, got {other:?}"),
    }

    h.advance(TimeDelta::minutes(20));
    assert!(!h.tick().await.alerted());
    assert_eq!(h.alerts().await.len(), 1);
}
both_backends!(
    reschedule_alerts_only_new_time,
    memory_reschedule_alerts_only_new_time,
    sqlite_reschedule_alerts_only_new_time
);

// ---- Stale due events are skipped ----

async fn stale_callback_is_never_alerted(sqlite: bool) {
    let h = harness(sqlite).await;
    let lead = h
        .seed_lead("ECO4", "New Lead", "Mary Somerville", "07700900005")
        .await
        .unwrap();
    h.coordinator
        .request_transition(
            &lead,
            "Callback",
            TransitionPayload::callback(h.now() + TimeDelta::minutes(2)),
        )
        .await
        .unwrap();

    // The scheduler was down for a day and a bit.
    h.advance(TimeDelta::hours(25));
    assert!(matches!(h.tick().await, TickOutcome::Idle { .. }));
    assert!(h.alerts().await.is_empty());
}
both_backends!(
    stale_callback_is_never_alerted,
    memory_stale_callback_is_never_alerted,
    sqlite_stale_callback_is_never_alerted
);

// ---- One due lead per tick, oldest first ----

async fn one_alert_per_tick_oldest_first(sqlite: bool) {
    let h = harness(sqlite).await;
    let mut due = Vec::new();
    for (i, name) in ["First", "Second", "Third"].iter().enumerate() {
        let lead = h
            .seed_lead("ECO4", "New Lead", name, &format!("0770090010{i}"))
            .await
            .unwrap();
        let at = h.now() + TimeDelta::seconds(10 * (i as i64 + 1));
        h.coordinator
            .request_transition(&lead, "Callback", TransitionPayload::callback(at))
            .await
            .unwrap();
        due.push(lead.id);
    }

    for expected in &due {
        match h.tick().await {
            TickOutcome::Alerted { lead_id, .. } => assert_eq!(&lead_id, expected),
            other => panic!("expected an alert, got {other:?}"),
        }
    }
    assert!(!h.tick().await.alerted());
    assert_eq!(h.alerts().await.len(), 3);
}
both_backends!(
    one_alert_per_tick_oldest_first,
    memory_one_alert_per_tick_oldest_first,
    sqlite_one_alert_per_tick_oldest_first
);

// ---- Owner scope only sees its own leads and notes reach the alert ----

async fn owner_scope_filters_leads(sqlite: bool) {
    let h = builder(sqlite)
        .with_scope(AlertScope::OwnedBy("sam".into()))
        .build()
        .await
        .unwrap();

    let mine = leadflow_core::Lead::new("SOLAR", "New Lead", "Mine", "07700900201", h.now())
        .assigned("sam");
    let theirs = leadflow_core::Lead::new("SOLAR", "New Lead", "Theirs", "07700900202", h.now())
        .assigned("kim");
    for lead in [&mine, &theirs] {
        h.store.insert_lead(lead).await.unwrap();
    }
    let at = h.now() + TimeDelta::seconds(30);
    for lead in [&theirs, &mine] {
        h.coordinator
            .request_transition(lead, "Callback", TransitionPayload::callback(at))
            .await
            .unwrap();
    }
    h.store
        .add_note(&Note::new(mine.id.clone(), "kim", "Prefers mornings", h.now()))
        .await
        .unwrap();

    match h.tick().await {
        TickOutcome::Alerted { lead_id, .. } => assert_eq!(lead_id, mine.id),
        other => panic!("expected an alert, got {other:?}"),
    }
    assert!(!h.tick().await.alerted());

    let alerts = h.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.contains("Latest note from kim: Prefers mornings"));
}
both_backends!(
    owner_scope_filters_leads,
    memory_owner_scope_filters_leads,
    sqlite_owner_scope_filters_leads
);

// ---- DNC migration is idempotent per phone ----

async fn dnc_migration_twice_keeps_one_entry(sqlite: bool) {
    let h = harness(sqlite).await;
    let lead = h
        .seed_lead("ECO4", "Not Interested", "Ada Lovelace", "07700900006")
        .await
        .unwrap();

    let first = h
        .dnc
        .migrate(&lead, "asked not to be called", "sam")
        .await
        .unwrap();
    assert_eq!(first, DncOutcome::Migrated);

    let second = h
        .dnc
        .migrate(&lead, "asked not to be called", "sam")
        .await
        .unwrap();
    assert_eq!(second, DncOutcome::AlreadyRemoved);

    assert!(h.store.get_lead(&lead.id).await.unwrap().is_none());
    let entry = h
        .store
        .get_backlog_by_phone("07700900006")
        .await
        .unwrap()
        .expect("phone should be backlogged");
    assert_eq!(entry.lead_id, lead.id);
    assert_eq!(entry.reason, "asked not to be called");
    assert_eq!(entry.performed_by, "sam");
}
both_backends!(
    dnc_migration_twice_keeps_one_entry,
    memory_dnc_migration_twice_keeps_one_entry,
    sqlite_dnc_migration_twice_keeps_one_entry
);

// ---- Dedup records are shared by every scheduler over one store ----

/// A second scheduler sharing every adapter with the harness.
fn twin_scheduler(h: &TestHarness) -> Arc<CallbackAlertScheduler> {
    Arc::new(CallbackAlertScheduler::new(
        h.scheduler.config().clone(),
        h.store.clone(),
        h.dedup.clone(),
        h.sink.clone(),
        h.clock.clone(),
    ))
}

// ---- Two schedulers racing on one scope never both alert a due event ----

async fn racing_schedulers_alert_each_event_once(sqlite: bool) {
    let h = harness(sqlite).await;
    let mut due = Vec::new();
    for i in 0..4 {
        let lead = h
            .seed_lead("ECO4", "New Lead", &format!("Racer {i}"), &format!("0770090030{i}"))
            .await
            .unwrap();
        h.coordinator
            .request_transition(
                &lead,
                "Callback",
                TransitionPayload::callback(h.now() + TimeDelta::seconds(5 + i)),
            )
            .await
            .unwrap();
        due.push(lead.id);
    }

    let (left, right) = (twin_scheduler(&h), twin_scheduler(&h));
    for _ in 0..due.len() {
        let (l, r) = (left.clone(), right.clone());
        let a = tokio::spawn(async move { l.tick().await });
        let b = tokio::spawn(async move { r.tick().await });
        let (a, b) = tokio::join!(a, b);
        let (a, b) = (a.unwrap(), b.unwrap());
        if let (
            TickOutcome::Alerted { lead_id: x, .. },
            TickOutcome::Alerted { lead_id: y, .. },
        ) = (&a, &b)
        {
            assert_ne!(x, y, "both schedulers alerted the same event");
        }
    }
    assert!(!left.tick().await.alerted());
    assert!(!right.tick().await.alerted());

    let mut alerted: Vec<_> = h.alerts().await.into_iter().map(|a| a.lead_id).collect();
    assert_eq!(alerted.len(), due.len());
    alerted.sort();
    due.sort();
    assert_eq!(alerted, due);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn memory_racing_schedulers_alert_each_event_once() {
    racing_schedulers_alert_each_event_once(false).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sqlite_racing_schedulers_alert_each_event_once() {
    racing_schedulers_alert_each_event_once(true).await;
}

#[tokio::test]
async fn sqlite_dedup_survives_scheduler_restart() {
    let h = builder(true)
        .with_alerts_config(AlertsConfig {
            dedup_retention: 10,
            max_candidates_per_tick: 5,
            ..AlertsConfig::default()
        })
        .build()
        .await
        .unwrap();
    let lead = h
        .seed_lead("ECO4", "New Lead", "Edith Clarke", "07700900007")
        .await
        .unwrap();
    h.coordinator
        .request_transition(
            &lead,
            "Callback",
            TransitionPayload::callback(h.now() + TimeDelta::seconds(20)),
        )
        .await
        .unwrap();
    assert!(h.tick().await.alerted());

    // A second scheduler over the same store shares the dedup records.
    let restarted = CallbackAlertScheduler::new(
        h.scheduler.config().clone(),
        h.store.clone(),
        h.dedup.clone(),
        h.sink.clone(),
        h.clock.clone(),
    );
    assert!(!restarted.tick().await.alerted());
    assert_eq!(h.alerts().await.len(), 1);
}
