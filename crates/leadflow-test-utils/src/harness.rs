// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end workflow tests.
//!
//! `TestHarness` wires a campaign registry, transition coordinator, DNC
//! migration, and callback alert scheduler over one store, a recording sink,
//! and a manual clock. The store is either in-memory or a temp SQLite file.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use leadflow_alerts::{AlertSchedulerConfig, CallbackAlertScheduler, TickOutcome};
use leadflow_config::model::{AlertsConfig, StorageConfig, WorkflowConfig};
use leadflow_core::{
    AlertDedupStore, AlertScope, CallbackAlert, Clock, Lead, LeadStore, LeadflowError,
    NotificationSink,
};
use leadflow_storage::{SqliteStorage, dedup_retention};
use leadflow_workflow::{CampaignRegistry, DncMigration, TransitionCoordinator};

use crate::clock::ManualClock;
use crate::memory_store::{MemoryDedupStore, MemoryLeadStore};
use crate::recording_sink::RecordingSink;

/// Which store implementation backs the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: Backend,
    start: DateTime<Utc>,
    scope: AlertScope,
    alerts: AlertsConfig,
    workflow: WorkflowConfig,
    registry: Option<CampaignRegistry>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: Backend::Memory,
            start: Utc
                .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            scope: AlertScope::All,
            alerts: AlertsConfig::default(),
            workflow: WorkflowConfig::default(),
            registry: None,
        }
    }

    /// Back the harness with a SQLite database in a temp directory.
    pub fn with_sqlite(mut self) -> Self {
        self.backend = Backend::Sqlite;
        self
    }

    /// Set the manual clock's starting instant.
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    pub fn with_scope(mut self, scope: AlertScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_alerts_config(mut self, alerts: AlertsConfig) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_workflow_config(mut self, workflow: WorkflowConfig) -> Self {
        self.workflow = workflow;
        self
    }

    /// Use a custom registry instead of the compiled-in campaign set.
    pub fn with_registry(mut self, registry: CampaignRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, LeadflowError> {
        let clock = Arc::new(ManualClock::new(self.start));
        let sink = Arc::new(RecordingSink::new());

        let (store, dedup, memory, sqlite, temp_dir): (
            Arc<dyn LeadStore>,
            Arc<dyn AlertDedupStore>,
            Option<Arc<MemoryLeadStore>>,
            Option<Arc<SqliteStorage>>,
            Option<tempfile::TempDir>,
        ) = match self.backend {
            Backend::Memory => {
                let memory = Arc::new(MemoryLeadStore::new());
                let store: Arc<dyn LeadStore> = memory.clone();
                let dedup: Arc<dyn AlertDedupStore> =
                    Arc::new(MemoryDedupStore::new(dedup_retention(&self.alerts)));
                (store, dedup, Some(memory), None, None)
            }
            Backend::Sqlite => {
                let temp_dir = tempfile::TempDir::new()
                    .map_err(|e| LeadflowError::Storage { source: e.into() })?;
                let db_path = temp_dir.path().join("test.db");
                let storage = SqliteStorage::new(StorageConfig {
                    database_path: db_path.to_string_lossy().into_owned(),
                    ..StorageConfig::default()
                })
                .with_dedup_retention(dedup_retention(&self.alerts));
                storage.initialize().await?;
                let storage = Arc::new(storage);
                let store: Arc<dyn LeadStore> = storage.clone();
                let dedup: Arc<dyn AlertDedupStore> = storage.clone();
                (store, dedup, None, Some(storage), Some(temp_dir))
            }
        };

        let registry = Arc::new(self.registry.unwrap_or_else(CampaignRegistry::builtin));
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let coordinator = TransitionCoordinator::new(
            store.clone(),
            registry.clone(),
            dyn_clock.clone(),
            &self.workflow,
        );
        let dnc = DncMigration::new(
            store.clone(),
            dyn_clock.clone(),
            self.workflow.store_timeout(),
        );
        let dyn_sink: Arc<dyn NotificationSink> = sink.clone();
        let scheduler = CallbackAlertScheduler::new(
            AlertSchedulerConfig::from_config(&self.alerts, self.scope),
            store.clone(),
            dedup.clone(),
            dyn_sink,
            dyn_clock,
        );

        Ok(TestHarness {
            store,
            dedup,
            memory,
            sqlite,
            sink,
            clock,
            registry,
            coordinator,
            dnc,
            scheduler,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete workflow environment with a recording sink and manual clock.
pub struct TestHarness {
    /// The lead store every component shares.
    pub store: Arc<dyn LeadStore>,
    /// The dedup store the scheduler records into.
    pub dedup: Arc<dyn AlertDedupStore>,
    memory: Option<Arc<MemoryLeadStore>>,
    sqlite: Option<Arc<SqliteStorage>>,
    /// Captures every alert the scheduler emits.
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<ManualClock>,
    pub registry: Arc<CampaignRegistry>,
    pub coordinator: TransitionCoordinator,
    pub dnc: DncMigration,
    pub scheduler: CallbackAlertScheduler,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The in-memory store, for failure injection. `None` on SQLite.
    pub fn memory_store(&self) -> Option<&Arc<MemoryLeadStore>> {
        self.memory.as_ref()
    }

    pub fn sqlite_storage(&self) -> Option<&Arc<SqliteStorage>> {
        self.sqlite.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create and persist a lead stamped with the harness clock.
    pub async fn seed_lead(
        &self,
        campaign: &str,
        status: &str,
        name: &str,
        phone: &str,
    ) -> Result<Lead, LeadflowError> {
        let lead = Lead::new(campaign, status, name, phone, self.clock.now());
        self.store.insert_lead(&lead).await?;
        Ok(lead)
    }

    /// Move the manual clock forward.
    pub fn advance(&self, by: TimeDelta) {
        self.clock.advance(by);
    }

    /// Run one scheduler tick.
    pub async fn tick(&self) -> TickOutcome {
        self.scheduler.tick().await
    }

    /// Alerts emitted so far.
    pub async fn alerts(&self) -> Vec<CallbackAlert> {
        self.sink.alerts().await
    }
}
