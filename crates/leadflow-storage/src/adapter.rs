// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the lead store and alert dedup store traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use leadflow_config::model::{AlertsConfig, StorageConfig};
use leadflow_core::{
    AdapterType, AlertDedupStore, DedupKey, DedupRetention, DncBacklogEntry, HealthStatus, Lead, LeadId,
    LeadQuery, LeadStore, LeadUpdate, LeadflowError, Note, PluginAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;


/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all operations to the typed
/// query modules. The database is opened on the first call to
/// [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    dedup_retention: DedupRetention,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            dedup_retention: dedup_retention(&AlertsConfig::default()),
            db: OnceCell::new(),
        }
    }

    /// Set how alert dedup records are pruned.
    pub fn with_dedup_retention(mut self, retention: DedupRetention) -> Self {
        self.dedup_retention = retention;
        self
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), LeadflowError> {
        let db = Database::open_with(&self.config).await?;
        self.db.set(db).map_err(|_| LeadflowError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoint the WAL. The connection closes when the adapter is dropped.
    pub async fn close(&self) -> Result<(), LeadflowError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, LeadflowError> {
        self.db.get().ok_or_else(|| LeadflowError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LeadStore
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        if self.db.get().is_some() {
            self.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for SqliteStorage {
    // --- Lead operations ---

    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadflowError> {
        queries::leads::insert_lead(self.db()?, lead).await
    }

    async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>, LeadflowError> {
        queries::leads::get_lead(self.db()?, id).await
    }

    async fn update_lead(&self, id: &LeadId, update: &LeadUpdate) -> Result<(), LeadflowError> {
        queries::leads::update_lead(self.db()?, id, update).await
    }

    async fn delete_lead(&self, id: &LeadId) -> Result<bool, LeadflowError> {
        queries::leads::delete_lead(self.db()?, id).await
    }

    async fn query_leads(&self, query: &LeadQuery) -> Result<Vec<Lead>, LeadflowError> {
        queries::leads::query_leads(self.db()?, query).await
    }

    // --- Note operations ---

    async fn add_note(&self, note: &Note) -> Result<(), LeadflowError> {
        queries::notes::add_note(self.db()?, note).await
    }

    async fn recent_notes(
        &self,
        lead_id: &LeadId,
        limit: usize,
    ) -> Result<Vec<Note>, LeadflowError> {
        queries::notes::recent_notes(self.db()?, lead_id, limit).await
    }

    // --- Do-not-call backlog ---

    async fn insert_backlog(&self, entry: &DncBacklogEntry) -> Result<(), LeadflowError> {
        queries::backlog::insert_backlog(self.db()?, entry).await
    }

    async fn get_backlog_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<DncBacklogEntry>, LeadflowError> {
        queries::backlog::get_backlog_by_phone(self.db()?, phone).await
    }
}

/// Dedup pruning derived from the alert settings.
pub fn dedup_retention(alerts: &AlertsConfig) -> DedupRetention {
    DedupRetention::new(alerts.dedup_retention, alerts.dedup_horizon())
}

#[async_trait]
impl AlertDedupStore for SqliteStorage {
    async fn try_record(&self, key: &DedupKey) -> Result<bool, LeadflowError> {
        queries::alerts::try_record(self.db()?, key, self.dedup_retention).await
    }

    async fn contains(&self, key: &DedupKey) -> Result<bool, LeadflowError> {
        queries::alerts::contains(self.db()?, key).await
    }

    async fn len(&self) -> Result<usize, LeadflowError> {
        queries::alerts::count(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use leadflow_core::{AlertScope, FieldChange};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::LeadStore);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(storage.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn lead_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let lead = Lead::new("ECO4", "New Lead", "Ada", "0700", now).assigned("sam");
        storage.insert_lead(&lead).await.unwrap();
        storage
            .add_note(&Note::new(lead.id.clone(), "sam", "left voicemail", now))
            .await
            .unwrap();

        let update = LeadUpdate {
            status: "Not Interested".into(),
            callback: FieldChange::Clear,
            sent_to: None,
            prospect_owner: None,
            updated_at: now + Duration::minutes(1),
        };
        storage.update_lead(&lead.id, &update).await.unwrap();
        let stored = storage.get_lead(&lead.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "Not Interested");

        let entry = DncBacklogEntry::from_lead(&stored, "do not call", "kim", now);
        storage.insert_backlog(&entry).await.unwrap();
        assert!(storage.delete_lead(&lead.id).await.unwrap());
        assert!(storage.recent_notes(&lead.id, 5).await.unwrap().is_empty());
        assert!(storage.get_backlog_by_phone("0700").await.unwrap().is_some());

        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn dedup_store_honours_retention() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("dedup.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()))
            .with_dedup_retention(DedupRetention::new(2, std::time::Duration::from_secs(3600)));
        storage.initialize().await.unwrap();

        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        for (i, lead) in ["a", "b", "c"].into_iter().enumerate() {
            let key = DedupKey::new(
                &AlertScope::All,
                LeadId::from(lead),
                at + Duration::hours(2 * i as i64),
            );
            assert!(storage.try_record(&key).await.unwrap());
        }
        assert_eq!(storage.len().await.unwrap(), 2);
    }
}
