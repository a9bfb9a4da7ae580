// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durability tests: state written through one `SqliteStorage` is visible to
//! the next one opened on the same file.

use chrono::{TimeZone, Utc};
use leadflow_config::model::StorageConfig;
use leadflow_core::{
    AlertDedupStore, AlertScope, DedupKey, DncBacklogEntry, Lead, LeadStore, PluginAdapter,
};
use leadflow_storage::SqliteStorage;

fn storage_at(dir: &tempfile::TempDir) -> SqliteStorage {
    SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("leads.db").to_string_lossy().into_owned(),
        ..StorageConfig::default()
    })
}

#[tokio::test]
async fn dedup_records_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
    let lead = Lead::new("ECO4", "Callback", "Ada", "07700900001", at);
    let key = DedupKey::new(&AlertScope::All, lead.id.clone(), at);

    let first = storage_at(&dir);
    first.initialize().await.unwrap();
    assert!(first.try_record(&key).await.unwrap());
    first.shutdown().await.unwrap();
    drop(first);

    let second = storage_at(&dir);
    second.initialize().await.unwrap();
    assert!(second.contains(&key).await.unwrap());
    assert!(!second.try_record(&key).await.unwrap());

    // Another scope keeps its own key space.
    let owned = DedupKey::new(&AlertScope::OwnedBy("sam".into()), lead.id.clone(), at);
    assert!(second.try_record(&owned).await.unwrap());
    assert_eq!(second.len().await.unwrap(), 2);
}

#[tokio::test]
async fn leads_and_backlog_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
    let kept = Lead::new("SOLAR", "New Lead", "Grace", "07700900002", now).assigned("kim");
    let gone = Lead::new("SOLAR", "Not Interested", "Alan", "07700900003", now);

    let first = storage_at(&dir);
    first.initialize().await.unwrap();
    first.insert_lead(&kept).await.unwrap();
    first.insert_lead(&gone).await.unwrap();
    first
        .insert_backlog(&DncBacklogEntry::from_lead(&gone, "rude", "sam", now))
        .await
        .unwrap();
    assert!(first.delete_lead(&gone.id).await.unwrap());
    first.shutdown().await.unwrap();
    drop(first);

    let second = storage_at(&dir);
    second.initialize().await.unwrap();
    assert_eq!(second.get_lead(&kept.id).await.unwrap(), Some(kept));
    assert_eq!(second.get_lead(&gone.id).await.unwrap(), None);
    let entry = second
        .get_backlog_by_phone("07700900003")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.lead_id, gone.id);
    assert_eq!(entry.performed_by, "sam");

    let dup = second
        .insert_backlog(&DncBacklogEntry::from_lead(&gone, "again", "kim", now))
        .await
        .unwrap_err();
    assert!(dup.is_conflict());
}
