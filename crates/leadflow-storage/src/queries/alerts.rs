// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback alert dedup log.
//!
//! One row per (namespace, lead, callback time) that has been alerted. Each
//! namespace is capped at a retention count, oldest rows first, but a row is
//! only pruned once its callback time is past the retention horizon.

use leadflow_core::{DedupKey, DedupRetention, LeadflowError};
use rusqlite::params;

use crate::database::{Database, format_ts, map_tr_err};

/// Record `key` if absent and prune its namespace per `retention`.
///
/// Returns `true` if the key was newly recorded. The check, the insert, and
/// the prune run in one transaction.
pub async fn try_record(
    db: &Database,
    key: &DedupKey,
    retention: DedupRetention,
) -> Result<bool, LeadflowError> {
    let namespace = key.namespace.clone();
    let lead_id = key.lead_id.to_string();
    let callback_at = format_ts(&key.callback_at);
    let prune_before = format_ts(&retention.prune_before(key));
    let keep = i64::try_from(retention.per_namespace).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO alert_dedup (namespace, lead_id, callback_at)
                 VALUES (?1, ?2, ?3)",
                params![namespace, lead_id, callback_at],
            )?;
            if inserted > 0 {
                tx.execute(
                    "DELETE FROM alert_dedup
                     WHERE namespace = ?1
                       AND callback_at < ?2
                       AND seq <= (
                           SELECT seq FROM alert_dedup WHERE namespace = ?1
                           ORDER BY seq DESC LIMIT 1 OFFSET ?3
                       )",
                    params![namespace, prune_before, keep],
                )?;
            }
            tx.commit()?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Returns `true` if `key` is currently recorded.
pub async fn contains(db: &Database, key: &DedupKey) -> Result<bool, LeadflowError> {
    let namespace = key.namespace.clone();
    let lead_id = key.lead_id.to_string();
    let callback_at = format_ts(&key.callback_at);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM alert_dedup
                 WHERE namespace = ?1 AND lead_id = ?2 AND callback_at = ?3",
                params![namespace, lead_id, callback_at],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of retained dedup records.
pub async fn count(db: &Database) -> Result<usize, LeadflowError> {
    let count = db
        .connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM alert_dedup", [], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)?;
    Ok(usize::try_from(count).unwrap_or(0))
}
