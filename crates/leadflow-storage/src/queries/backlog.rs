// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Do-not-call backlog operations.

use leadflow_core::{DncBacklogEntry, LeadflowError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, format_ts, is_constraint_violation, map_tr_err};
use crate::rows::{BACKLOG_COLUMNS, attribution_columns, backlog_from_row};

/// Insert a backlog entry.
///
/// Returns [`LeadflowError::Conflict`] if the phone number is already present.
pub async fn insert_backlog(db: &Database, entry: &DncBacklogEntry) -> Result<(), LeadflowError> {
    let entry = entry.clone();
    let phone = entry.phone.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let (sent_staff, sent_client) = attribution_columns(&entry.sent_to);
            let result = conn.execute(
                "INSERT INTO dnc_backlog (lead_id, campaign, status, full_name, phone,
                    assigned_to, callback_at, callback_note, sent_to_staff, sent_to_client,
                    prospect_owner, lead_created_at, reason, performed_by, backlogged_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    entry.lead_id.as_str(),
                    entry.campaign,
                    entry.status,
                    entry.full_name,
                    entry.phone,
                    entry.assigned_to,
                    entry.callback_at.as_ref().map(format_ts),
                    entry.callback_note,
                    sent_staff,
                    sent_client,
                    entry.prospect_owner,
                    format_ts(&entry.lead_created_at),
                    entry.reason,
                    entry.performed_by,
                    format_ts(&entry.backlogged_at),
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(LeadflowError::Conflict {
            entity: "dnc_backlog".to_string(),
            key: phone,
        })
    }
}

/// Look up a backlog entry by phone number.
pub async fn get_backlog_by_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<DncBacklogEntry>, LeadflowError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DncBacklogEntry>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {BACKLOG_COLUMNS} FROM dnc_backlog WHERE phone = ?1"),
                params![phone],
                backlog_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
