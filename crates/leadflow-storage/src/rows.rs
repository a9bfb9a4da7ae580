// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite tables and core domain types.

use chrono::{DateTime, Utc};
use leadflow_core::{DncBacklogEntry, Lead, LeadId, Note, SentToAttribution};
use rusqlite::Row;

use crate::database::parse_ts;

/// Column list for `SELECT`s that feed [`lead_from_row`].
pub const LEAD_COLUMNS: &str = "id, campaign, status, full_name, phone, assigned_to, \
     callback_at, callback_note, sent_to_staff, sent_to_client, prospect_owner, \
     created_at, updated_at";

/// Column list for `SELECT`s that feed [`backlog_from_row`].
pub const BACKLOG_COLUMNS: &str = "lead_id, campaign, status, full_name, phone, assigned_to, \
     callback_at, callback_note, sent_to_staff, sent_to_client, prospect_owner, \
     lead_created_at, reason, performed_by, backlogged_at";

/// Column list for `SELECT`s that feed [`note_from_row`].
pub const NOTE_COLUMNS: &str = "id, lead_id, author, body, created_at";

pub fn lead_from_row(row: &Row<'_>) -> Result<Lead, rusqlite::Error> {
    Ok(Lead {
        id: LeadId(row.get(0)?),
        campaign: row.get(1)?,
        status: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        assigned_to: row.get(5)?,
        callback_at: optional_ts(row, 6)?,
        callback_note: row.get(7)?,
        sent_to: attribution(row, 8, 9)?,
        prospect_owner: row.get(10)?,
        created_at: required_ts(row, 11)?,
        updated_at: required_ts(row, 12)?,
    })
}

pub fn backlog_from_row(row: &Row<'_>) -> Result<DncBacklogEntry, rusqlite::Error> {
    Ok(DncBacklogEntry {
        lead_id: LeadId(row.get(0)?),
        campaign: row.get(1)?,
        status: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        assigned_to: row.get(5)?,
        callback_at: optional_ts(row, 6)?,
        callback_note: row.get(7)?,
        sent_to: attribution(row, 8, 9)?,
        prospect_owner: row.get(10)?,
        lead_created_at: required_ts(row, 11)?,
        reason: row.get(12)?,
        performed_by: row.get(13)?,
        backlogged_at: required_ts(row, 14)?,
    })
}

pub fn note_from_row(row: &Row<'_>) -> Result<Note, rusqlite::Error> {
    Ok(Note {
        id: row.get(0)?,
        lead_id: LeadId(row.get(1)?),
        author: row.get(2)?,
        body: row.get(3)?,
        created_at: required_ts(row, 4)?,
    })
}

/// Split attribution into its two nullable columns.
pub fn attribution_columns(sent_to: &Option<SentToAttribution>) -> (Option<String>, Option<String>) {
    match sent_to {
        Some(a) => (Some(a.staff_name.clone()), Some(a.client_name.clone())),
        None => (None, None),
    }
}

fn required_ts(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

fn optional_ts(row: &Row<'_>, idx: usize) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| parse_ts(idx, &raw)).transpose()
}

fn attribution(
    row: &Row<'_>,
    staff_idx: usize,
    client_idx: usize,
) -> Result<Option<SentToAttribution>, rusqlite::Error> {
    let staff: Option<String> = row.get(staff_idx)?;
    let client: Option<String> = row.get(client_idx)?;
    Ok(match (staff, client) {
        (Some(staff_name), Some(client_name)) => Some(SentToAttribution {
            staff_name,
            client_name,
        }),
        _ => None,
    })
}
