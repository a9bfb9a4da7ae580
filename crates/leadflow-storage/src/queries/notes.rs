// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead note operations.

use leadflow_core::{LeadId, LeadflowError, Note};
use rusqlite::params;

use crate::database::{Database, format_ts, map_tr_err};
use crate::rows::{NOTE_COLUMNS, note_from_row};

/// Attach a note to a lead.
pub async fn add_note(db: &Database, note: &Note) -> Result<(), LeadflowError> {
    let note = note.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO lead_notes (id, lead_id, author, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    note.id,
                    note.lead_id.as_str(),
                    note.author,
                    note.body,
                    format_ts(&note.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` most recent notes for a lead, newest first.
pub async fn recent_notes(
    db: &Database,
    lead_id: &LeadId,
    limit: usize,
) -> Result<Vec<Note>, LeadflowError> {
    let lead_id = lead_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<Note>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM lead_notes
                 WHERE lead_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![lead_id, limit], note_from_row)?;
            let mut notes = Vec::new();
            for row in rows {
                notes.push(row?);
            }
            Ok(notes)
        })
        .await
        .map_err(map_tr_err)
}
