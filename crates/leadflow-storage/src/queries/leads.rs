// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead CRUD and filtered listing.

use leadflow_core::{Lead, LeadId, LeadOrder, LeadQuery, LeadUpdate, LeadflowError};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, format_ts, is_constraint_violation, map_tr_err};
use crate::rows::{LEAD_COLUMNS, attribution_columns, lead_from_row};

/// Insert a new lead.
///
/// Returns [`LeadflowError::Conflict`] if a lead with the same id exists and
/// [`LeadflowError::InvalidLead`] if its callback time disagrees with its
/// status.
pub async fn insert_lead(db: &Database, lead: &Lead) -> Result<(), LeadflowError> {
    lead.ensure_consistent_callback()?;
    let lead = lead.clone();
    let id = lead.id.to_string();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let (sent_staff, sent_client) = attribution_columns(&lead.sent_to);
            let result = conn.execute(
                "INSERT INTO leads (id, campaign, status, full_name, phone, assigned_to,
                    callback_at, callback_note, sent_to_staff, sent_to_client, prospect_owner,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    lead.id.as_str(),
                    lead.campaign,
                    lead.status,
                    lead.full_name,
                    lead.phone,
                    lead.assigned_to,
                    lead.callback_at.as_ref().map(format_ts),
                    lead.callback_note,
                    sent_staff,
                    sent_client,
                    lead.prospect_owner,
                    format_ts(&lead.created_at),
                    format_ts(&lead.updated_at),
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
            entity: "lead".to_string(),
            key: id,
        })
    }
}

/// Get a lead by id.
pub async fn get_lead(db: &Database, id: &LeadId) -> Result<Option<Lead>, LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Lead>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![id],
                lead_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply `update` to a stored lead.
///
/// The read and write happen in one transaction on the writer thread, so the
/// delta is never applied to a stale copy.
pub async fn update_lead(
    db: &Database,
    id: &LeadId,
    update: &LeadUpdate,
) -> Result<(), LeadflowError> {
    let key = id.to_string();
    let update = update.clone();
    let id_for_err = key.clone();
    let found = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let current = tx
                .query_row(
                    &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                    params![key],
                    lead_from_row,
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(false);
            };

            let next = update.apply_to(&current);
            let (sent_staff, sent_client) = attribution_columns(&next.sent_to);
            tx.execute(
                "UPDATE leads SET status = ?2, callback_at = ?3, callback_note = ?4,
                    sent_to_staff = ?5, sent_to_client = ?6, prospect_owner = ?7,
                    updated_at = ?8
                 WHERE id = ?1",
                params![
                    key,
                    next.status,
                    next.callback_at.as_ref().map(format_ts),
                    next.callback_note,
                    sent_staff,
                    sent_client,
                    next.prospect_owner,
                    format_ts(&next.updated_at),
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;

    if found {
        Ok(())
    } else {
        Err(LeadflowError::NotFound {
            entity: "lead".to_string(),
            id: id_for_err,
        })
    }
}

/// Delete a lead and its notes. Returns `false` if the lead did not exist.
pub async fn delete_lead(db: &Database, id: &LeadId) -> Result<bool, LeadflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM lead_notes WHERE lead_id = ?1", params![id])?;
            let deleted = tx.execute("DELETE FROM leads WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// List leads matching `query`.
pub async fn query_leads(db: &Database, query: &LeadQuery) -> Result<Vec<Lead>, LeadflowError> {
    let (sql, values) = build_select(query);
    db.connection()
        .call(move |conn| -> Result<Vec<Lead>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values.iter()), lead_from_row)?;
            let mut leads = Vec::new();
            for row in rows {
                leads.push(row?);
            }
            Ok(leads)
        })
        .await
        .map_err(map_tr_err)
}

/// Translate a [`LeadQuery`] into SQL plus positional parameters.
fn build_select(query: &LeadQuery) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(status) = &query.status {
        values.push(Value::Text(status.clone()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(campaign) = &query.campaign {
        values.push(Value::Text(campaign.clone()));
        clauses.push(format!("campaign = ?{}", values.len()));
    }
    if let Some(owner) = &query.assigned_to {
        values.push(Value::Text(owner.clone()));
        clauses.push(format!("assigned_to = ?{}", values.len()));
    }
    if let Some(before) = &query.callback_due_before {
        values.push(Value::Text(format_ts(before)));
        clauses.push(format!(
            "callback_at IS NOT NULL AND callback_at <= ?{}",
            values.len()
        ));
    }
    if let Some(after) = &query.callback_due_after {
        values.push(Value::Text(format_ts(after)));
        clauses.push(format!(
            "callback_at IS NOT NULL AND callback_at >= ?{}",
            values.len()
        ));
    }
    if let Some((at, id)) = &query.after_callback_key {
        values.push(Value::Text(format_ts(at)));
        let at_param = values.len();
        values.push(Value::Text(id.to_string()));
        let id_param = values.len();
        clauses.push(format!(
            "callback_at IS NOT NULL AND (callback_at > ?{at_param} \
             OR (callback_at = ?{at_param} AND id > ?{id_param}))"
        ));
    }

    let mut sql = format!("SELECT {LEAD_COLUMNS} FROM leads");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(match query.order {
        LeadOrder::CallbackAtAsc => " ORDER BY callback_at IS NULL, callback_at ASC, id ASC",
        LeadOrder::CreatedAtDesc => " ORDER BY created_at DESC, id ASC",
    });
    if let Some(limit) = query.limit {
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
    }

    (sql, values)
}
