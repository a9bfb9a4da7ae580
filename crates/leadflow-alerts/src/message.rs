// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alert text for a due callback.

use chrono::{DateTime, Utc};
use leadflow_core::{CallbackAlert, Lead, Note};

/// Longest note excerpt carried in an alert, in characters.
const NOTE_EXCERPT_CHARS: usize = 160;

/// Build the alert for `lead`, whose callback is at `callback_at`.
///
/// `latest_note` is the most recent note on the lead, if one could be read.
pub fn compose_alert(
    lead: &Lead,
    callback_at: DateTime<Utc>,
    latest_note: Option<&Note>,
    now: DateTime<Utc>,
) -> CallbackAlert {
    let title = if callback_at < now {
        format!("Callback overdue: {}", lead.full_name)
    } else {
        format!("Callback due: {}", lead.full_name)
    };

    let mut lines = vec![
        format!("{} ({})", lead.full_name, lead.phone),
        format!("Campaign: {}", lead.campaign),
        format!(
            "Due: {} ({})",
            callback_at.format("%Y-%m-%d %H:%M UTC"),
            relative(callback_at, now)
        ),
    ];
    if let Some(note) = &lead.callback_note {
        lines.push(format!("Callback note: {note}"));
    }
    if let Some(note) = latest_note {
        lines.push(format!(
            "Latest note from {}: {}",
            note.author,
            excerpt(&note.body)
        ));
    }

    CallbackAlert {
        lead_id: lead.id.clone(),
        callback_at,
        title,
        message: lines.join("\n"),
    }
}

fn relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (at - now).num_minutes();
    match minutes {
        0 => "now".to_string(),
        m if m > 0 && m < 90 => format!("in {m} min"),
        m if m > 0 => format!("in {} h", m / 60),
        m if m > -90 => format!("{} min ago", -m),
        m => format!("{} h ago", -m / 60),
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(NOTE_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
