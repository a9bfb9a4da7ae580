// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead store trait for lead, note, and do-not-call backlog persistence.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{DncBacklogEntry, Lead, LeadId, LeadQuery, LeadUpdate, Note};

/// Generic record store for leads and their satellite tables.
///
/// The workflow core does not care whether this is SQL, a document store, or
/// memory. Concurrent updates to the same lead are last-write-wins.
#[async_trait]
pub trait LeadStore: PluginAdapter {
    // --- Lead operations ---

    /// Insert a new lead (intake flows).
    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadflowError>;

    /// Fetch a lead by id.
    async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>, LeadflowError>;

    /// Apply a field delta to a stored lead.
    ///
    /// Returns [`LeadflowError::NotFound`] if the lead does not exist.
    async fn update_lead(&self, id: &LeadId, update: &LeadUpdate) -> Result<(), LeadflowError>;

    /// Delete a lead and its notes. Returns `false` if it did not exist.
    async fn delete_lead(&self, id: &LeadId) -> Result<bool, LeadflowError>;

    /// Filtered, ordered, limited lead listing.
    async fn query_leads(&self, query: &LeadQuery) -> Result<Vec<Lead>, LeadflowError>;

    // --- Note operations ---

    /// Attach an immutable note to a lead.
    async fn add_note(&self, note: &Note) -> Result<(), LeadflowError>;

    /// The most recent notes for a lead, newest first.
    async fn recent_notes(&self, lead_id: &LeadId, limit: usize)
    -> Result<Vec<Note>, LeadflowError>;

    // --- Do-not-call backlog ---

    /// Insert a backlog entry.
    ///
    /// Returns [`LeadflowError::Conflict`] if the phone number is already
    /// backlogged.
    async fn insert_backlog(&self, entry: &DncBacklogEntry) -> Result<(), LeadflowError>;

    /// Look up a backlog entry by phone number.
    async fn get_backlog_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<DncBacklogEntry>, LeadflowError>;
}
