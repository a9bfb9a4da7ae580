// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory lead store and alert dedup store with failure injection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use leadflow_config::model::AlertsConfig;
use tokio::sync::Mutex;

use leadflow_core::{
    AdapterType, AlertDedupStore, DedupKey, DedupRetention, DncBacklogEntry, HealthStatus, Lead, LeadId,
    LeadOrder, LeadQuery, LeadStore, LeadUpdate, LeadflowError, Note, PluginAdapter,
};

fn injected(op: &str) -> LeadflowError {
    LeadflowError::storage(format!("injected {op} failure"))
}

/// Lead store backed by hash maps.
///
/// Each `set_fail_*` switch makes the matching operations return a storage
/// error. `set_delay` stalls every trait call, for deadline tests.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: Mutex<HashMap<LeadId, Lead>>,
    notes: Mutex<Vec<Note>>,
    backlog: Mutex<Vec<DncBacklogEntry>>,
    fail_reads: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    fail_backlog: AtomicBool,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    backlog_calls: AtomicUsize,
    delay: StdMutex<Option<Duration>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a lead directly, bypassing failure switches.
    pub async fn seed(&self, lead: Lead) {
        self.leads.lock().await.insert(lead.id.clone(), lead);
    }

    pub async fn lead(&self, id: &LeadId) -> Option<Lead> {
        self.leads.lock().await.get(id).cloned()
    }

    pub async fn lead_count(&self) -> usize {
        self.leads.lock().await.len()
    }

    pub async fn backlog(&self) -> Vec<DncBacklogEntry> {
        self.backlog.lock().await.clone()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_backlog(&self, fail: bool) {
        self.fail_backlog.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Number of `update_lead` calls, including failed ones.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_lead` calls, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of `insert_backlog` calls, including failed ones.
    pub fn backlog_calls(&self) -> usize {
        self.backlog_calls.load(Ordering::SeqCst)
    }

    async fn stall(&self) {
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, switch: &AtomicBool, op: &str) -> Result<(), LeadflowError> {
        if switch.load(Ordering::SeqCst) {
            Err(injected(op))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryLeadStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LeadStore
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadflowError> {
        self.stall().await;
        lead.ensure_consistent_callback()?;
        let mut leads = self.leads.lock().await;
        if leads.contains_key(&lead.id) {
            return Err(LeadflowError::Conflict {
                entity: "lead".into(),
                key: lead.id.to_string(),
            });
        }
        leads.insert(lead.id.clone(), lead.clone());
        Ok(())
    }

    async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>, LeadflowError> {
        self.stall().await;
        self.check(&self.fail_reads, "read")?;
        Ok(self.leads.lock().await.get(id).cloned())
    }

    async fn update_lead(&self, id: &LeadId, update: &LeadUpdate) -> Result<(), LeadflowError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        self.check(&self.fail_updates, "update")?;
        let mut leads = self.leads.lock().await;
        let current = leads.get(id).ok_or_else(|| LeadflowError::NotFound {
            entity: "lead".into(),
            id: id.to_string(),
        })?;
        let next = update.apply_to(current);
        leads.insert(id.clone(), next);
        Ok(())
    }

    async fn delete_lead(&self, id: &LeadId) -> Result<bool, LeadflowError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        self.check(&self.fail_deletes, "delete")?;
        let removed = self.leads.lock().await.remove(id).is_some();
        self.notes.lock().await.retain(|n| &n.lead_id != id);
        Ok(removed)
    }

    async fn query_leads(&self, query: &LeadQuery) -> Result<Vec<Lead>, LeadflowError> {
        self.stall().await;
        self.check(&self.fail_reads, "read")?;
        let mut found: Vec<Lead> = self
            .leads
            .lock()
            .await
            .values()
            .filter(|lead| query.matches(lead))
            .cloned()
            .collect();
        match query.order {
            LeadOrder::CallbackAtAsc => found.sort_by(|a, b| {
                (a.callback_at.is_none(), a.callback_at, &a.id)
                    .cmp(&(b.callback_at.is_none(), b.callback_at, &b.id))
            }),
            LeadOrder::CreatedAtDesc => found.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
        }
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn add_note(&self, note: &Note) -> Result<(), LeadflowError> {
        self.stall().await;
        self.notes.lock().await.push(note.clone());
        Ok(())
    }

    async fn recent_notes(
        &self,
        lead_id: &LeadId,
        limit: usize,
    ) -> Result<Vec<Note>, LeadflowError> {
        self.stall().await;
        self.check(&self.fail_reads, "read")?;
        let notes = self.notes.lock().await;
        let mut found: Vec<Note> = notes
            .iter()
            .rev()
            .filter(|n| &n.lead_id == lead_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order (newest first) within one timestamp.
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit);
        Ok(found)
    }

    async fn insert_backlog(&self, entry: &DncBacklogEntry) -> Result<(), LeadflowError> {
        self.backlog_calls.fetch_add(1, Ordering::SeqCst);
        self.stall().await;
        self.check(&self.fail_backlog, "backlog insert")?;
        let mut backlog = self.backlog.lock().await;
        if backlog.iter().any(|e| e.phone == entry.phone) {
            return Err(LeadflowError::Conflict {
                entity: "dnc_backlog".into(),
                key: entry.phone.clone(),
            });
        }
        backlog.push(entry.clone());
        Ok(())
    }

    async fn get_backlog_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<DncBacklogEntry>, LeadflowError> {
        self.stall().await;
        self.check(&self.fail_reads, "read")?;
        Ok(self
            .backlog
            .lock()
            .await
            .iter()
            .find(|e| e.phone == phone)
            .cloned())
    }
}

/// Alert dedup store with a FIFO retention cap.
pub struct MemoryDedupStore {
    inner: Mutex<DedupState>,
    retention: DedupRetention,
    fail_records: AtomicBool,
}

#[derive(Default)]
struct DedupState {
    order: VecDeque<DedupKey>,
    keys: HashSet<DedupKey>,
}

impl Default for MemoryDedupStore {
    fn default() -> Self {
        Self::new(leadflow_storage::dedup_retention(&AlertsConfig::default()))
    }
}

impl MemoryDedupStore {
    pub fn new(retention: DedupRetention) -> Self {
        Self {
            inner: Mutex::new(DedupState::default()),
            retention,
            fail_records: AtomicBool::new(false),
        }
    }

    pub fn set_fail_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MemoryDedupStore {
    fn name(&self) -> &str {
        "memory-dedup"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::AlertDedup
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl AlertDedupStore for MemoryDedupStore {
    async fn try_record(&self, key: &DedupKey) -> Result<bool, LeadflowError> {
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(injected("dedup record"));
        }
        let mut state = self.inner.lock().await;
        if !state.keys.insert(key.clone()) {
            return Ok(false);
        }
        state.order.push_back(key.clone());

        let prune_before = self.retention.prune_before(key);
        let mut in_namespace = state
            .order
            .iter()
            .filter(|k| k.namespace == key.namespace)
            .count();
        let mut i = 0;
        while in_namespace > self.retention.per_namespace && i < state.order.len() {
            let prunable = state.order[i].namespace == key.namespace
                && state.order[i].callback_at < prune_before;
            if !prunable {
                i += 1;
                continue;
            }
            if let Some(oldest) = state.order.remove(i) {
                state.keys.remove(&oldest);
            }
            in_namespace -= 1;
        }
        Ok(true)
    }

    async fn contains(&self, key: &DedupKey) -> Result<bool, LeadflowError> {
        Ok(self.inner.lock().await.keys.contains(key))
    }

    async fn len(&self) -> Result<usize, LeadflowError> {
        Ok(self.inner.lock().await.order.len())
    }
}
