// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alert dedup store trait.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::DedupKey;

/// Durable record of due events that have already been alerted.
///
/// Several schedulers may share one store, so [`try_record`](Self::try_record)
/// must check and record in a single atomic step.
#[async_trait]
pub trait AlertDedupStore: PluginAdapter {
    /// Record `key` if absent.
    ///
    /// Returns `true` if the key was newly recorded, `false` if it was
    /// already present. Implementations drop their oldest records once the
    /// configured retention cap is exceeded.
    async fn try_record(&self, key: &DedupKey) -> Result<bool, LeadflowError>;

    /// Returns `true` if `key` has been recorded and not yet pruned.
    async fn contains(&self, key: &DedupKey) -> Result<bool, LeadflowError>;

    /// Number of retained records.
    async fn len(&self) -> Result<usize, LeadflowError>;
}
