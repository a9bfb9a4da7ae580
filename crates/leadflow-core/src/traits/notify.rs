// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sink trait for delivering callback alerts.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CallbackAlert;

/// Destination for human-visible alerts.
///
/// Delivery is fire-and-forget from the scheduler's point of view: a failed
/// emit is logged and never retried.
#[async_trait]
pub trait NotificationSink: PluginAdapter {
    async fn emit(&self, alert: &CallbackAlert) -> Result<(), LeadflowError>;
}
