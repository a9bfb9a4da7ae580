// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sink that captures alerts for assertion in tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadflow_core::{
    AdapterType, CallbackAlert, HealthStatus, LeadflowError, NotificationSink, PluginAdapter,
};

/// Captures every emitted alert. `set_fail(true)` makes `emit` return an
/// error without recording.
#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<CallbackAlert>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All alerts emitted so far, oldest first.
    pub async fn alerts(&self) -> Vec<CallbackAlert> {
        self.alerts.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.alerts.lock().await.clear();
    }
}

#[async_trait]
impl PluginAdapter for RecordingSink {
    fn name(&self) -> &str {
        "recording-sink"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, alert: &CallbackAlert) -> Result<(), LeadflowError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LeadflowError::Internal("recording sink set to fail".into()));
        }
        self.alerts.lock().await.push(alert.clone());
        Ok(())
    }
}
