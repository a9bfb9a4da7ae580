// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sinks for callback alerts.

use std::sync::Arc;

use async_trait::async_trait;
use leadflow_core::{
    AdapterType, CallbackAlert, HealthStatus, LeadflowError, NotificationSink, PluginAdapter,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Writes every alert to the log at `info`.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl PluginAdapter for TracingSink {
    fn name(&self) -> &str {
        "tracing"
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
impl NotificationSink for TracingSink {
    async fn emit(&self, alert: &CallbackAlert) -> Result<(), LeadflowError> {
        info!(
            lead_id = %alert.lead_id,
            callback_at = %alert.callback_at,
            title = %alert.title,
            message = %alert.message,
            "callback alert"
        );
        Ok(())
    }
}

/// Publishes alerts to any number of in-process subscribers.
///
/// With no subscribers the alert is dropped, which is not an error.
pub struct BroadcastSink {
    tx: broadcast::Sender<CallbackAlert>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallbackAlert> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl PluginAdapter for BroadcastSink {
    fn name(&self) -> &str {
        "broadcast"
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
impl NotificationSink for BroadcastSink {
    async fn emit(&self, alert: &CallbackAlert) -> Result<(), LeadflowError> {
        match self.tx.send(alert.clone()) {
            Ok(receivers) => debug!(receivers, lead_id = %alert.lead_id, "alert broadcast"),
            Err(_) => debug!(lead_id = %alert.lead_id, "no alert subscribers"),
        }
        Ok(())
    }
}

/// Delivers each alert to several sinks.
///
/// Succeeds if at least one sink accepted the alert.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl PluginAdapter for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadflowError> {
        for sink in &self.sinks {
            if let HealthStatus::Unhealthy(reason) = sink.health_check().await? {
                return Ok(HealthStatus::Degraded(format!("{}: {reason}", sink.name())));
            }
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadflowError> {
        for sink in &self.sinks {
            sink.shutdown().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn emit(&self, alert: &CallbackAlert) -> Result<(), LeadflowError> {
        let mut last_error = None;
        let mut delivered = 0usize;
        for sink in &self.sinks {
            match sink.emit(alert).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(sink = sink.name(), lead_id = %alert.lead_id, error = %e, "sink rejected alert");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) if delivered == 0 => Err(e),
            _ => Ok(()),
        }
    }
}
