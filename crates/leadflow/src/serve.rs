// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow serve` command implementation.
//!
//! Opens SQLite storage, builds the campaign registry, and runs one callback
//! alert scheduler per configured scope until a shutdown signal arrives.
//! Alerts go to the log and to a broadcast channel that prints them to stdout.

use std::sync::Arc;

use leadflow_alerts::{
    AlertSchedulerConfig, BroadcastSink, CallbackAlertScheduler, FanoutSink, TracingSink,
    scopes_from_config,
};
use leadflow_config::model::LeadflowConfig;
use leadflow_core::{LeadflowError, NotificationSink, PluginAdapter, SystemClock};
use leadflow_workflow::CampaignRegistry;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::commands::open_storage;
use crate::shutdown;

const BROADCAST_CAPACITY: usize = 64;

/// Runs the `leadflow serve` command.
pub async fn run_serve(config: LeadflowConfig) -> Result<(), LeadflowError> {
    init_tracing(&config.app.log_level);

    info!(name = %config.app.name, "starting leadflow serve");

    // Fail fast on bad campaign definitions before touching storage.
    let registry = CampaignRegistry::from_config(&config)
        .map_err(|e| LeadflowError::Config(e.to_string()))?;
    info!(
        campaigns = registry.len(),
        builtin = registry.version().is_some(),
        "campaign registry loaded"
    );

    let storage = open_storage(&config).await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let cancel = shutdown::install_signal_handler();

    if !config.alerts.enabled {
        warn!("alerts.enabled = false, no schedulers started");
        cancel.cancelled().await;
        storage.shutdown().await?;
        return Ok(());
    }

    let broadcast = Arc::new(BroadcastSink::new(BROADCAST_CAPACITY));
    let sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(TracingSink), broadcast.clone()];
    let sink: Arc<dyn NotificationSink> = Arc::new(FanoutSink::new(sinks));

    let mut tasks = JoinSet::new();
    tasks.spawn(print_alerts(broadcast, cancel.clone()));

    for scope in scopes_from_config(&config.alerts) {
        let scheduler = CallbackAlertScheduler::new(
            AlertSchedulerConfig::from_config(&config.alerts, scope),
            storage.clone(),
            storage.clone(),
            sink.clone(),
            Arc::new(SystemClock),
        );
        let cancel = cancel.clone();
        tasks.spawn(async move { scheduler.run(cancel).await });
    }

    info!(tasks = tasks.len(), "leadflow serve running");

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "scheduler task failed");
            cancel.cancel();
        }
    }

    storage.shutdown().await?;
    info!("leadflow serve stopped");
    Ok(())
}

/// Print broadcast alerts to stdout until cancelled.
async fn print_alerts(broadcast: Arc<BroadcastSink>, cancel: CancellationToken) {
    let mut rx = broadcast.subscribe();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Ok(alert) => println!("{}\n{}\n", alert.title, alert.message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "alert printer lagged behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

/// Initialize the tracing subscriber with the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
