// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands: campaigns, lead, transition, dnc.

use std::sync::Arc;

use leadflow_config::model::LeadflowConfig;
use leadflow_core::{CALLBACK_STATUS, Clock, Lead, LeadId, LeadStore, LeadflowError, SystemClock};
use leadflow_storage::{SqliteStorage, dedup_retention};
use leadflow_workflow::{
    CampaignRegistry, DncError, DncMigration, DncOutcome, RegistryError, StatusBucket,
    TransitionCoordinator, TransitionError, TransitionPayload,
};

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] LeadflowError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Dnc(#[from] DncError),
    #[error("lead {0} not found")]
    LeadNotFound(String),
    #[error("campaign {campaign} has no status `{status}`")]
    UnknownStatus { campaign: String, status: String },
    #[error(
        "a new lead cannot start in `Callback`; add it, then run \
         `leadflow transition <id> Callback --callback-at <time>`"
    )]
    CallbackAtIntake,
}

/// Open the configured database and run migrations.
pub async fn open_storage(config: &LeadflowConfig) -> Result<Arc<SqliteStorage>, LeadflowError> {
    let storage = SqliteStorage::new(config.storage.clone())
        .with_dedup_retention(dedup_retention(&config.alerts));
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

pub fn list_campaigns(config: &LeadflowConfig) -> Result<(), CommandError> {
    let registry = CampaignRegistry::from_config(config)?;
    print!("{}", render_campaigns(&registry));
    Ok(())
}

/// Text listing of every campaign, one status per line.
pub fn render_campaigns(registry: &CampaignRegistry) -> String {
    let mut out = String::new();
    match registry.version() {
        Some(version) => out.push_str(&format!("built-in campaign set v{version}\n")),
        None => out.push_str("campaigns from configuration\n"),
    }
    for campaign in registry.campaigns() {
        out.push_str(&format!("\n{}\n", campaign.key()));
        for status in campaign.statuses() {
            let bucket = match campaign.bucket(status) {
                StatusBucket::Other => String::new(),
                bucket => format!(" [{bucket}]"),
            };
            let trigger = match campaign.trigger_for(status) {
                leadflow_core::Trigger::None => String::new(),
                trigger => format!(" -> {trigger}"),
            };
            out.push_str(&format!("  {status}{bucket}{trigger}\n"));
        }
    }
    out
}

pub async fn add_lead(
    config: &LeadflowConfig,
    campaign: &str,
    status: &str,
    name: &str,
    phone: &str,
    owner: Option<String>,
) -> Result<(), CommandError> {
    let registry = CampaignRegistry::from_config(config)?;
    if !registry.get(campaign)?.has_status(status) {
        return Err(CommandError::UnknownStatus {
            campaign: campaign.to_string(),
            status: status.to_string(),
        });
    }
    // Intake has no callback time to attach.
    if status == CALLBACK_STATUS {
        return Err(CommandError::CallbackAtIntake);
    }

    let storage = open_storage(config).await?;
    let mut lead = Lead::new(campaign, status, name, phone, SystemClock.now());
    lead.assigned_to = owner;
    storage.insert_lead(&lead).await?;
    println!("{}", lead.id);
    storage.close().await?;
    Ok(())
}

pub async fn show_lead(config: &LeadflowConfig, lead_id: &str) -> Result<(), CommandError> {
    let storage = open_storage(config).await?;
    let id = LeadId::from(lead_id);
    let lead = storage
        .get_lead(&id)
        .await?
        .ok_or_else(|| CommandError::LeadNotFound(lead_id.to_string()))?;
    print!("{}", describe_lead(&lead));
    for note in storage.recent_notes(&id, 5).await? {
        println!(
            "  note {} {}: {}",
            note.created_at.format("%Y-%m-%d %H:%M"),
            note.author,
            note.body
        );
    }
    storage.close().await?;
    Ok(())
}

fn describe_lead(lead: &Lead) -> String {
    let mut out = format!(
        "{} {} ({})\n  campaign: {}\n  status:   {}\n",
        lead.id, lead.full_name, lead.phone, lead.campaign, lead.status
    );
    if let Some(owner) = &lead.assigned_to {
        out.push_str(&format!("  owner:    {owner}\n"));
    }
    if let Some(at) = lead.callback_at {
        out.push_str(&format!("  callback: {}\n", at.to_rfc3339()));
    }
    if let Some(note) = &lead.callback_note {
        out.push_str(&format!("  callback note: {note}\n"));
    }
    if let Some(sent) = &lead.sent_to {
        out.push_str(&format!(
            "  sent to:  {} by {}\n",
            sent.client_name, sent.staff_name
        ));
    }
    if let Some(owner) = &lead.prospect_owner {
        out.push_str(&format!("  prospect: {owner}\n"));
    }
    out
}

pub async fn transition(
    config: &LeadflowConfig,
    lead_id: &str,
    status: &str,
    payload: TransitionPayload,
) -> Result<(), CommandError> {
    let registry = Arc::new(CampaignRegistry::from_config(config)?);
    let storage = open_storage(config).await?;
    let coordinator =
        TransitionCoordinator::new(storage.clone(), registry, Arc::new(SystemClock), &config.workflow);

    let lead = coordinator
        .transition_by_id(&LeadId::from(lead_id), status, payload)
        .await?;
    print!("{}", describe_lead(&lead));
    storage.close().await?;
    Ok(())
}

pub async fn dnc(
    config: &LeadflowConfig,
    lead_id: &str,
    reason: &str,
    performed_by: &str,
    retry_delete: bool,
) -> Result<(), CommandError> {
    let storage = open_storage(config).await?;
    let migration = DncMigration::new(
        storage.clone(),
        Arc::new(SystemClock),
        config.workflow.store_timeout(),
    );
    let id = LeadId::from(lead_id);

    let outcome = if retry_delete {
        migration.retry_delete(&id).await?
    } else {
        let lead = storage
            .get_lead(&id)
            .await?
            .ok_or_else(|| CommandError::LeadNotFound(lead_id.to_string()))?;
        migration.migrate(&lead, reason, performed_by).await?
    };

    println!(
        "{lead_id}: {}",
        match outcome {
            DncOutcome::Migrated => "moved to do-not-call backlog",
            DncOutcome::AlreadyBacklogged => "phone already backlogged, lead removed",
            DncOutcome::AlreadyRemoved => "lead was already removed",
        }
    );
    storage.close().await?;
    Ok(())
}
