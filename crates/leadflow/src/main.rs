// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadflow - lead workflow service.
//!
//! This is the binary entry point: the alerting daemon plus one-shot
//! operator commands over the same SQLite store.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

mod commands;
mod doctor;
mod serve;
mod shutdown;

/// Leadflow - campaign statuses, callback alerts, and do-not-call migration.
#[derive(Parser, Debug)]
#[command(name = "leadflow", version, about, long_about = None)]
struct Cli {
    /// Load this TOML file instead of the XDG/local config hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the callback alert schedulers until SIGINT/SIGTERM.
    Serve,
    /// List campaigns with their statuses, buckets, and triggers.
    Campaigns,
    /// Manage leads.
    Lead {
        #[command(subcommand)]
        action: LeadCommands,
    },
    /// Move a lead to a new status.
    Transition {
        lead_id: String,
        status: String,
        /// Callback time (RFC 3339), required when moving to Callback.
        #[arg(long, value_parser = parse_rfc3339)]
        callback_at: Option<DateTime<Utc>>,
        /// Note stored alongside the callback.
        #[arg(long)]
        note: Option<String>,
        /// Staff member credited with the transition.
        #[arg(long)]
        staff: Option<String>,
        /// Client the lead was sent to.
        #[arg(long)]
        client: Option<String>,
    },
    /// Move a lead into the do-not-call backlog.
    Dnc {
        lead_id: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        by: Option<String>,
        /// Only retry removing a lead whose backlog entry already exists.
        #[arg(long)]
        retry_delete: bool,
    },
    /// Run diagnostic checks.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
enum LeadCommands {
    /// Create a lead.
    Add {
        #[arg(long)]
        campaign: String,
        #[arg(long, default_value = "New Lead")]
        status: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one lead and its latest notes.
    Show { lead_id: String },
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => leadflow_config::load_and_validate_path(path),
        None => leadflow_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            leadflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await.map_err(Into::into),
        Some(Commands::Campaigns) => commands::list_campaigns(&config),
        Some(Commands::Lead { action }) => match action {
            LeadCommands::Add {
                campaign,
                status,
                name,
                phone,
                owner,
            } => commands::add_lead(&config, &campaign, &status, &name, &phone, owner).await,
            LeadCommands::Show { lead_id } => commands::show_lead(&config, &lead_id).await,
        },
        Some(Commands::Transition {
            lead_id,
            status,
            callback_at,
            note,
            staff,
            client,
        }) => {
            let payload = leadflow_workflow::TransitionPayload {
                callback_at,
                callback_note: note,
                staff_name: staff,
                sent_to_client_name: client,
            };
            commands::transition(&config, &lead_id, &status, payload).await
        }
        Some(Commands::Dnc {
            lead_id,
            reason,
            by,
            retry_delete,
        }) => {
            commands::dnc(
                &config,
                &lead_id,
                reason.as_deref().unwrap_or_default(),
                by.as_deref().unwrap_or_default(),
                retry_delete,
            )
            .await
        }
        Some(Commands::Doctor { plain }) => {
            doctor::run_doctor(&config, cli.config.as_deref(), plain).await;
            Ok(())
        }
        None => {
            println!("leadflow: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc answers epoch/stats queries.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn transition_args_parse_callback_time() {
        let cli = Cli::try_parse_from([
            "leadflow",
            "transition",
            "lead-1",
            "Callback",
            "--callback-at",
            "2026-03-02T10:30:00+01:00",
            "--note",
            "after lunch",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Transition {
                callback_at, note, ..
            }) => {
                assert_eq!(
                    callback_at.map(|t| t.to_rfc3339()),
                    Some("2026-03-02T09:30:00+00:00".to_string())
                );
                assert_eq!(note.as_deref(), Some("after lunch"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bad_callback_time_is_rejected() {
        let parsed = Cli::try_parse_from([
            "leadflow",
            "transition",
            "lead-1",
            "Callback",
            "--callback-at",
            "tomorrow",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = leadflow_config::load_and_validate_str("").expect("defaults should validate");
        assert_eq!(config.app.name, "leadflow");
    }
}
