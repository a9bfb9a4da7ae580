// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign registry: the immutable table of campaign definitions.
//!
//! Built once at startup, either from the compiled-in campaign set or from
//! `[[campaigns]]` configuration, and shared by reference afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};

use leadflow_config::model::{CampaignSpecConfig, LeadflowConfig};
use leadflow_config::validation::campaign_problems;
use leadflow_core::Trigger;
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::RegistryError;

/// Version of the compiled-in campaign set. Bumped whenever a builtin
/// vocabulary, partition, or trigger changes.
pub const CAMPAIGN_SET_VERSION: u32 = 1;

/// Which view a status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StatusBucket {
    Active,
    Archive,
    /// In the vocabulary but in neither partition.
    Other,
}

/// One campaign: status vocabulary, active/archive partition, and triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    key: String,
    statuses: Vec<String>,
    active: HashSet<String>,
    archive: HashSet<String>,
    triggers: HashMap<String, Trigger>,
}

impl Campaign {
    /// Build a campaign, rejecting definitions that break the partition or
    /// trigger rules.
    pub fn from_spec(spec: &CampaignSpecConfig) -> Result<Self, RegistryError> {
        let problems = campaign_problems(spec);
        if !problems.is_empty() {
            return Err(RegistryError::Invalid {
                campaign: spec.key.clone(),
                reason: problems.join("; "),
            });
        }
        Ok(Self::from_valid_spec(spec))
    }

    fn from_valid_spec(spec: &CampaignSpecConfig) -> Self {
        Self {
            key: spec.key.clone(),
            statuses: spec.statuses.clone(),
            active: spec.active.iter().cloned().collect(),
            archive: spec.archive.iter().cloned().collect(),
            triggers: spec
                .triggers
                .iter()
                .map(|(status, trigger)| (status.clone(), *trigger))
                .collect(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Status vocabulary in display order.
    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.statuses.iter().any(|s| s == status)
    }

    /// Trigger attached to `status`; [`Trigger::None`] when unmapped.
    pub fn trigger_for(&self, status: &str) -> Trigger {
        self.triggers.get(status).copied().unwrap_or_default()
    }

    pub fn bucket(&self, status: &str) -> StatusBucket {
        if self.active.contains(status) {
            StatusBucket::Active
        } else if self.archive.contains(status) {
            StatusBucket::Archive
        } else {
            StatusBucket::Other
        }
    }

    /// Active statuses in vocabulary order.
    pub fn active_statuses(&self) -> impl Iterator<Item = &str> {
        self.statuses_in(StatusBucket::Active)
    }

    /// Archived statuses in vocabulary order.
    pub fn archive_statuses(&self) -> impl Iterator<Item = &str> {
        self.statuses_in(StatusBucket::Archive)
    }

    fn statuses_in(&self, bucket: StatusBucket) -> impl Iterator<Item = &str> {
        self.statuses
            .iter()
            .map(String::as_str)
            .filter(move |s| self.bucket(s) == bucket)
    }
}

/// Lookup table from campaign key to [`Campaign`].
#[derive(Debug, Clone)]
pub struct CampaignRegistry {
    campaigns: BTreeMap<String, Campaign>,
    version: Option<u32>,
}

impl CampaignRegistry {
    /// The compiled-in campaign set.
    pub fn builtin() -> Self {
        let campaigns = builtin_specs()
            .iter()
            .map(|spec| (spec.key.clone(), Campaign::from_valid_spec(spec)))
            .collect();
        Self {
            campaigns,
            version: Some(CAMPAIGN_SET_VERSION),
        }
    }

    /// Build a registry from explicit campaign definitions.
    pub fn from_specs(specs: &[CampaignSpecConfig]) -> Result<Self, RegistryError> {
        let mut campaigns = BTreeMap::new();
        for spec in specs {
            let campaign = Campaign::from_spec(spec)?;
            if campaigns.insert(spec.key.clone(), campaign).is_some() {
                return Err(RegistryError::Invalid {
                    campaign: spec.key.clone(),
                    reason: "campaign key defined twice".to_string(),
                });
            }
        }
        Ok(Self {
            campaigns,
            version: None,
        })
    }

    /// Configured `[[campaigns]]` if any, otherwise the builtin set.
    pub fn from_config(config: &LeadflowConfig) -> Result<Self, RegistryError> {
        if config.campaigns.is_empty() {
            debug!(version = CAMPAIGN_SET_VERSION, "using builtin campaign set");
            Ok(Self::builtin())
        } else {
            debug!(count = config.campaigns.len(), "using configured campaigns");
            Self::from_specs(&config.campaigns)
        }
    }

    /// Look up a campaign. Unknown keys are an error, never a default.
    pub fn get(&self, key: &str) -> Result<&Campaign, RegistryError> {
        self.campaigns
            .get(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Campaign keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.campaigns.keys().map(String::as_str)
    }

    pub fn campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.values()
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }

    /// Builtin set version, or `None` for configured campaigns.
    pub fn version(&self) -> Option<u32> {
        self.version
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_spec(
    key: &str,
    statuses: &[&str],
    active: &[&str],
    archive: &[&str],
    triggers: &[(&str, Trigger)],
) -> CampaignSpecConfig {
    CampaignSpecConfig {
        key: key.to_string(),
        statuses: owned(statuses),
        active: owned(active),
        archive: owned(archive),
        triggers: triggers
            .iter()
            .map(|(status, trigger)| (status.to_string(), *trigger))
            .collect(),
    }
}

/// Definitions behind [`CampaignRegistry::builtin`].
pub fn builtin_specs() -> Vec<CampaignSpecConfig> {
    vec![
        builtin_spec(
            "ECO4",
            &[
                "New Lead",
                "Callback",
                "Contacted",
                "No Answer",
                "Prospect",
                "Survey Booked",
                "Sent To Client",
                "Installed",
                "Not Interested",
                "Not Eligible",
            ],
            &[
                "New Lead",
                "Callback",
                "Contacted",
                "No Answer",
                "Prospect",
                "Survey Booked",
            ],
            &["Sent To Client", "Installed", "Not Interested", "Not Eligible"],
            &[
                ("Callback", Trigger::RequireCallback),
                ("Prospect", Trigger::RequireProspectClient),
                ("Sent To Client", Trigger::RequireSentToClient),
            ],
        ),
        builtin_spec(
            "SOLAR",
            &[
                "New Lead",
                "Callback",
                "Contacted",
                "No Answer",
                "Quote Sent",
                "Prospect",
                "Sent To Client",
                "Installed",
                "Not Interested",
            ],
            &[
                "New Lead",
                "Callback",
                "Contacted",
                "No Answer",
                "Quote Sent",
                "Prospect",
            ],
            &["Sent To Client", "Installed", "Not Interested"],
            &[
                ("Callback", Trigger::RequireCallback),
                ("Prospect", Trigger::RequireProspectClient),
                ("Sent To Client", Trigger::RequireSentToClient),
            ],
        ),
        builtin_spec(
            "HOME_INSULATION",
            &[
                "New Lead",
                "Callback",
                "Contacted",
                "Survey Booked",
                "Prospect",
                "Sent To Client",
                "Not Interested",
                "Not Eligible",
            ],
            &["New Lead", "Callback", "Contacted", "Survey Booked", "Prospect"],
            &["Sent To Client", "Not Interested", "Not Eligible"],
            &[
                ("Callback", Trigger::RequireCallback),
                ("Prospect", Trigger::RequireProspectClient),
                ("Sent To Client", Trigger::RequireSentToClient),
            ],
        ),
    ]
}
