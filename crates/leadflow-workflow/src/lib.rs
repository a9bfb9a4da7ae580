// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign status workflow for Leadflow.
//!
//! The [`CampaignRegistry`] holds the immutable campaign definitions. The
//! [`TransitionCoordinator`] validates and persists status changes against
//! them, and [`DncMigration`] moves leads into the do-not-call backlog.

pub mod coordinator;
pub mod dnc;
pub mod error;
pub mod registry;

pub use coordinator::{TransitionCoordinator, TransitionPayload};
pub use dnc::{DncMigration, DncOutcome};
pub use error::{DncError, RegistryError, TransitionError};
pub use registry::{CAMPAIGN_SET_VERSION, Campaign, CampaignRegistry, StatusBucket};
