// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the workflow core calls.
//!
//! Stores and sinks extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility. [`Clock`] is a plain
//! synchronous trait so tests can drive time by hand.

pub mod adapter;
pub mod clock;
pub mod dedup;
pub mod lead_store;
pub mod notify;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use dedup::AlertDedupStore;
pub use lead_store::LeadStore;
pub use notify::NotificationSink;
