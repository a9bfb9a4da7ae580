// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadflow integration tests.
//!
//! Provides in-memory adapters with failure injection and a test harness
//! for fast, deterministic tests without a database.
//!
//! # Components
//!
//! - [`MemoryLeadStore`] - Lead store with read/update/delete/backlog failure switches
//! - [`MemoryDedupStore`] - Alert dedup store with a retention cap and failure switch
//! - [`RecordingSink`] - Notification sink that captures alerts for assertion
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`TestHarness`] - Registry, coordinator, DNC migration, and scheduler wired together

pub mod clock;
pub mod harness;
pub mod memory_store;
pub mod recording_sink;

pub use clock::ManualClock;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::{MemoryDedupStore, MemoryLeadStore};
pub use recording_sink::RecordingSink;
