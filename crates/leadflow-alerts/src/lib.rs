// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback due-alert scheduling for Leadflow.
//!
//! A [`CallbackAlertScheduler`] polls the lead store for callbacks coming due,
//! records each due event in the shared dedup store, and emits at most one
//! alert per tick through a [`NotificationSink`](leadflow_core::NotificationSink).

pub mod message;
pub mod scheduler;
pub mod sink;

pub use message::compose_alert;
pub use scheduler::{AlertSchedulerConfig, CallbackAlertScheduler, TickOutcome, scopes_from_config};
pub use sink::{BroadcastSink, FanoutSink, TracingSink};
