// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Leadflow lead workflow.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for leads,
//! lead notes, the do-not-call backlog, and the callback alert dedup log.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod rows;

pub use adapter::{SqliteStorage, dedup_retention};
pub use database::Database;
