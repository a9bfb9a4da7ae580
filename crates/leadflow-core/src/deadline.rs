// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-supplied deadlines for store calls.

use std::future::Future;
use std::time::Duration;

use crate::error::LeadflowError;

/// Run a store call under a deadline.
///
/// An elapsed deadline is reported as [`LeadflowError::Timeout`] so callers
/// treat it exactly like any other store failure.
pub async fn with_deadline<T, F>(duration: Duration, call: F) -> Result<T, LeadflowError>
where
    F: Future<Output = Result<T, LeadflowError>>,
{
    match tokio::time::timeout(duration, call).await {
        Ok(result) => result,
        Err(_) => Err(LeadflowError::Timeout { duration }),
    }
}
