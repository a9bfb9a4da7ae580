// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadflow lead workflow.
//!
//! This crate provides the domain types, error types, and the narrow adapter
//! traits (lead store, alert dedup store, notification sink, clock) that the
//! workflow and alerting crates call through. Storage backends and sinks
//! implement the traits defined here.

pub mod deadline;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use deadline::with_deadline;
pub use error::LeadflowError;
pub use types::{
    AdapterType, AlertScope, CALLBACK_STATUS, CallbackAlert, CallbackSchedule, DedupKey,
    DedupRetention, DncBacklogEntry, FieldChange, HealthStatus, Lead, LeadId, LeadOrder,
    LeadQuery, LeadUpdate, Note, SentToAttribution, Trigger, normalize_timestamp,
    saturating_delta,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    AlertDedupStore, Clock, LeadStore, NotificationSink, PluginAdapter, SystemClock,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leadflow_error_has_all_variants() {
        let _config = LeadflowError::Config("test".into());
        let _storage = LeadflowError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _conflict = LeadflowError::Conflict {
            entity: "dnc_backlog".into(),
            key: "0700".into(),
        };
        let _not_found = LeadflowError::NotFound {
            entity: "lead".into(),
            id: "x".into(),
        };
        let _adapter = LeadflowError::AdapterNotFound {
            adapter_type: "LeadStore".into(),
            name: "test".into(),
        };
        let _health = LeadflowError::HealthCheckFailed {
            name: "test".into(),
            source: Box::new(std::io::Error::other("test")),
        };
        let _timeout = LeadflowError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        let _internal = LeadflowError::Internal("test".into());
    }

    #[test]
    fn conflict_is_distinguishable() {
        let conflict = LeadflowError::Conflict {
            entity: "dnc_backlog".into(),
            key: "0700".into(),
        };
        assert!(conflict.is_conflict());
        assert!(!LeadflowError::storage("disk full").is_conflict());
        assert_eq!(conflict.to_string(), "dnc_backlog already exists: 0700");
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::LeadStore,
            AdapterType::AlertDedup,
            AdapterType::Notification,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_lead_store<T: LeadStore>() {}
        fn _assert_dedup_store<T: AlertDedupStore>() {}
        fn _assert_sink<T: NotificationSink>() {}
        fn _assert_clock<T: Clock>() {}
    }
}
