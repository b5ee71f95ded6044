//! What a save or load did, backend by backend

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::{BackendError, Durability};
use crate::document::DocumentType;

/// Why an entry was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Backend cannot be written to
    ReadOnly,
    /// Credential missing or provisioning failed earlier in the session
    Unavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ReadOnly => write!(f, "read-only"),
            SkipReason::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptStatus {
    Accepted,
    Failed(BackendError),
    Skipped(SkipReason),
}

impl AttemptStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptStatus::Accepted => "accepted",
            AttemptStatus::Failed(_) => "failed",
            AttemptStatus::Skipped(_) => "skipped",
        }
    }

    /// Error or skip reason, if any
    pub fn detail(&self) -> Option<String> {
        match self {
            AttemptStatus::Accepted => None,
            AttemptStatus::Failed(e) => Some(e.to_string()),
            AttemptStatus::Skipped(reason) => Some(reason.to_string()),
        }
    }
}

/// One backend's part in a save
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub backend: String,
    pub durability: Durability,
    pub status: AttemptStatus,
}

impl AttemptRecord {
    /// Accepted by a backend that keeps data beyond this process
    pub fn is_durable_success(&self) -> bool {
        self.status == AttemptStatus::Accepted && self.durability == Durability::Durable
    }
}

/// Overall result of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// At least one durable remote accepted the document
    Durable,
    /// Only the local mirror holds the document
    LocalOnly,
}

/// Per-backend account of a save
///
/// The document is always in the local mirror when a report exists; the
/// report says which remotes also have it.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub doc_type: DocumentType,
    pub attempts: Vec<AttemptRecord>,
    pub saved_at: DateTime<Utc>,
}

impl SaveReport {
    pub fn outcome(&self) -> SaveOutcome {
        if self.attempts.iter().any(AttemptRecord::is_durable_success) {
            SaveOutcome::Durable
        } else {
            SaveOutcome::LocalOnly
        }
    }

    /// Names of the durable backends that accepted the document
    pub fn durable_backends(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|a| a.is_durable_success())
            .map(|a| a.backend.as_str())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.attempts
            .iter()
            .filter(|a| matches!(a.status, AttemptStatus::Failed(_)))
    }
}

/// Where a loaded document came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Remote(String),
    Default,
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadSource::Cache => write!(f, "local cache"),
            LoadSource::Remote(name) => write!(f, "{}", name),
            LoadSource::Default => write!(f, "built-in default"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(backend: &str, durability: Durability, status: AttemptStatus) -> AttemptRecord {
        AttemptRecord {
            backend: backend.to_string(),
            durability,
            status,
        }
    }

    fn report(attempts: Vec<AttemptRecord>) -> SaveReport {
        SaveReport {
            doc_type: DocumentType::Skills,
            attempts,
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_outcome_durable_with_one_success() {
        let report = report(vec![
            record(
                "github",
                Durability::Durable,
                AttemptStatus::Failed(BackendError::Unreachable("down".into())),
            ),
            record("jsonbin", Durability::Durable, AttemptStatus::Accepted),
        ]);
        assert_eq!(report.outcome(), SaveOutcome::Durable);
        assert_eq!(report.durable_backends(), vec!["jsonbin"]);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_simulated_acceptance_is_not_durable() {
        let report = report(vec![
            record("firebase", Durability::Simulated, AttemptStatus::Accepted),
            record(
                "pages",
                Durability::Durable,
                AttemptStatus::Skipped(SkipReason::ReadOnly),
            ),
        ]);
        assert_eq!(report.outcome(), SaveOutcome::LocalOnly);
        assert!(report.durable_backends().is_empty());
    }

    #[test]
    fn test_empty_report_is_local_only() {
        assert_eq!(report(Vec::new()).outcome(), SaveOutcome::LocalOnly);
    }

    #[test]
    fn test_status_detail() {
        assert_eq!(AttemptStatus::Accepted.detail(), None);
        assert_eq!(
            AttemptStatus::Skipped(SkipReason::Unavailable).detail(),
            Some("unavailable".to_string())
        );
        assert_eq!(
            AttemptStatus::Failed(BackendError::Rejected {
                status: 401,
                message: "Bad credentials".into()
            })
            .label(),
            "failed"
        );
    }

    #[test]
    fn test_load_source_display() {
        assert_eq!(LoadSource::Cache.to_string(), "local cache");
        assert_eq!(LoadSource::Remote("github".into()).to_string(), "github");
        assert_eq!(LoadSource::Default.to_string(), "built-in default");
    }
}
