//! Per-record results of synchronisation operations.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Operation that produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Record written to, or archived from, the file tree.
    Export,
    /// Document applied to the identity service.
    Import,
    /// Document compared against the identity service.
    Report,
}

/// Result of processing one record or document.
///
/// For [`ChangeKind::Report`], `success` means "would change on import".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Record key, normally the e-mail address.
    pub key: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure or status detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Operation that produced the outcome.
    pub change: ChangeKind,
    /// Document path involved, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl SyncOutcome {
    /// Successful outcome for `key`.
    pub fn succeeded(key: impl Into<String>, change: ChangeKind, path: &Path) -> Self {
        Self {
            key: key.into(),
            success: true,
            message: None,
            change,
            path: Some(path.to_path_buf()),
        }
    }

    /// Failed outcome for `key`.
    pub fn failed(
        key: impl Into<String>,
        change: ChangeKind,
        path: &Path,
        message: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            success: false,
            message: Some(message.into()),
            change,
            path: Some(path.to_path_buf()),
        }
    }

    /// Attach a status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Totals across a batch of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    /// Outcomes in the batch.
    pub total: usize,
    /// Outcomes with `success` set.
    pub succeeded: usize,
    /// Outcomes without `success` set.
    pub failed: usize,
}

impl OutcomeSummary {
    /// Count outcomes by success.
    pub fn of(outcomes: &[SyncOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarises_batches() {
        let path = Path::new("usync/User/a.config");
        let outcomes = vec![
            SyncOutcome::succeeded("a@example.org", ChangeKind::Import, path),
            SyncOutcome::failed("b@example.org", ChangeKind::Import, path, "boom"),
            SyncOutcome::succeeded("c@example.org", ChangeKind::Import, path),
        ];
        assert_eq!(
            OutcomeSummary::of(&outcomes),
            OutcomeSummary {
                total: 3,
                succeeded: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn serialises_without_empty_fields() {
        let outcome = SyncOutcome {
            key: "a@example.org".to_owned(),
            success: true,
            message: None,
            change: ChangeKind::Export,
            path: None,
        };
        let json = serde_json::to_value(&outcome).expect("serialise");
        assert_eq!(
            json,
            serde_json::json!({ "key": "a@example.org", "success": true, "change": "export" })
        );
    }
}
