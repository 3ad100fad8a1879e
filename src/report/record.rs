//! Reporting records: one [`TestCaseRecord`] per test method execution.
//!
//! A record starts as [`TestStatus::Created`] and moves to exactly one
//! terminal status. Log entries are append-only.

#![allow(missing_docs)]

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{ReportError, Result};

/// Lifecycle status of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Created,
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Created)
    }

    /// Upper-case label used in artifact names (`Checkout_FAILED`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        })
    }
}

/// Severity of a record log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Pass,
    Fail,
    Skip,
    Warning,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Warning => "warning",
        }
    }
}

/// A single line in a record's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    pub ts: DateTime<Utc>,
}

/// Kind of captured diagnostic attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Screenshot,
}

/// Where an artifact's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "storage", rename_all = "lowercase")]
pub enum ArtifactPayload {
    /// Written to disk; the report references the path.
    File { path: PathBuf },
    /// Embedded in the report as base64.
    Inline { media_type: String, base64: String },
}

/// A captured diagnostic attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Capture label, `<testId>_<STATUS>`.
    pub label: String,
    pub payload: ArtifactPayload,
    /// Hex SHA-256 of the raw captured bytes.
    pub sha256: String,
    pub size_bytes: u64,
    pub captured_at: DateTime<Utc>,
}

/// Reporting record for one test method execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseRecord {
    pub test_id: String,
    /// Sanitised key of the suite this test reports into.
    pub suite: String,
    pub description: String,
    pub status: TestStatus,
    pub logs: Vec<LogEntry>,
    pub artifacts: Vec<Artifact>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TestCaseRecord {
    /// Create a fresh record stamped with the current UTC time.
    pub fn new(
        test_id: impl Into<String>,
        suite: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::started_at(test_id, suite, description, Utc::now())
    }

    /// Create a fresh record with an explicit start timestamp.
    pub fn started_at(
        test_id: impl Into<String>,
        suite: impl Into<String>,
        description: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            suite: suite.into(),
            description: description.into(),
            status: TestStatus::Created,
            logs: Vec::new(),
            artifacts: Vec::new(),
            started_at,
            finished_at: None,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a log entry.
    pub fn log(&mut self, severity: Severity, message: impl Into<String>) {
        self.logs.push(LogEntry {
            severity,
            message: message.into(),
            ts: Utc::now(),
        });
    }

    /// Move the record to a terminal status. The first terminal status wins.
    pub fn finish(&mut self, status: TestStatus) -> Result<()> {
        if self.status.is_terminal() || !status.is_terminal() {
            return Err(ReportError::InvalidTransition {
                test_id: self.test_id.clone(),
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Attach an artifact unless the record already holds `limit` of them.
    ///
    /// Returns `false` (and leaves the record untouched) when full.
    pub fn attach(&mut self, artifact: Artifact, limit: usize) -> bool {
        if self.artifacts.len() >= limit {
            return false;
        }
        self.artifacts.push(artifact);
        true
    }

    /// Elapsed milliseconds between start and finish, when finished.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TestCaseRecord {
        TestCaseRecord::new("AddItem", "Cart", "Add a product to the cart")
    }

    fn artifact(label: &str) -> Artifact {
        Artifact {
            kind: ArtifactKind::Screenshot,
            label: label.to_string(),
            payload: ArtifactPayload::File {
                path: PathBuf::from("/tmp/shot.png"),
            },
            sha256: String::new(),
            size_bytes: 0,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn new_record_is_created() {
        let rec = record();
        assert_eq!(rec.status, TestStatus::Created);
        assert!(!rec.is_terminal());
        assert!(rec.finished_at.is_none());
        assert!(rec.duration_ms().is_none());
    }

    #[test]
    fn finish_sets_terminal_status_once() {
        let mut rec = record();
        rec.finish(TestStatus::Passed).unwrap();
        assert_eq!(rec.status, TestStatus::Passed);
        assert!(rec.finished_at.is_some());

        let err = rec.finish(TestStatus::Failed).unwrap_err();
        assert_eq!(err.code(), "TRR-2003");
        assert_eq!(rec.status, TestStatus::Passed, "first terminal status wins");

        let err = rec.finish(TestStatus::Passed).unwrap_err();
        assert_eq!(err.code(), "TRR-2003");
    }

    #[test]
    fn finish_rejects_created_target() {
        let mut rec = record();
        assert!(rec.finish(TestStatus::Created).is_err());
        assert_eq!(rec.status, TestStatus::Created);
    }

    #[test]
    fn logs_are_append_only_in_order() {
        let mut rec = record();
        rec.log(Severity::Info, "step 1");
        rec.log(Severity::Fail, "boom");
        let messages: Vec<&str> = rec.logs.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["step 1", "boom"]);
        assert_eq!(rec.logs[1].severity, Severity::Fail);
    }

    #[test]
    fn attach_respects_limit() {
        let mut rec = record();
        assert!(rec.attach(artifact("a"), 2));
        assert!(rec.attach(artifact("b"), 2));
        assert!(!rec.attach(artifact("c"), 2));
        assert_eq!(rec.artifacts.len(), 2);
    }

    #[test]
    fn status_labels() {
        assert_eq!(TestStatus::Failed.label(), "FAILED");
        assert_eq!(TestStatus::Skipped.to_string(), "skipped");
        assert!(TestStatus::Passed.is_terminal());
    }

    #[test]
    fn record_serializes_with_lowercase_status() {
        let mut rec = record();
        rec.finish(TestStatus::Skipped).unwrap();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["test_id"], "AddItem");
    }
}
