//! TRR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::record::TestStatus;
use crate::report::registry::WorkerId;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Top-level error type for the reporting core.
///
/// Capture failures are deliberately absent: they live in
/// [`CaptureError`](crate::capture::CaptureError) and never cross the listener.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("[TRR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[TRR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TRR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TRR-1101] output root {path} is not usable: {details}")]
    OutputRoot { path: PathBuf, details: String },

    #[error("[TRR-2001] no active test for worker {worker} (event for {test_id})")]
    MissingContext { worker: WorkerId, test_id: String },

    #[error("[TRR-2002] worker {worker} already runs {active}; refusing to start {incoming}")]
    DuplicateContext {
        worker: WorkerId,
        active: String,
        incoming: String,
    },

    #[error("[TRR-2003] test {test_id} already finished as {from}; ignoring {to}")]
    InvalidTransition {
        test_id: String,
        from: TestStatus,
        to: TestStatus,
    },

    #[error("[TRR-2004] report for suite {key} was already flushed; dropping {test_id}")]
    SinkFlushed { key: String, test_id: String },

    #[error("[TRR-3001] failed to persist report {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TRR-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TRR-3101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },
}

impl ReportError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "TRR-1001",
            Self::MissingConfig { .. } => "TRR-1002",
            Self::ConfigParse { .. } => "TRR-1003",
            Self::OutputRoot { .. } => "TRR-1101",
            Self::MissingContext { .. } => "TRR-2001",
            Self::DuplicateContext { .. } => "TRR-2002",
            Self::InvalidTransition { .. } => "TRR-2003",
            Self::SinkFlushed { .. } => "TRR-2004",
            Self::Flush { .. } => "TRR-3001",
            Self::Io { .. } => "TRR-3002",
            Self::Serialization { .. } => "TRR-3101",
        }
    }

    /// Whether the failure is scoped to a single test case.
    ///
    /// Recoverable errors are logged by the listener and never abort the run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingContext { .. }
                | Self::DuplicateContext { .. }
                | Self::InvalidTransition { .. }
                | Self::SinkFlushed { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ReportError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
