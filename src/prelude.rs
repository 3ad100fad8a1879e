//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use testrun_report::prelude::*;
//! ```

// Core
pub use crate::core::config::{CaptureMode, ReportFormat, ReporterConfig};
pub use crate::core::errors::{ReportError, Result};

// Capture
pub use crate::capture::{
    ArtifactCapturer, AutomationHandle, CaptureError, ImageFormat, Snapshot, Snapshottable,
};

// Report
pub use crate::report::catalog::DescriptionCatalog;
pub use crate::report::record::{
    Artifact, ArtifactKind, ArtifactPayload, LogEntry, Severity, TestCaseRecord, TestStatus,
};
pub use crate::report::registry::{TestContextRegistry, WorkerId};
pub use crate::report::sink::{FlushOutcome, ReportSink, ReportSinks, TestRun};

// Listener
pub use crate::listener::{
    EventListener, FailureInfo, RunContext, TestLifecycle, TestStart,
};
