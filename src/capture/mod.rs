//! Best-effort screenshot capture from an externally supplied automation handle.
//!
//! The harness hands over an [`AutomationHandle`] when a test starts. Whether it
//! can produce a screenshot is asked explicitly through
//! [`AutomationHandle::snapshotter`]; handles that cannot yield
//! [`CaptureError::Unsupported`] without any I/O.
//!
//! [`ArtifactCapturer::capture`] never panics and never returns a
//! [`ReportError`](crate::core::errors::ReportError): every path ends in an
//! [`Artifact`] or a [`CaptureError`].

pub mod capturer;

pub use capturer::{ArtifactCapturer, CaptureError, ImageFormat, Snapshot};

use std::sync::Arc;

/// Something that can render the current visual state of the system under test.
pub trait Snapshottable: Send + Sync {
    /// Grab the current visual state. May block; callers bound it with a timeout.
    fn snapshot(&self) -> std::io::Result<Snapshot>;
}

/// Opaque per-test handle supplied by the automation harness.
pub trait AutomationHandle: Send + Sync {
    /// Capability query: the snapshot interface, if this handle has one.
    ///
    /// Returning `None` (the default) marks the handle as unable to capture,
    /// e.g. because the browser session already closed.
    fn snapshotter(&self) -> Option<Arc<dyn Snapshottable>> {
        None
    }
}
