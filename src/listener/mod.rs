//! Test lifecycle listener: the entry point the external runner calls into.
//!
//! Suite-level callbacks may fail (unusable output root, failed flush). Test-level
//! callbacks never do: problems with one test case are logged and the run goes on.

#![allow(missing_docs)]

pub mod context;
pub mod event_listener;

pub use context::RunContext;
pub use event_listener::EventListener;

use std::fmt;
use std::sync::Arc;

use crate::capture::AutomationHandle;
use crate::core::errors::Result;
use crate::report::registry::WorkerId;
use crate::report::sink::FlushOutcome;

/// Arguments of a test-start callback.
#[derive(Clone)]
pub struct TestStart {
    pub suite_id: String,
    pub test_id: String,
    /// Capture handle for this test, if the harness has one.
    pub handle: Option<Arc<dyn AutomationHandle>>,
}

impl TestStart {
    pub fn new(suite_id: impl Into<String>, test_id: impl Into<String>) -> Self {
        Self {
            suite_id: suite_id.into(),
            test_id: test_id.into(),
            handle: None,
        }
    }

    #[must_use]
    pub fn with_handle(mut self, handle: Arc<dyn AutomationHandle>) -> Self {
        self.handle = Some(handle);
        self
    }
}

impl fmt::Debug for TestStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestStart")
            .field("suite_id", &self.suite_id)
            .field("test_id", &self.test_id)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

/// Opaque failure description from the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    pub message: String,
    pub cause: Option<String>,
}

impl FailureInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl From<&str> for FailureInfo {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Lifecycle callbacks a test runner drives.
pub trait TestLifecycle: Send + Sync {
    fn on_suite_start(&self, suite_id: &str) -> Result<()>;
    fn on_test_start(&self, worker: WorkerId, start: TestStart);
    fn on_test_pass(&self, worker: WorkerId, test_id: &str);
    fn on_test_fail(&self, worker: WorkerId, test_id: &str, failure: &FailureInfo);
    fn on_test_skip(&self, worker: WorkerId, test_id: &str, reason: &str);
    fn on_suite_finish(&self, suite_id: &str) -> Result<FlushOutcome>;
}
