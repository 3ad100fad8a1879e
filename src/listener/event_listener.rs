//! [`EventListener`]: lifecycle callbacks → records, artifacts and reports.

use crate::capture::CaptureError;
use crate::core::errors::{ReportError, Result};
use crate::core::paths::sanitize_component;
use crate::journal::{JournalEvent, JournalEventKind};
use crate::listener::{FailureInfo, RunContext, TestLifecycle, TestStart};
use crate::report::record::{Severity, TestCaseRecord, TestStatus};
use crate::report::registry::{ActiveSlot, ActiveTest, WorkerId};
use crate::report::sink::{FlushOutcome, TestRun};

/// How a terminal callback changes the record before it is filed.
struct Terminal<'a> {
    status: TestStatus,
    kind: JournalEventKind,
    severity: Severity,
    message: &'a str,
    cause: Option<&'a str>,
    capture: bool,
}

/// Reporting listener for one run.
///
/// Share it across worker threads behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct EventListener {
    ctx: RunContext,
}

impl EventListener {
    #[must_use]
    pub const fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub const fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Snapshot of a suite's run, if its sink was opened.
    #[must_use]
    pub fn run(&self, suite_id: &str) -> Option<TestRun> {
        self.ctx.sinks().get(suite_id).map(|sink| sink.snapshot())
    }

    fn finish_test(&self, worker: WorkerId, test_id: &str, terminal: &Terminal<'_>) {
        let Some(slot) = self.active_slot(worker, test_id) else {
            return;
        };

        let (suite, suite_id, handle) = {
            let mut active = slot.lock();
            if let Err(err) = active.record.finish(terminal.status) {
                log_recoverable(&err);
                return;
            }
            active.record.log(terminal.severity, terminal.message);
            if let Some(cause) = terminal.cause {
                active.record.log(Severity::Info, format!("cause: {cause}"));
            }
            (
                active.record.suite.clone(),
                active.suite_id.clone(),
                active.handle.clone(),
            )
        };
        self.ctx.registry().clear(worker);

        self.ctx.journal({
            let event = JournalEvent::test(terminal.kind, &suite_id, worker, test_id);
            if terminal.message.is_empty() || terminal.status == TestStatus::Passed {
                event
            } else {
                event.with_message(terminal.message)
            }
        });

        if terminal.capture {
            let label = format!("{test_id}_{}", terminal.status.label());
            let outcome = self.ctx.capturer().capture(handle.as_ref(), &suite, &label);
            self.attach_capture(&slot, outcome);
        }

        let record = slot.lock().record.clone();
        self.file_record(record);
    }

    /// Active slot for `worker` if it belongs to `test_id`.
    fn active_slot(&self, worker: WorkerId, test_id: &str) -> Option<ActiveSlot> {
        let slot = self.ctx.registry().get(worker);
        let owner = slot.as_ref().map(|s| s.lock().record.test_id.clone());
        match (slot, owner) {
            (Some(slot), Some(owner)) if owner == test_id => Some(slot),
            (_, owner) => {
                let err = ReportError::MissingContext {
                    worker,
                    test_id: test_id.to_string(),
                };
                tracing::warn!(
                    code = err.code(),
                    %worker,
                    test_id,
                    active = owner.as_deref().unwrap_or("-"),
                    "{err}"
                );
                None
            }
        }
    }

    fn attach_capture(
        &self,
        slot: &ActiveSlot,
        outcome: std::result::Result<crate::report::record::Artifact, CaptureError>,
    ) {
        let limit = self.ctx.config().capture.max_artifacts_per_record;
        let mut active = slot.lock();
        let test_id = active.record.test_id.clone();
        match outcome {
            Ok(artifact) => {
                let label = artifact.label.clone();
                if active.record.attach(artifact, limit) {
                    tracing::debug!(%test_id, %label, "screenshot attached");
                } else {
                    tracing::warn!(%test_id, limit, "artifact limit reached, screenshot dropped");
                    active.record.log(
                        Severity::Warning,
                        format!("screenshot {label} dropped: limit of {limit} reached"),
                    );
                }
            }
            Err(err) => {
                tracing::warn!(code = err.code(), %test_id, "{err}");
                active
                    .record
                    .log(Severity::Warning, format!("screenshot unavailable: {err}"));
            }
        }
    }

    fn file_record(&self, record: TestCaseRecord) {
        let appended = self
            .ctx
            .sinks()
            .open(&record.suite)
            .and_then(|sink| sink.append(record));
        if let Err(err) = appended {
            if err.is_recoverable() {
                log_recoverable(&err);
            } else {
                tracing::error!(code = err.code(), "record not filed: {err}");
            }
        }
    }
}

impl TestLifecycle for EventListener {
    fn on_suite_start(&self, suite_id: &str) -> Result<()> {
        self.ctx
            .journal(JournalEvent::suite(JournalEventKind::SuiteStart, suite_id));
        let sink = self.ctx.sinks().open(suite_id)?;
        tracing::info!(suite = suite_id, path = %sink.path().display(), "suite started");
        Ok(())
    }

    fn on_test_start(&self, worker: WorkerId, start: TestStart) {
        let TestStart {
            suite_id,
            test_id,
            handle,
        } = start;
        self.ctx.journal(JournalEvent::test(
            JournalEventKind::TestStart,
            &suite_id,
            worker,
            &test_id,
        ));

        if let Err(err) = self.ctx.sinks().open(&suite_id) {
            tracing::error!(code = err.code(), suite = %suite_id, "cannot open report for test: {err}");
        }

        let description = self.ctx.catalog().lookup(&test_id);
        let mut record = TestCaseRecord::new(&test_id, sanitize_component(&suite_id), description);
        record.log(Severity::Info, "test started");

        match self
            .ctx
            .registry()
            .set(worker, ActiveTest::new(&suite_id, record, handle))
        {
            Ok(_) => tracing::debug!(%worker, %test_id, suite = %suite_id, "test started"),
            Err(err) => log_recoverable(&err),
        }
    }

    fn on_test_pass(&self, worker: WorkerId, test_id: &str) {
        self.finish_test(
            worker,
            test_id,
            &Terminal {
                status: TestStatus::Passed,
                kind: JournalEventKind::TestPass,
                severity: Severity::Pass,
                message: "test passed",
                cause: None,
                capture: self.ctx.config().capture.on_success,
            },
        );
    }

    fn on_test_fail(&self, worker: WorkerId, test_id: &str, failure: &FailureInfo) {
        self.finish_test(
            worker,
            test_id,
            &Terminal {
                status: TestStatus::Failed,
                kind: JournalEventKind::TestFail,
                severity: Severity::Fail,
                message: &failure.message,
                cause: failure.cause.as_deref(),
                capture: self.ctx.config().capture.on_failure,
            },
        );
    }

    fn on_test_skip(&self, worker: WorkerId, test_id: &str, reason: &str) {
        self.finish_test(
            worker,
            test_id,
            &Terminal {
                status: TestStatus::Skipped,
                kind: JournalEventKind::TestSkip,
                severity: Severity::Skip,
                message: reason,
                cause: None,
                capture: false,
            },
        );
    }

    fn on_suite_finish(&self, suite_id: &str) -> Result<FlushOutcome> {
        self.ctx
            .journal(JournalEvent::suite(JournalEventKind::SuiteFinish, suite_id));

        let key = sanitize_component(suite_id);
        let unfinished = self.ctx.registry().active_in_suite(&key);
        if !unfinished.is_empty() {
            tracing::warn!(
                suite = suite_id,
                count = unfinished.len(),
                tests = ?unfinished,
                "suite finished with tests still running; they are not in the report"
            );
        }

        let sink = match self.ctx.sinks().get(suite_id) {
            Some(sink) => sink,
            None => self.ctx.sinks().open(suite_id)?,
        };
        let outcome = sink.flush()?;
        if outcome == FlushOutcome::AlreadyFlushed {
            tracing::debug!(suite = suite_id, "report already flushed");
        }
        Ok(outcome)
    }
}

fn log_recoverable(err: &ReportError) {
    tracing::warn!(code = err.code(), "{err}");
}
