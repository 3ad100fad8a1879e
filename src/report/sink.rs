//! Report persistence: one [`ReportSink`] per suite run.
//!
//! Appends from any number of workers are serialised behind the sink's mutex.
//! `flush` writes the sorted records once (temp file + rename), flips the
//! flushed flag and releases the records; later calls are no-ops that report
//! success.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::core::config::{OutputConfig, ReportFormat};
use crate::core::errors::{ReportError, Result};
use crate::core::paths::sanitize_component;
use crate::report::record::TestCaseRecord;
use crate::report::render::{self, ReportDocument};

/// Result of a `flush` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The report was written now.
    Written { path: PathBuf, records: usize },
    /// An earlier call already wrote it; nothing was touched.
    AlreadyFlushed,
}

/// Point-in-time view of a suite run.
#[derive(Debug, Clone)]
pub struct TestRun {
    pub suite: String,
    pub key: String,
    pub path: PathBuf,
    pub flushed: bool,
    pub records: Vec<TestCaseRecord>,
}

#[derive(Debug, Default)]
struct SinkState {
    records: Vec<TestCaseRecord>,
    flushed: bool,
}

impl SinkState {
    /// Mark persisted and release the records; the report file owns them now.
    fn seal(&mut self) {
        self.flushed = true;
        self.records = Vec::new();
    }
}

/// Owner of one suite's report file.
#[derive(Debug)]
pub struct ReportSink {
    suite: String,
    key: String,
    path: PathBuf,
    format: ReportFormat,
    run_started_at: DateTime<Utc>,
    state: Mutex<SinkState>,
}

impl ReportSink {
    fn new(
        suite: &str,
        key: String,
        output: &OutputConfig,
        run_started_at: DateTime<Utc>,
    ) -> Self {
        let path = report_path(output, &key, run_started_at);
        Self {
            suite: suite.to_string(),
            key,
            path,
            format: output.format,
            run_started_at,
            state: Mutex::new(SinkState::default()),
        }
    }

    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Sanitised suite key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Target file path (may not exist until flushed).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.state.lock().flushed
    }

    /// Records waiting to be flushed. Zero once the report is written.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Queue a finished record. Rejected once the sink has been flushed.
    pub fn append(&self, record: TestCaseRecord) -> Result<()> {
        let mut state = self.state.lock();
        if state.flushed {
            return Err(ReportError::SinkFlushed {
                key: self.key.clone(),
                test_id: record.test_id,
            });
        }
        state.records.push(record);
        Ok(())
    }

    /// Persist the report. Idempotent: only the first successful call writes.
    ///
    /// A failed write leaves the flag unset so the caller may retry.
    pub fn flush(&self) -> Result<FlushOutcome> {
        let mut state = self.state.lock();
        if state.flushed {
            return Ok(FlushOutcome::AlreadyFlushed);
        }

        let doc = ReportDocument::new(
            &self.suite,
            &self.key,
            self.run_started_at,
            state.records.clone(),
        );
        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let body = render::render(&doc, self.format, base_dir)?;
        write_atomically(&self.path, body.as_bytes()).map_err(|source| ReportError::Flush {
            path: self.path.clone(),
            source,
        })?;

        state.seal();
        tracing::info!(
            suite = %self.suite,
            path = %self.path.display(),
            records = doc.records.len(),
            "report flushed"
        );
        Ok(FlushOutcome::Written {
            path: self.path.clone(),
            records: doc.records.len(),
        })
    }

    /// Snapshot of the run with records in report order.
    ///
    /// After a flush the records live only in the report file, so the
    /// snapshot carries none.
    #[must_use]
    pub fn snapshot(&self) -> TestRun {
        let state = self.state.lock();
        let doc = ReportDocument::new(
            &self.suite,
            &self.key,
            self.run_started_at,
            state.records.clone(),
        );
        TestRun {
            suite: self.suite.clone(),
            key: self.key.clone(),
            path: self.path.clone(),
            flushed: state.flushed,
            records: doc.records,
        }
    }
}

/// Per-run registry of open sinks, keyed by sanitised suite name.
#[derive(Debug)]
pub struct ReportSinks {
    output: OutputConfig,
    sinks: Mutex<HashMap<String, Arc<ReportSink>>>,
}

impl ReportSinks {
    #[must_use]
    pub fn new(output: OutputConfig) -> Self {
        Self {
            output,
            sinks: Mutex::new(HashMap::new()),
        }
    }

    /// Open the sink for `suite`, or return the one already open for its key.
    ///
    /// Fails with [`ReportError::OutputRoot`] if the output root cannot be
    /// created or written.
    pub fn open(&self, suite: &str) -> Result<Arc<ReportSink>> {
        let key = sanitize_component(suite);
        let mut sinks = self.sinks.lock();
        if let Some(existing) = sinks.get(&key) {
            return Ok(Arc::clone(existing));
        }

        ensure_writable_root(&self.output.root)?;
        let sink = Arc::new(ReportSink::new(suite, key.clone(), &self.output, Utc::now()));
        tracing::debug!(suite, path = %sink.path().display(), "report sink opened");
        sinks.insert(key, Arc::clone(&sink));
        Ok(sink)
    }

    /// Sink already open for `suite`, if any.
    pub fn get(&self, suite: &str) -> Option<Arc<ReportSink>> {
        self.sinks.lock().get(&sanitize_component(suite)).cloned()
    }

    /// All open sinks, ordered by key.
    pub fn all(&self) -> Vec<Arc<ReportSink>> {
        let mut all: Vec<_> = self.sinks.lock().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }
}

/// `<root>/<prefix>_<key>[_<yyyyMMdd_HHmmss>].<ext>`
fn report_path(output: &OutputConfig, key: &str, started: DateTime<Utc>) -> PathBuf {
    let mut name = format!("{}_{key}", output.report_prefix);
    if output.timestamp_suffix {
        name.push('_');
        name.push_str(&started.format("%Y%m%d_%H%M%S").to_string());
    }
    name.push('.');
    name.push_str(output.format.extension());
    output.root.join(name)
}

fn ensure_writable_root(root: &Path) -> Result<()> {
    let unusable = |details: String| ReportError::OutputRoot {
        path: root.to_path_buf(),
        details,
    };
    fs::create_dir_all(root).map_err(|e| unusable(format!("cannot create: {e}")))?;
    let marker = root.join(format!(".trr-write-check-{}", std::process::id()));
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&marker)
        .map_err(|e| unusable(format!("not writable: {e}")))?;
    if let Err(e) = fs::remove_file(&marker) {
        tracing::debug!(path = %marker.display(), error = %e, "write-check file not removed");
    }
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| {
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_data()?;
        }
        fs::rename(&tmp, path)
    })();

    if result.is_err()
        && let Err(e) = fs::remove_file(&tmp)
    {
        tracing::debug!(path = %tmp.display(), error = %e, "temp report not removed");
    }
    result
}
