//! Lifecycle journal: append-only JSONL record of every listener callback.
//!
//! Each line is a self-contained JSON object assembled in memory and written
//! with a single `write_all`, so concurrent tailers never see half a line.
//! Journal trouble never affects reporting: on the first write failure the
//! writer logs once and degrades to discarding.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::{ReportError, Result};
use crate::report::registry::WorkerId;

/// Which callback produced a journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventKind {
    SuiteStart,
    TestStart,
    TestPass,
    TestFail,
    TestSkip,
    SuiteFinish,
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEvent {
    pub ts: DateTime<Utc>,
    pub event: JournalEventKind,
    pub suite: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// Failure message or skip reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JournalEvent {
    pub fn suite(event: JournalEventKind, suite: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            event,
            suite: suite.into(),
            worker: None,
            test_id: None,
            message: None,
        }
    }

    pub fn test(
        event: JournalEventKind,
        suite: impl Into<String>,
        worker: WorkerId,
        test_id: impl Into<String>,
    ) -> Self {
        Self {
            worker: Some(worker),
            test_id: Some(test_id.into()),
            ..Self::suite(event, suite)
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Discard,
}

/// Append-only JSONL journal writer.
#[derive(Debug)]
pub struct JournalWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    lines_written: u64,
}

impl JournalWriter {
    /// Open (or create) the journal for appending. Never fails: an unusable
    /// path yields a writer that discards.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match open_append(&path) {
            Ok(file) => Self {
                path,
                writer: Some(BufWriter::new(file)),
                state: WriterState::Normal,
                lines_written: 0,
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "journal unavailable, discarding events");
                Self {
                    path,
                    writer: None,
                    state: WriterState::Discard,
                    lines_written: 0,
                }
            }
        }
    }

    /// Append one event as a single line.
    pub fn write_event(&mut self, event: &JournalEvent) {
        if self.state == WriterState::Discard {
            return;
        }
        let line = match serde_json::to_string(event) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                tracing::warn!(error = %e, "journal event serialization failed");
                return;
            }
        };
        let written = self
            .writer
            .as_mut()
            .is_some_and(|w| w.write_all(line.as_bytes()).and_then(|()| w.flush()).is_ok());
        if written {
            self.lines_written += 1;
        } else {
            tracing::warn!(path = %self.path.display(), "journal write failed, discarding further events");
            self.writer = None;
            self.state = WriterState::Discard;
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `"normal"` or `"discard"`.
    #[must_use]
    pub fn state(&self) -> &'static str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Discard => "discard",
        }
    }

    #[must_use]
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

/// Read a journal back, skipping (and logging) malformed lines.
pub fn read_journal(path: &Path) -> Result<Vec<JournalEvent>> {
    let file = File::open(path).map_err(|source| ReportError::io(path, source))?;
    let mut events = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| ReportError::io(path, source))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!(path = %path.display(), line = idx + 1, error = %e, "skipping malformed journal line");
            }
        }
    }
    Ok(events)
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let mut writer = JournalWriter::open(&path);
        assert_eq!(writer.state(), "normal");

        writer.write_event(&JournalEvent::suite(JournalEventKind::SuiteStart, "Cart"));
        writer.write_event(
            &JournalEvent::test(JournalEventKind::TestFail, "Cart", WorkerId::new(3), "Checkout")
                .with_message("timeout"),
        );
        assert_eq!(writer.lines_written(), 2);

        let events = read_journal(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, JournalEventKind::SuiteStart);
        assert_eq!(events[1].worker, Some(WorkerId::new(3)));
        assert_eq!(events[1].message.as_deref(), Some("timeout"));
    }

    #[test]
    fn optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JournalWriter::open(&path);
        writer.write_event(&JournalEvent::suite(JournalEventKind::SuiteFinish, "Cart"));
        let line = fs::read_to_string(&path).unwrap();
        assert!(line.contains("\"event\":\"suite_finish\""));
        assert!(!line.contains("\"worker\""));
        assert!(!line.contains("\"test_id\""));
    }

    #[test]
    fn appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        JournalWriter::open(&path)
            .write_event(&JournalEvent::suite(JournalEventKind::SuiteStart, "A"));
        JournalWriter::open(&path)
            .write_event(&JournalEvent::suite(JournalEventKind::SuiteFinish, "A"));
        assert_eq!(read_journal(&path).unwrap().len(), 2);
    }

    #[test]
    fn unusable_path_discards_silently() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let mut writer = JournalWriter::open(blocker.join("journal.jsonl"));
        assert_eq!(writer.state(), "discard");
        writer.write_event(&JournalEvent::suite(JournalEventKind::SuiteStart, "A"));
        assert_eq!(writer.lines_written(), 0);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        let good = serde_json::to_string(&JournalEvent::suite(JournalEventKind::SuiteStart, "A"))
            .unwrap();
        fs::write(&path, format!("{good}\nnot json\n\n{good}\n")).unwrap();
        assert_eq!(read_journal(&path).unwrap().len(), 2);
    }

    #[test]
    fn missing_journal_is_io_error() {
        let err = read_journal(Path::new("/nonexistent/trr/journal.jsonl")).unwrap_err();
        assert_eq!(err.code(), "TRR-3002");
    }
}
