//! Per-worker association between an execution slot and its active test.
//!
//! Each worker owns at most one non-terminal record at a time. Entries sit
//! behind their own mutex so one worker's mutations never wait on another's;
//! the map lock is only held for insert, lookup and removal.
//!
//! Lock order is always map → slot. Callers must not hold a slot lock while
//! calling back into the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::capture::AutomationHandle;
use crate::core::errors::{ReportError, Result};
use crate::report::record::TestCaseRecord;

static NEXT_THREAD_WORKER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_WORKER: u64 = NEXT_THREAD_WORKER.fetch_add(1, Ordering::Relaxed);
}

/// Identity of a logical execution slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Explicit id, for runners that schedule tests on their own slots.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Stable id for the calling OS thread.
    #[must_use]
    pub fn current() -> Self {
        Self(THREAD_WORKER.with(|id| *id))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// The record a worker is currently reporting into, plus its capture handle.
pub struct ActiveTest {
    pub record: TestCaseRecord,
    /// Suite name as the runner passed it; `record.suite` holds the sanitised key.
    pub suite_id: String,
    pub handle: Option<Arc<dyn AutomationHandle>>,
}

impl ActiveTest {
    pub fn new(
        suite_id: impl Into<String>,
        record: TestCaseRecord,
        handle: Option<Arc<dyn AutomationHandle>>,
    ) -> Self {
        Self {
            record,
            suite_id: suite_id.into(),
            handle,
        }
    }
}

impl fmt::Debug for ActiveTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTest")
            .field("record", &self.record)
            .field("suite_id", &self.suite_id)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

/// Shared slot for one worker's active test.
pub type ActiveSlot = Arc<Mutex<ActiveTest>>;

/// Worker → active test map.
#[derive(Debug, Default)]
pub struct TestContextRegistry {
    slots: RwLock<HashMap<WorkerId, ActiveSlot>>,
}

impl TestContextRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `active` for `worker`.
    ///
    /// Rejects with [`ReportError::DuplicateContext`] when the worker still
    /// holds a non-terminal record; the existing entry is left untouched.
    pub fn set(&self, worker: WorkerId, active: ActiveTest) -> Result<ActiveSlot> {
        let mut slots = self.slots.write();
        if let Some(existing) = slots.get(&worker) {
            let existing = existing.lock();
            if !existing.record.is_terminal() {
                return Err(ReportError::DuplicateContext {
                    worker,
                    active: existing.record.test_id.clone(),
                    incoming: active.record.test_id,
                });
            }
        }
        let slot = Arc::new(Mutex::new(active));
        slots.insert(worker, Arc::clone(&slot));
        Ok(slot)
    }

    /// Active slot for `worker`, if any.
    pub fn get(&self, worker: WorkerId) -> Option<ActiveSlot> {
        self.slots.read().get(&worker).cloned()
    }

    /// Drop the worker's entry. Returns whether one existed.
    pub fn clear(&self, worker: WorkerId) -> bool {
        self.slots.write().remove(&worker).is_some()
    }

    /// Number of workers with a registered entry.
    pub fn active_count(&self) -> usize {
        self.slots.read().len()
    }

    /// `(worker, test_id)` of non-terminal entries reporting into `suite`.
    pub fn active_in_suite(&self, suite: &str) -> Vec<(WorkerId, String)> {
        let slots = self.slots.read();
        let mut found: Vec<(WorkerId, String)> = slots
            .iter()
            .filter_map(|(worker, slot)| {
                let active = slot.lock();
                (active.record.suite == suite && !active.record.is_terminal())
                    .then(|| (*worker, active.record.test_id.clone()))
            })
            .collect();
        found.sort();
        found
    }
}
