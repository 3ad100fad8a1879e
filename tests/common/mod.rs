#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use testrun_report::prelude::*;

/// Handle whose snapshots always succeed, counting calls.
#[derive(Default)]
pub struct FakeBrowser {
    pub shots: Arc<AtomicUsize>,
}

struct FakeCamera {
    shots: Arc<AtomicUsize>,
}

impl Snapshottable for FakeCamera {
    fn snapshot(&self) -> io::Result<Snapshot> {
        let n = self.shots.fetch_add(1, Ordering::SeqCst);
        Ok(Snapshot::png(format!("png-{n}").into_bytes()))
    }
}

impl AutomationHandle for FakeBrowser {
    fn snapshotter(&self) -> Option<Arc<dyn Snapshottable>> {
        Some(Arc::new(FakeCamera {
            shots: Arc::clone(&self.shots),
        }))
    }
}

/// Handle for a session that has already closed.
pub struct ClosedSession;

impl AutomationHandle for ClosedSession {}

pub fn browser() -> Arc<dyn AutomationHandle> {
    Arc::new(FakeBrowser::default())
}

pub fn listener_at(root: &Path) -> EventListener {
    let ctx = RunContext::new(ReporterConfig::with_root(root)).expect("valid default config");
    EventListener::new(ctx)
}

pub fn listener_with(config: ReporterConfig) -> EventListener {
    EventListener::new(RunContext::new(config).expect("valid config"))
}
