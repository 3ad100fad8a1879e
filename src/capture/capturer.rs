//! Artifact capture with a bounded wait on the automation handle.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use crossbeam_channel::{RecvTimeoutError, bounded};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::capture::AutomationHandle;
use crate::core::config::{CaptureConfig, CaptureMode};
use crate::core::paths::sanitize_component;
use crate::report::record::{Artifact, ArtifactKind, ArtifactPayload};

/// Sub-directory of the artifact root that holds screenshots.
pub const SCREENSHOT_DIR: &str = "screenshots";

/// Collision retries when two captures share a label and millisecond.
const MAX_NAME_ATTEMPTS: u32 = 32;

/// Encoded image returned by a [`Snapshottable`](crate::capture::Snapshottable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl Snapshot {
    #[must_use]
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            format: ImageFormat::Png,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
}

impl ImageFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
        }
    }

    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
        }
    }
}

/// Why a capture produced no artifact. Always recovered by the caller.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("[TRR-4001] no snapshot-capable automation handle")]
    Unsupported,

    #[error("[TRR-4002] snapshot did not complete within {after:?}")]
    Timeout { after: Duration },

    #[error("[TRR-4003] capture IO failure{}: {source}", at_path(.path.as_deref()))]
    IoFailure {
        path: Option<PathBuf>,
        #[source]
        source: io::Error,
    },
}

impl CaptureError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unsupported => "TRR-4001",
            Self::Timeout { .. } => "TRR-4002",
            Self::IoFailure { .. } => "TRR-4003",
        }
    }

    fn io(path: Option<&Path>, source: io::Error) -> Self {
        Self::IoFailure {
            path: path.map(Path::to_path_buf),
            source,
        }
    }
}

fn at_path(path: Option<&Path>) -> String {
    path.map(|p| format!(" at {}", p.display()))
        .unwrap_or_default()
}

/// Writes captured screenshots under `<root>/screenshots/<category>/`.
#[derive(Debug, Clone)]
pub struct ArtifactCapturer {
    root: PathBuf,
    mode: CaptureMode,
    timeout: Duration,
}

impl ArtifactCapturer {
    pub fn new(root: impl Into<PathBuf>, mode: CaptureMode, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            mode,
            timeout,
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, config: &CaptureConfig) -> Self {
        Self::new(root, config.mode, config.timeout())
    }

    /// Capture the handle's current visual state as an artifact labelled `label`.
    ///
    /// `category` groups files on disk (the suite key); `label` is normally
    /// `<testId>_<STATUS>`.
    pub fn capture(
        &self,
        handle: Option<&Arc<dyn AutomationHandle>>,
        category: &str,
        label: &str,
    ) -> Result<Artifact, CaptureError> {
        let snapper = handle
            .and_then(|h| h.snapshotter())
            .ok_or(CaptureError::Unsupported)?;

        let snapshot = self.snapshot_with_timeout(snapper)?;
        if snapshot.bytes.is_empty() {
            return Err(CaptureError::io(
                None,
                io::Error::new(io::ErrorKind::InvalidData, "snapshot returned no bytes"),
            ));
        }

        let sha256 = format!("{:x}", Sha256::digest(&snapshot.bytes));
        let size_bytes = snapshot.bytes.len() as u64;
        let payload = match self.mode {
            CaptureMode::File => ArtifactPayload::File {
                path: self.write_file(category, label, &snapshot)?,
            },
            CaptureMode::Inline => ArtifactPayload::Inline {
                media_type: snapshot.format.media_type().to_string(),
                base64: BASE64.encode(&snapshot.bytes),
            },
        };

        Ok(Artifact {
            kind: ArtifactKind::Screenshot,
            label: label.to_string(),
            payload,
            sha256,
            size_bytes,
            captured_at: Utc::now(),
        })
    }

    fn snapshot_with_timeout(
        &self,
        snapper: Arc<dyn crate::capture::Snapshottable>,
    ) -> Result<Snapshot, CaptureError> {
        let (tx, rx) = bounded(1);
        // A stuck handle keeps this thread parked; the caller moves on after the timeout.
        thread::Builder::new()
            .name("trr-capture".to_string())
            .spawn(move || {
                let _ = tx.send(snapper.snapshot());
            })
            .map_err(|e| CaptureError::io(None, e))?;

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(source)) => Err(CaptureError::io(None, source)),
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::Timeout {
                after: self.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::io(
                None,
                io::Error::other("snapshot worker exited without a result"),
            )),
        }
    }

    fn write_file(
        &self,
        category: &str,
        label: &str,
        snapshot: &Snapshot,
    ) -> Result<PathBuf, CaptureError> {
        let dir = self
            .root
            .join(SCREENSHOT_DIR)
            .join(sanitize_component(category));
        fs::create_dir_all(&dir).map_err(|e| CaptureError::io(Some(&dir), e))?;

        let stem = format!(
            "{}_{}",
            sanitize_component(label),
            Utc::now().format("%Y%m%d_%H%M%S_%3f")
        );
        let ext = snapshot.format.extension();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{stem}.{ext}")
            } else {
                format!("{stem}-{attempt}.{ext}")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&snapshot.bytes)
                        .map_err(|e| CaptureError::io(Some(&path), e))?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(CaptureError::io(Some(&path), e)),
            }
        }
        Err(CaptureError::io(
            Some(&dir),
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free file name for {stem}"),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Snapshottable;
    use std::time::Instant;

    struct Fixed(Vec<u8>);
    impl Snapshottable for Fixed {
        fn snapshot(&self) -> io::Result<Snapshot> {
            Ok(Snapshot::png(self.0.clone()))
        }
    }

    struct Failing;
    impl Snapshottable for Failing {
        fn snapshot(&self) -> io::Result<Snapshot> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "session gone"))
        }
    }

    struct Stuck;
    impl Snapshottable for Stuck {
        fn snapshot(&self) -> io::Result<Snapshot> {
            thread::sleep(Duration::from_secs(5));
            Ok(Snapshot::png(vec![1]))
        }
    }

    struct Handle(Option<Arc<dyn Snapshottable>>);
    impl AutomationHandle for Handle {
        fn snapshotter(&self) -> Option<Arc<dyn Snapshottable>> {
            self.0.clone()
        }
    }

    struct Headless;
    impl AutomationHandle for Headless {}

    fn handle(s: impl Snapshottable + 'static) -> Arc<dyn AutomationHandle> {
        Arc::new(Handle(Some(Arc::new(s))))
    }

    fn capturer(root: &Path, mode: CaptureMode) -> ArtifactCapturer {
        ArtifactCapturer::new(root, mode, Duration::from_millis(500))
    }

    #[test]
    fn file_mode_writes_under_conventional_path() {
        let dir = tempfile::tempdir().unwrap();
        let cap = capturer(dir.path(), CaptureMode::File);
        let h = handle(Fixed(vec![0x89, b'P', b'N', b'G']));
        let artifact = cap.capture(Some(&h), "Cart", "Checkout_FAILED").unwrap();

        let ArtifactPayload::File { path } = &artifact.payload else {
            panic!("expected file payload");
        };
        assert!(path.starts_with(dir.path().join("screenshots").join("Cart")));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Checkout_FAILED_"), "{name}");
        assert!(name.ends_with(".png"), "{name}");
        assert_eq!(fs::read(path).unwrap(), vec![0x89, b'P', b'N', b'G']);
        assert_eq!(artifact.size_bytes, 4);
        assert_eq!(artifact.sha256.len(), 64);
        assert_eq!(artifact.kind, ArtifactKind::Screenshot);
    }

    #[test]
    fn inline_mode_embeds_base64() {
        let dir = tempfile::tempdir().unwrap();
        let cap = capturer(dir.path(), CaptureMode::Inline);
        let h = handle(Fixed(vec![0, 1, 2]));
        let artifact = cap.capture(Some(&h), "Cart", "AddItem_PASSED").unwrap();
        assert_eq!(
            artifact.payload,
            ArtifactPayload::Inline {
                media_type: "image/png".into(),
                base64: "AAEC".into()
            }
        );
        assert!(!dir.path().join(SCREENSHOT_DIR).exists());
    }

    #[test]
    fn repeated_labels_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let cap = capturer(dir.path(), CaptureMode::File);
        let h = handle(Fixed(vec![7]));
        let mut paths = Vec::new();
        for _ in 0..5 {
            match cap.capture(Some(&h), "Cart", "Same").unwrap().payload {
                ArtifactPayload::File { path } => paths.push(path),
                ArtifactPayload::Inline { .. } => panic!("expected file"),
            }
        }
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 5);
    }

    #[test]
    fn absent_handle_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let cap = capturer(dir.path(), CaptureMode::File);
        let err = cap.capture(None, "Cart", "Logout_FAILED").unwrap_err();
        assert!(matches!(err, CaptureError::Unsupported));
    }

    #[test]
    fn handle_without_capability_is_unsupported_and_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cap = capturer(dir.path(), CaptureMode::File);
        let h: Arc<dyn AutomationHandle> = Arc::new(Headless);
        let err = cap.capture(Some(&h), "Cart", "Logout_FAILED").unwrap_err();
        assert_eq!(err.code(), "TRR-4001");
        assert!(!dir.path().join(SCREENSHOT_DIR).exists());
    }

    #[test]
    fn snapshot_error_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cap = capturer(dir.path(), CaptureMode::File);
        let err = cap
            .capture(Some(&handle(Failing)), "Cart", "x")
            .unwrap_err();
        assert_eq!(err.code(), "TRR-4003");
        assert!(err.to_string().contains("session gone"));
    }

    #[test]
    fn empty_snapshot_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cap = capturer(dir.path(), CaptureMode::File);
        let err = cap
            .capture(Some(&handle(Fixed(Vec::new()))), "Cart", "x")
            .unwrap_err();
        assert!(matches!(err, CaptureError::IoFailure { .. }));
    }

    #[test]
    fn stuck_handle_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let cap = ArtifactCapturer::new(dir.path(), CaptureMode::File, Duration::from_millis(50));
        let started = Instant::now();
        let err = cap.capture(Some(&handle(Stuck)), "Cart", "x").unwrap_err();
        assert!(matches!(err, CaptureError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn unwritable_root_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let cap = capturer(&blocker, CaptureMode::File);
        let err = cap
            .capture(Some(&handle(Fixed(vec![1]))), "Cart", "x")
            .unwrap_err();
        match err {
            CaptureError::IoFailure { path, .. } => assert!(path.is_some()),
            other => panic!("unexpected: {other}"),
        }
    }
}
