//! Configuration system: optional TOML file + smart defaults.
//!
//! The reporting core reads no environment variables; every knob arrives
//! through [`ReporterConfig`], either built in code or loaded from TOML.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{ReportError, Result};
use crate::core::paths::sanitize_component;

/// Upper bound accepted for `capture.max_artifacts_per_record`.
pub const MAX_ARTIFACTS_CEILING: usize = 16;

/// Full reporter configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ReporterConfig {
    pub output: OutputConfig,
    pub capture: CaptureConfig,
    pub catalog: CatalogConfig,
    pub journal: JournalConfig,
}

/// Where and how reports are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for reports and screenshots.
    pub root: PathBuf,
    /// File-name prefix, e.g. `ExtentReport` → `ExtentReport_Cart.html`.
    pub report_prefix: String,
    /// Append the run timestamp to report names to avoid collisions.
    pub timestamp_suffix: bool,
    pub format: ReportFormat,
}

/// Rendering of the persisted report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
}

impl ReportFormat {
    /// File extension used for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

/// Screenshot capture policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaptureConfig {
    pub on_failure: bool,
    pub on_success: bool,
    pub mode: CaptureMode,
    /// Upper bound on a single snapshot call against the automation handle.
    pub timeout_ms: u64,
    pub max_artifacts_per_record: usize,
}

/// How captured artifacts are stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Write an image file under `<root>/screenshots/` and reference it.
    #[default]
    File,
    /// Embed the base64-encoded image in the report itself.
    Inline,
}

/// Description catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Kind used in the fallback description `"<kind> test: <id>"`.
    pub default_kind: String,
    /// Extra descriptions layered over the built-in table.
    pub descriptions: BTreeMap<String, String>,
}

/// Lifecycle journal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    /// Defaults to `<output.root>/journal.jsonl`.
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("test-output"),
            report_prefix: "ExtentReport".to_string(),
            timestamp_suffix: false,
            format: ReportFormat::Html,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            on_failure: true,
            on_success: false,
            mode: CaptureMode::File,
            timeout_ms: 5_000,
            max_artifacts_per_record: 3,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_kind: "UI".to_string(),
            descriptions: BTreeMap::new(),
        }
    }
}

impl CaptureConfig {
    /// Snapshot timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl JournalConfig {
    /// Effective journal path for the given output root.
    #[must_use]
    pub fn effective_path(&self, root: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| root.join("journal.jsonl"))
    }
}

impl ReporterConfig {
    /// Defaults with the output root pointed at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let mut cfg = Self::default();
        cfg.output.root = root.into();
        cfg
    }

    /// Load config from an explicit path, or use defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Err(ReportError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| ReportError::io(path, source))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ReportError::Serialization {
            context: "toml",
            details: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let prefix = &self.output.report_prefix;
        if prefix.is_empty() {
            return Err(ReportError::InvalidConfig {
                details: "output.report_prefix must not be empty".to_string(),
            });
        }
        if sanitize_component(prefix) != *prefix {
            return Err(ReportError::InvalidConfig {
                details: format!(
                    "output.report_prefix {prefix:?} may only contain [A-Za-z0-9-_.]"
                ),
            });
        }
        if self.capture.timeout_ms == 0 {
            return Err(ReportError::InvalidConfig {
                details: "capture.timeout_ms must be >= 1".to_string(),
            });
        }
        let max = self.capture.max_artifacts_per_record;
        if max == 0 || max > MAX_ARTIFACTS_CEILING {
            return Err(ReportError::InvalidConfig {
                details: format!(
                    "capture.max_artifacts_per_record must be in [1, {MAX_ARTIFACTS_CEILING}], got {max}"
                ),
            });
        }
        if self.catalog.default_kind.trim().is_empty() {
            return Err(ReportError::InvalidConfig {
                details: "catalog.default_kind must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
