//! Per-run state shared by every listener callback.

use parking_lot::Mutex;

use crate::capture::ArtifactCapturer;
use crate::core::config::ReporterConfig;
use crate::core::errors::Result;
use crate::journal::{JournalEvent, JournalWriter};
use crate::report::catalog::DescriptionCatalog;
use crate::report::registry::TestContextRegistry;
use crate::report::sink::ReportSinks;

/// Everything one run of the reporter owns. Build one per run and hand it to
/// [`EventListener::new`](crate::listener::EventListener::new).
#[derive(Debug)]
pub struct RunContext {
    config: ReporterConfig,
    catalog: DescriptionCatalog,
    registry: TestContextRegistry,
    sinks: ReportSinks,
    capturer: ArtifactCapturer,
    journal: Option<Mutex<JournalWriter>>,
}

impl RunContext {
    /// Validate `config` and build the run's collaborators from it.
    pub fn new(config: ReporterConfig) -> Result<Self> {
        config.validate()?;
        let catalog = DescriptionCatalog::from_config(&config.catalog);
        Ok(Self::with_catalog(config, catalog))
    }

    /// Like [`RunContext::new`] but with a caller-supplied catalog.
    ///
    /// Does not re-validate `config`.
    #[must_use]
    pub fn with_catalog(config: ReporterConfig, catalog: DescriptionCatalog) -> Self {
        let capturer = ArtifactCapturer::from_config(&config.output.root, &config.capture);
        let sinks = ReportSinks::new(config.output.clone());
        let journal = config.journal.enabled.then(|| {
            Mutex::new(JournalWriter::open(
                config.journal.effective_path(&config.output.root),
            ))
        });
        Self {
            config,
            catalog,
            registry: TestContextRegistry::new(),
            sinks,
            capturer,
            journal,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ReporterConfig {
        &self.config
    }

    #[must_use]
    pub const fn catalog(&self) -> &DescriptionCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn registry(&self) -> &TestContextRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn sinks(&self) -> &ReportSinks {
        &self.sinks
    }

    #[must_use]
    pub const fn capturer(&self) -> &ArtifactCapturer {
        &self.capturer
    }

    pub(crate) fn journal(&self, event: JournalEvent) {
        if let Some(journal) = &self.journal {
            journal.lock().write_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JournalEventKind, read_journal};

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = ReporterConfig::default();
        config.capture.timeout_ms = 0;
        assert_eq!(RunContext::new(config).unwrap_err().code(), "TRR-1001");
    }

    #[test]
    fn catalog_follows_config() {
        let mut config = ReporterConfig::default();
        config.catalog.default_kind = "Mobile".to_string();
        let ctx = RunContext::new(config).unwrap();
        assert_eq!(ctx.catalog().lookup("Nope"), "Mobile test: Nope");
    }

    #[test]
    fn journal_only_written_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReporterConfig::with_root(dir.path());
        let off = RunContext::new(config.clone()).unwrap();
        off.journal(JournalEvent::suite(JournalEventKind::SuiteStart, "Cart"));
        assert!(!dir.path().join("journal.jsonl").exists());

        config.journal.enabled = true;
        let on = RunContext::new(config).unwrap();
        on.journal(JournalEvent::suite(JournalEventKind::SuiteStart, "Cart"));
        assert_eq!(read_journal(&dir.path().join("journal.jsonl")).unwrap().len(), 1);
    }
}
