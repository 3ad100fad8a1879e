//! Top-level CLI definition and dispatch.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use testrun_report::core::config::ReporterConfig;
use testrun_report::core::errors::{ReportError, Result};
use testrun_report::journal::{JournalEvent, JournalEventKind, read_journal};
use testrun_report::listener::{EventListener, FailureInfo, RunContext, TestLifecycle, TestStart};
use testrun_report::report::catalog::DescriptionCatalog;
use testrun_report::report::registry::WorkerId;
use testrun_report::report::sink::FlushOutcome;

/// Test-run reporter: rebuild and inspect suite reports.
#[derive(Debug, Parser)]
#[command(
    name = "trr",
    author,
    version,
    about = "Test-run reporter - suite reports from lifecycle journals",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Reporter config file (TOML).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (warnings and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Rebuild suite reports from a lifecycle journal.
    Replay(ReplayArgs),
    /// Print the effective configuration as TOML.
    Config,
    /// Print catalog descriptions for test identifiers.
    Describe(DescribeArgs),
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Journal file written with `[journal] enabled = true`.
    journal: PathBuf,
    /// Output root for the rebuilt reports (defaults to the configured root).
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct DescribeArgs {
    /// Test identifiers to look up.
    #[arg(required = true)]
    test_ids: Vec<String>,
}

/// Execute the parsed command.
pub fn run(cli: &Cli) -> Result<()> {
    init_tracing(cli);
    let config = ReporterConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Replay(args) => {
            for path in replay(config, &args.journal, args.out.as_deref())? {
                println!("{}", path.display());
            }
        }
        Command::Config => print!("{}", config.to_toml_string()?),
        Command::Describe(args) => {
            let catalog = DescriptionCatalog::from_config(&config.catalog);
            for id in &args.test_ids {
                println!("{id}\t{}", catalog.lookup(id));
            }
        }
    }
    Ok(())
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Drive a fresh listener with the journal's events; returns written report paths.
fn replay(mut config: ReporterConfig, journal: &Path, out: Option<&Path>) -> Result<Vec<PathBuf>> {
    if let Some(out) = out {
        config.output.root = out.to_path_buf();
    }
    // Never append to the journal being replayed.
    config.journal.enabled = false;

    let events = read_journal(journal)?;
    let listener = EventListener::new(RunContext::new(config)?);
    let mut written = Vec::new();

    for event in events {
        if let Some(path) = apply(&listener, event)? {
            written.push(path);
        }
    }

    // Suites whose finish event never made it into the journal.
    for sink in listener.context().sinks().all() {
        if let FlushOutcome::Written { path, .. } = sink.flush()? {
            tracing::warn!(suite = sink.suite(), "journal ended before suite finished");
            written.push(path);
        }
    }
    Ok(written)
}

fn apply(listener: &EventListener, event: JournalEvent) -> Result<Option<PathBuf>> {
    let worker = event.worker.unwrap_or_else(|| WorkerId::new(0));
    let test_id = || {
        event.test_id.clone().ok_or_else(|| ReportError::Serialization {
            context: "journal",
            details: format!("{:?} event without test_id", event.event),
        })
    };
    let message = event.message.clone().unwrap_or_default();

    match event.event {
        JournalEventKind::SuiteStart => listener.on_suite_start(&event.suite)?,
        JournalEventKind::TestStart => {
            listener.on_test_start(worker, TestStart::new(&event.suite, test_id()?));
        }
        JournalEventKind::TestPass => listener.on_test_pass(worker, &test_id()?),
        JournalEventKind::TestFail => {
            listener.on_test_fail(worker, &test_id()?, &FailureInfo::new(message));
        }
        JournalEventKind::TestSkip => listener.on_test_skip(worker, &test_id()?, &message),
        JournalEventKind::SuiteFinish => {
            if let FlushOutcome::Written { path, .. } = listener.on_suite_finish(&event.suite)? {
                return Ok(Some(path));
            }
        }
    }
    Ok(None)
}
