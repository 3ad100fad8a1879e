#![forbid(unsafe_code)]

//! testrun_report (trr): reporting pipeline for concurrently executing UI test suites.
//!
//! The external runner drives an [`EventListener`](listener::EventListener)
//! through suite and test lifecycle callbacks. The listener:
//! 1. **Tracks the active test per worker**: one live record per execution slot
//! 2. **Captures screenshots best-effort**: bounded by a timeout, never failing the test call
//! 3. **Persists one report per suite**: sorted, written exactly once
//!
//! # Library usage
//!
//! ```rust,no_run
//! use testrun_report::prelude::*;
//!
//! let ctx = RunContext::new(ReporterConfig::with_root("test-output"))?;
//! let listener = EventListener::new(ctx);
//! let worker = WorkerId::current();
//!
//! listener.on_suite_start("Cart")?;
//! listener.on_test_start(worker, TestStart::new("Cart", "AddItem"));
//! listener.on_test_pass(worker, "AddItem");
//! listener.on_suite_finish("Cart")?;
//! # Ok::<(), ReportError>(())
//! ```

pub mod prelude;

pub mod capture;
pub mod core;
pub mod journal;
pub mod listener;
pub mod report;
