//! Report model and persistence: records, catalog, per-worker registry, sinks.

pub mod catalog;
pub mod record;
pub mod registry;
pub mod render;
pub mod sink;
