//! Service layer
//!
//! Side-effecting work that sits outside the pure pipeline, kept apart from
//! HTTP handlers so it can be tested on its own.

pub mod export;

pub use export::{ExportError, ExportService, ExportSummary};
