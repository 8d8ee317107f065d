//! Reporting utilities: per-period statistics and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the QC/gridding code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

pub mod format;

pub use format::*;
