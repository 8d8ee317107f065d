//! Deterministic ASCII plotting for terminals and alert files.

pub mod ascii;

pub use ascii::*;
