//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - dispersion curves and their interpolated form (`DispersionCurve`)
//! - the pair metadata table (`PairTable`, `PairInfo`)
//! - instrument responses (`PolesZeros`)
//! - waveform traces (`Trace`, `TraceData`)
//! - run configuration (`RunConfig`, `QcConfig`)

pub mod trace;
pub mod types;

pub use trace::*;
pub use types::*;
