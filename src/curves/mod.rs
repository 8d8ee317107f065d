//! Dispersion-curve post-processing.
//!
//! The pipeline stages live here:
//!
//! - quality control (`qc`): per-sample masks + minimum-length culling
//! - period gridding (`grid`): interpolation onto the canonical grid
//! - exporters (`export`): input decks for the two tomography codes

pub mod export;
pub mod grid;
pub mod qc;

pub use export::*;
pub use grid::*;
pub use qc::*;
