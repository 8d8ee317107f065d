//! Data acquisition: FDSN station metadata and synthetic demo datasets.

pub mod fdsn;
pub mod synth;

pub use fdsn::*;
pub use synth::*;
