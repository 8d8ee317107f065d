//! Signal processing for waveform preparation.
//!
//! - zero-phase lowpass filtering (`filter`)
//! - decimation and Lanczos resampling (`resample`)
//! - instrument-response deconvolution (`response`)

pub mod filter;
pub mod resample;
pub mod response;

pub use filter::*;
pub use resample::*;
pub use response::*;
