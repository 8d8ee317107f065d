//! Input/output helpers.
//!
//! One module per file format:
//!
//! - aFTAN result files (`aftan`)
//! - xdc instantaneous-frequency pick files (`xdc`)
//! - SAC pole-zero files (`sacpz`) and StationXML catalogs (`stationxml`)
//! - pair / minimum-frequency CSV tables (`pairs`)
//! - GMT-style multi-segment coordinate files (`segments`)
//! - miniSEED waveforms (`mseed`)
//! - curve-set JSON read/write (`curveset`)

pub mod aftan;
pub mod curveset;
pub mod mseed;
pub mod pairs;
pub mod sacpz;
pub mod segments;
pub mod stationxml;
pub mod xdc;

pub use aftan::*;
pub use curveset::*;
pub use mseed::*;
pub use pairs::*;
pub use sacpz::*;
pub use segments::*;
pub use stationxml::*;
pub use xdc::*;
