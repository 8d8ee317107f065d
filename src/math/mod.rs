//! Mathematical utilities: 1-D interpolation and geodesic distance.

pub mod geo;
pub mod interp;

pub use geo::*;
pub use interp::*;
