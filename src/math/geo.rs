//! Great-circle distance between station coordinates.

/// Mean Earth radius (km), IUGG value.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two (lat, lon) points in degrees.
pub fn gc_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlam = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlam / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert!(gc_distance_km(52.5, 13.4, 52.5, 13.4).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude() {
        // 1 degree of latitude is ~111.19 km on a 6371 km sphere.
        let d = gc_distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.05, "got {d}");
    }

    #[test]
    fn symmetric() {
        let d1 = gc_distance_km(10.0, 20.0, -5.0, 40.0);
        let d2 = gc_distance_km(-5.0, 40.0, 10.0, 20.0);
        assert!((d1 - d2).abs() < 1e-9);
    }
}
