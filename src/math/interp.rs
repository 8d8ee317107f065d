//! Piecewise-linear interpolation over a sampled curve.
//!
//! Semantics match the classic array-library `interp`: sample points `xp`
//! are assumed increasing, queries are located by binary search, and
//! queries outside `[xp[0], xp[last]]` clamp to the edge values. Callers
//! that need strict in-range behavior filter their queries first (the
//! period-grid stage does exactly that).

/// Interpolate `x` against the sampled curve `(xp, fp)`.
///
/// Returns NaN when the curve is empty or lengths mismatch; a single
/// sample acts as a constant.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if xp.is_empty() || xp.len() != fp.len() {
        return f64::NAN;
    }
    if xp.len() == 1 {
        return fp[0];
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[xp.len() - 1] {
        return fp[fp.len() - 1];
    }

    // partition_point: first index with xp[i] > x, so the bracketing
    // segment is [hi-1, hi].
    let hi = xp.partition_point(|&v| v <= x);
    let lo = hi - 1;

    let dx = xp[hi] - xp[lo];
    if dx == 0.0 {
        return fp[lo];
    }
    let u = (x - xp[lo]) / dx;
    fp[lo] + u * (fp[hi] - fp[lo])
}

/// Vectorized form of [`interp`].
pub fn interp_many(xs: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| interp(x, xp, fp)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_samples() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 10.0, 40.0];
        assert!((interp(0.5, &xp, &fp) - 5.0).abs() < 1e-12);
        assert!((interp(1.5, &xp, &fp) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn hits_samples_exactly() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [3.0, 7.0, 9.0];
        for (x, f) in xp.iter().zip(fp.iter()) {
            assert!((interp(*x, &xp, &fp) - f).abs() < 1e-12);
        }
    }

    #[test]
    fn clamps_outside_range() {
        let xp = [1.0, 2.0];
        let fp = [5.0, 6.0];
        assert!((interp(0.0, &xp, &fp) - 5.0).abs() < 1e-12);
        assert!((interp(3.0, &xp, &fp) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(interp(1.0, &[], &[]).is_nan());
        assert!((interp(1.0, &[2.0], &[8.0]) - 8.0).abs() < 1e-12);
    }
}
