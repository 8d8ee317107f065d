//! ASCII plotting of dispersion curves.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests and alert files)
//!
//! Plot elements:
//! - raw picks: `-` polyline through (freq, time)
//! - interpolated grid points: `o` overlay

use crate::domain::{DispersionCurve, GridAlert};

/// Render a curve: raw picks as a line, interpolated points on top.
pub fn render_curve_plot(curve: &DispersionCurve, width: usize, height: usize) -> String {
    let raw: Vec<(f64, f64)> = curve
        .freq
        .iter()
        .zip(&curve.time)
        .map(|(&f, &t)| (f, t))
        .collect();
    let overlay: Vec<(f64, f64)> = curve
        .interp
        .as_ref()
        .map(|i| i.freqs.iter().zip(&i.times).map(|(&f, &t)| (f, t)).collect())
        .unwrap_or_default();
    render(&curve.name, &raw, &overlay, width, height)
}

/// Render the alert figure for a non-monotonic frequency array.
pub fn render_alert_plot(alert: &GridAlert, width: usize, height: usize) -> String {
    let raw: Vec<(f64, f64)> = alert
        .freq
        .iter()
        .zip(&alert.time)
        .map(|(&f, &t)| (f, t))
        .collect();
    let overlay: Vec<(f64, f64)> = alert
        .interp_freqs
        .iter()
        .zip(&alert.interp_times)
        .map(|(&f, &t)| (f, t))
        .collect();
    render(&alert.name, &raw, &overlay, width, height)
}

fn render(
    title: &str,
    raw: &[(f64, f64)],
    overlay: &[(f64, f64)],
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = axis_range(raw.iter().chain(overlay).map(|&(x, _)| x)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = axis_range(raw.iter().chain(overlay).map(|&(_, y)| y)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    draw_polyline(&mut grid, raw, x_min, x_max, y_min, y_max);
    for &(x, y) in overlay {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{title}: freq=[{x_min:.4}, {x_max:.4}] Hz | time=[{y_min:.1}, {y_max:.1}] s\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn axis_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_polyline(
    grid: &mut [Vec<char>],
    points: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InterpCurve;

    #[test]
    fn plot_golden_snapshot_small() {
        let mut curve = DispersionCurve::new(
            "AAA_BBB_HHZ_HHZ",
            vec![0.1, 0.5],
            vec![10.0, 20.0],
            vec![60.0, 60.0],
        );
        curve.interp = Some(InterpCurve {
            freqs: vec![0.1],
            periods: vec![10.0],
            times: vec![10.0],
            vels: vec![6.0],
        });

        let txt = render_curve_plot(&curve, 10, 5);
        let expected = concat!(
            "AAA_BBB_HHZ_HHZ: freq=[0.1000, 0.5000] Hz | time=[9.5, 20.5] s\n",
            "        --\n",
            "      --  \n",
            "    --    \n",
            "  --      \n",
            "o-        \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn alert_plot_is_deterministic() {
        let alert = GridAlert {
            name: "AAA_BBB_HHZ_HHZ".to_string(),
            freq: vec![0.1, 0.3, 0.2, 0.5],
            time: vec![30.0, 25.0, 26.0, 20.0],
            interp_freqs: vec![0.2, 0.4],
            interp_times: vec![26.0, 22.0],
        };
        let a = render_alert_plot(&alert, 40, 12);
        let b = render_alert_plot(&alert, 40, 12);
        assert_eq!(a, b);
        assert!(a.contains('o'));
        assert!(a.starts_with("AAA_BBB_HHZ_HHZ:"));
    }
}
