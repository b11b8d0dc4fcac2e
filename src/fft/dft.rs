//! Direct O(N²)-per-point DFT.
//!
//! Slow on purpose: every output is an explicit sum with twiddles taken from
//! `exp` directly, accumulated in f64. Used as a correctness oracle for the
//! butterfly engine on small grids.

use std::f64::consts::TAU;

use num_complex::{Complex32, Complex64};

use super::grid::ComplexGrid;
use super::plan::Direction;

fn sign(direction: Direction) -> f64 {
    match direction {
        Direction::Forward => -1.0,
        Direction::Inverse => 1.0,
    }
}

fn narrow(value: Complex64) -> Complex32 {
    Complex32::new(value.re as f32, value.im as f32)
}

fn widen(value: Complex32) -> Complex64 {
    Complex64::new(value.re as f64, value.im as f64)
}

/// Unnormalized 1D DFT of one line
pub fn transform_line(line: &[Complex32], direction: Direction) -> Vec<Complex32> {
    let n = line.len();
    let s = sign(direction);

    (0..n)
        .map(|k| {
            let sum: Complex64 = line
                .iter()
                .enumerate()
                .map(|(j, &value)| {
                    let angle = s * TAU * ((j * k) % n) as f64 / n as f64;
                    widen(value) * Complex64::from_polar(1.0, angle)
                })
                .sum();
            narrow(sum)
        })
        .collect()
}

/// Unnormalized 2D DFT: `out(u, v) = Σ g(x, z)·e^{±2πi(ux + vz)/N}`
pub fn transform(grid: &ComplexGrid, direction: Direction) -> ComplexGrid {
    let n = grid.n();
    let s = sign(direction);

    ComplexGrid::from_fn(n, |u, v| {
        let mut sum = Complex64::new(0.0, 0.0);
        for z in 0..n {
            for x in 0..n {
                let phase = (u * x + v * z) % n;
                let angle = s * TAU * phase as f64 / n as f64;
                sum += widen(grid[(x, z)]) * Complex64::from_polar(1.0, angle);
            }
        }
        narrow(sum)
    })
}

/// Centered synthesis sum evaluated per output point:
/// `out(x, z) = Σ G(u, v)·e^{2πi(u(x + N/2) + v(N/2 − z))/N}`
pub fn synthesize(spectrum: &ComplexGrid) -> ComplexGrid {
    let n = spectrum.n();
    let half = n / 2;

    ComplexGrid::from_fn(n, |x, z| {
        // (N/2 - z) mod N, kept non-negative
        let row_shift = (n + half - z) % n;
        let column_shift = (x + half) % n;

        let mut sum = Complex64::new(0.0, 0.0);
        for v in 0..n {
            for u in 0..n {
                let phase = (u * column_shift + v * row_shift) % n;
                let angle = TAU * phase as f64 / n as f64;
                sum += widen(spectrum[(u, v)]) * Complex64::from_polar(1.0, angle);
            }
        }
        narrow(sum)
    })
}
