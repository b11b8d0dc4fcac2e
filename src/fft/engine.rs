//! Radix-2 Cooley-Tukey transforms over lines and grids.
//!
//! Every operation returns a new buffer; inputs are never mutated. Stage
//! scratch is local to one call, so an engine can be shared freely.

use std::sync::Arc;

use num_complex::Complex32;

use super::grid::ComplexGrid;
use super::plan::{Direction, FftPlan};
use crate::error::{OceanError, Result};

/// Which 1D lines of a grid a pass transforms
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Each row (constant z, varying x)
    Rows,
    /// Each column (constant x, varying z)
    Columns,
}

/// Output reordering applied after the last butterfly stage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unshuffle {
    /// Natural DFT ordering
    None,
    /// Swap the two halves so frequency index N/2 maps to the tile center
    Centered,
    /// `Centered` followed by mirroring the negative frequencies (p -> N - p)
    Mirrored,
}

impl Unshuffle {
    /// Position in the final stage output that lands at `position`
    pub fn source(self, position: usize, n: usize) -> usize {
        match self {
            Unshuffle::None => position,
            Unshuffle::Centered => (position + n / 2) % n,
            Unshuffle::Mirrored => (n + n / 2 - position) % n,
        }
    }
}

/// Unshuffle applied by the last stage of a synthesis pass along `axis`.
///
/// Column (vertical) passes also mirror the negative frequencies.
pub fn synthesis_unshuffle(axis: Axis) -> Unshuffle {
    match axis {
        Axis::Columns => Unshuffle::Mirrored,
        Axis::Rows => Unshuffle::Centered,
    }
}

/// One decimation-in-time stage: combines pairs `2^stage` apart.
pub fn fft_stage(
    input: &[Complex32],
    plan: &FftPlan,
    stage: usize,
    direction: Direction,
) -> Vec<Complex32> {
    let n = plan.n();
    let half = 1usize << stage;
    let size = half * 2;
    let mut output = vec![Complex32::new(0.0, 0.0); n];

    for block in (0..n).step_by(size) {
        for k in 0..half {
            let even = input[block + k];
            let odd = input[block + k + half] * plan.twiddle(stage, k, direction);
            output[block + k] = even + odd;
            output[block + k + half] = even - odd;
        }
    }

    output
}

/// Unnormalized 1D transform of one line
pub fn transform_line(
    line: &[Complex32],
    plan: &FftPlan,
    direction: Direction,
    unshuffle: Unshuffle,
) -> Vec<Complex32> {
    let n = plan.n();
    let mut buffer: Vec<Complex32> = plan.reversed().iter().map(|&r| line[r]).collect();

    for stage in 0..plan.log2_n() {
        buffer = fft_stage(&buffer, plan, stage, direction);
    }

    (0..n).map(|p| buffer[unshuffle.source(p, n)]).collect()
}

/// Separable 2D transforms over N×N grids.
///
/// Two-pass transforms always run columns first, then rows.
#[derive(Debug, Clone)]
pub struct FftEngine {
    plan: Arc<FftPlan>,
}

impl FftEngine {
    /// Engine with a fresh plan for `n`. Fails unless `n` is a power of two.
    pub fn new(n: usize) -> Result<Self> {
        Ok(Self {
            plan: Arc::new(FftPlan::new(n)?),
        })
    }

    pub fn from_plan(plan: Arc<FftPlan>) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &Arc<FftPlan> {
        &self.plan
    }

    /// Transform every row or every column of `grid` into a new grid
    pub fn transform(
        &self,
        grid: &ComplexGrid,
        axis: Axis,
        direction: Direction,
        unshuffle: Unshuffle,
    ) -> Result<ComplexGrid> {
        let n = self.plan.n();
        if grid.n() != n {
            return Err(OceanError::GridMismatch {
                expected: n,
                actual: grid.n(),
            });
        }

        let mut output = ComplexGrid::zeros(n);
        match axis {
            Axis::Rows => {
                for z in 0..n {
                    let line = transform_line(grid.row(z), &self.plan, direction, unshuffle);
                    output.set_row(z, &line);
                }
            }
            Axis::Columns => {
                for x in 0..n {
                    let line = transform_line(&grid.column(x), &self.plan, direction, unshuffle);
                    output.set_column(x, &line);
                }
            }
        }
        Ok(output)
    }

    /// Unnormalized forward 2D DFT (e^{-2πi})
    pub fn forward(&self, grid: &ComplexGrid) -> Result<ComplexGrid> {
        let columns = self.transform(grid, Axis::Columns, Direction::Forward, Unshuffle::None)?;
        self.transform(&columns, Axis::Rows, Direction::Forward, Unshuffle::None)
    }

    /// Inverse 2D DFT scaled by 1/N², so `inverse(forward(x)) == x`
    pub fn inverse(&self, grid: &ComplexGrid) -> Result<ComplexGrid> {
        let columns = self.transform(grid, Axis::Columns, Direction::Inverse, Unshuffle::None)?;
        let mut output = self.transform(&columns, Axis::Rows, Direction::Inverse, Unshuffle::None)?;

        let scale = 1.0 / (self.plan.n() * self.plan.n()) as f32;
        for cell in output.cells_mut() {
            *cell = *cell * scale;
        }
        Ok(output)
    }

    /// Unnormalized inverse transform of a centered spectrum into spatial order.
    ///
    /// The column pass mirrors negative frequencies, the row pass only
    /// re-centers. The result still carries the checkerboard sign that the
    /// normalizer removes.
    pub fn synthesize(&self, spectrum: &ComplexGrid) -> Result<ComplexGrid> {
        let columns = self.transform(
            spectrum,
            Axis::Columns,
            Direction::Inverse,
            synthesis_unshuffle(Axis::Columns),
        )?;
        self.transform(
            &columns,
            Axis::Rows,
            Direction::Inverse,
            synthesis_unshuffle(Axis::Rows),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::dft;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rustfft::FftPlanner;

    fn random_grid(n: usize, seed: u64) -> ComplexGrid {
        let mut rng = StdRng::seed_from_u64(seed);
        ComplexGrid::from_fn(n, |_, _| {
            Complex32::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        })
    }

    fn assert_grids_close(actual: &ComplexGrid, expected: &ComplexGrid, tolerance: f32) {
        let scale = expected.max_norm().max(1.0);
        for (a, e) in actual.cells().iter().zip(expected.cells()) {
            assert!(
                (a - e).norm() <= tolerance * scale,
                "{a} differs from {e} (scale {scale})"
            );
        }
    }

    #[test]
    fn test_round_trip() {
        for (seed, n) in [4usize, 8, 16, 64].into_iter().enumerate() {
            let engine = FftEngine::new(n).unwrap();
            let grid = random_grid(n, seed as u64);

            let restored = engine.inverse(&engine.forward(&grid).unwrap()).unwrap();
            assert_grids_close(&restored, &grid, 1e-4);
        }
    }

    #[test]
    fn test_matches_direct_dft() {
        for n in [2usize, 4, 8, 16] {
            let engine = FftEngine::new(n).unwrap();
            let grid = random_grid(n, 7 + n as u64);

            assert_grids_close(
                &engine.forward(&grid).unwrap(),
                &dft::transform(&grid, Direction::Forward),
                1e-5,
            );
            let unnormalized = engine
                .transform(
                    &engine
                        .transform(&grid, Axis::Columns, Direction::Inverse, Unshuffle::None)
                        .unwrap(),
                    Axis::Rows,
                    Direction::Inverse,
                    Unshuffle::None,
                )
                .unwrap();
            assert_grids_close(&unnormalized, &dft::transform(&grid, Direction::Inverse), 1e-5);
        }
    }

    #[test]
    fn test_synthesis_matches_direct_sum() {
        for n in [4usize, 8, 16] {
            let engine = FftEngine::new(n).unwrap();
            let spectrum = random_grid(n, 100 + n as u64);

            assert_grids_close(
                &engine.synthesize(&spectrum).unwrap(),
                &dft::synthesize(&spectrum),
                1e-5,
            );
        }
    }

    #[test]
    fn test_rows_match_rustfft() {
        let n = 32;
        let engine = FftEngine::new(n).unwrap();
        let grid = random_grid(n, 3);
        let ours = engine
            .transform(&grid, Axis::Rows, Direction::Forward, Unshuffle::None)
            .unwrap();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        for z in 0..n {
            let mut expected = grid.row(z).to_vec();
            fft.process(&mut expected);
            for (a, e) in ours.row(z).iter().zip(&expected) {
                assert_relative_eq!(a.re, e.re, epsilon = 1e-4);
                assert_relative_eq!(a.im, e.im, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_unshuffle_matches_swap_sequence() {
        let n = 8;
        let values: Vec<usize> = (0..n).collect();

        // Half swap, then mirror swap of k and N - k
        let mut swapped = values.clone();
        for k in 0..n / 2 {
            swapped.swap(k, k + n / 2);
        }
        let centered = swapped.clone();
        for k in 1..n / 2 {
            swapped.swap(k, n - k);
        }

        for p in 0..n {
            assert_eq!(values[Unshuffle::Centered.source(p, n)], centered[p]);
            assert_eq!(values[Unshuffle::Mirrored.source(p, n)], swapped[p]);
            assert_eq!(Unshuffle::None.source(p, n), p);
        }
    }

    #[test]
    fn test_butterfly_table_reproduces_stages() {
        let n = 16;
        let plan = FftPlan::new(n).unwrap();
        let line = random_grid(n, 11).row(0).to_vec();

        let expected = transform_line(&line, &plan, Direction::Inverse, Unshuffle::None);

        let mut current = line;
        for stage in 0..plan.log2_n() {
            current = (0..n)
                .map(|p| {
                    let entry = plan.butterfly_entry(stage, p);
                    current[entry.a] + current[entry.b] * entry.twiddle
                })
                .collect();
        }

        assert_eq!(current, expected);
    }

    #[test]
    fn test_rejects_mismatched_grid() {
        let engine = FftEngine::new(8).unwrap();
        assert!(matches!(
            engine.forward(&ComplexGrid::zeros(4)),
            Err(OceanError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_single_sample() {
        let engine = FftEngine::new(1).unwrap();
        let grid = ComplexGrid::from_fn(1, |_, _| Complex32::new(2.0, -1.0));
        assert_eq!(engine.synthesize(&grid).unwrap(), grid);
    }
}
