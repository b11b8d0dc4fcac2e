//! Single-threaded CPU executor.
//!
//! Runs evolve, five synthesis transforms and the normalizer in order on the
//! calling thread. All scratch grids live only for the duration of one call.
//! [`surface_at`] evaluates the same sum at any tile-local point instead.

use glam::Vec2;
use num_complex::Complex32;

use super::evolution::{evolve, evolve_cell};
use super::normalize::{corrected_sample, normalize, SurfaceFields, SurfaceSample};
use super::spectrum::{gaussian_draws, spectral_samples, wave_vector, SpectralSample};
use super::SimulationBackend;
use crate::error::{OceanError, Result};
use crate::fft::{dft, FftEngine};
use crate::params::{OceanConfig, WaveParams};

/// How the sequential executor turns spectra into spatial fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Butterfly network, O(N² log N)
    Fft,
    /// Direct summation, O(N⁴); reference only
    DirectDft,
}

pub struct SequentialEngine {
    params: WaveParams,
    draws: Vec<Vec2>,
    samples: Vec<SpectralSample>,
    engine: FftEngine,
    mode: SynthesisMode,
}

impl SequentialEngine {
    /// Validate `config`, draw the random field and precompute H₀ pairs
    pub fn new(config: &OceanConfig) -> Result<Self> {
        config.validate()?;
        let params = config.wave_params();
        let draws = gaussian_draws(config.n, config.seed);
        let samples = spectral_samples(&draws, &params);

        Ok(Self {
            params,
            draws,
            samples,
            engine: FftEngine::new(config.n)?,
            mode: SynthesisMode::Fft,
        })
    }

    pub fn with_mode(mut self, mode: SynthesisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> SynthesisMode {
        self.mode
    }

    /// Precomputed spectral pairs, row-major
    pub fn samples(&self) -> &[SpectralSample] {
        &self.samples
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    /// Surface at `time` (seconds, used as given)
    pub fn step(&self, time: f32) -> Result<SurfaceFields> {
        let params = self.params.at_time(time);
        let spectra = evolve(&self.samples, time, &params)?;

        let spatial = match self.mode {
            SynthesisMode::Fft => spectra.try_map(|grid| self.engine.synthesize(grid))?,
            SynthesisMode::DirectDft => spectra.try_map(|grid| Ok(dft::synthesize(grid)))?,
        };

        normalize(&spatial, &params)
    }

    /// Surface at tile-local `location` and `time` (seconds, used as given)
    pub fn surface_at(&self, location: Vec2, time: f32) -> Result<SurfaceSample> {
        surface_at(&self.samples, location, time, &self.params.at_time(time))
    }
}

/// Surface at an arbitrary tile-local point by direct summation, O(N²).
///
/// Sums `H(k, t)·e^{i k·location}` over every wave vector for all five
/// fields, then scales like [`normalize`]. At
/// [`lattice_position`](super::spectrum::lattice_position) this reproduces
/// the synthesized cell.
pub fn surface_at(
    samples: &[SpectralSample],
    location: Vec2,
    time: f32,
    params: &WaveParams,
) -> Result<SurfaceSample> {
    let n = params.n as usize;
    if samples.len() != n * n {
        return Err(OceanError::GridMismatch {
            expected: n * n,
            actual: samples.len(),
        });
    }
    if !(location.is_finite() && time.is_finite()) {
        return Err(OceanError::invalid(format!(
            "surface query needs a finite location and time, got {location} at {time}"
        )));
    }

    let mut sums = [Complex32::new(0.0, 0.0); 5];
    for z in 0..n {
        for x in 0..n {
            let k = wave_vector(x, z, params);
            let cell = evolve_cell(samples[z * n + x], k, time, params);
            let phase = Complex32::cis(k.dot(location));

            let fields = [cell.height, cell.slope_x, cell.slope_z, cell.dx, cell.dz];
            for (sum, value) in sums.iter_mut().zip(fields) {
                *sum += value * phase;
            }
        }
    }

    Ok(corrected_sample(sums, 1.0, params))
}

impl SimulationBackend for SequentialEngine {
    fn name(&self) -> &'static str {
        match self.mode {
            SynthesisMode::Fft => "sequential",
            SynthesisMode::DirectDft => "sequential (direct DFT)",
        }
    }

    fn simulate(&mut self, time: f32) -> Result<SurfaceFields> {
        self.step(time)
    }

    fn update_spectrum(&mut self, params: &WaveParams) -> Result<()> {
        self.samples = spectral_samples(&self.draws, params);
        self.params = *params;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocean::spectrum::lattice_position;

    fn config() -> OceanConfig {
        OceanConfig {
            n: 16,
            wave_length: 16.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_step_is_repeatable() {
        let engine = SequentialEngine::new(&config()).unwrap();
        assert_eq!(engine.step(1.25).unwrap(), engine.step(1.25).unwrap());
    }

    #[test]
    fn test_direct_dft_agrees() {
        let fft = SequentialEngine::new(&config()).unwrap();
        let direct = SequentialEngine::new(&config())
            .unwrap()
            .with_mode(SynthesisMode::DirectDft);

        let a = fft.step(3.0).unwrap();
        let b = direct.step(3.0).unwrap();
        let (lo, hi) = b.min_max_height();
        let scale = lo.abs().max(hi.abs()).max(1.0);

        for (x, y) in a.samples().iter().zip(b.samples()) {
            assert!((x.height - y.height).abs() <= 1e-4 * scale);
            assert!((x.dx - y.dx).abs() <= 1e-4 * scale);
            assert!((x.normal - y.normal).length() <= 1e-4);
        }
    }

    #[test]
    fn test_step_repeats_after_period() {
        let config = config();
        let engine = SequentialEngine::new(&config).unwrap();

        let start = engine.step(0.0).unwrap();
        let end = engine.step(config.period_time).unwrap();
        let later = engine.step(3.3).unwrap();

        let (lo, hi) = start.min_max_height();
        let amplitude = lo.abs().max(hi.abs());
        let scale = amplitude.max(1.0);
        for (a, b) in start.samples().iter().zip(end.samples()) {
            assert!((a.height - b.height).abs() <= 1e-4 * scale);
            assert!((a.dx - b.dx).abs() <= 1e-4 * scale);
            assert!((a.dz - b.dz).abs() <= 1e-4 * scale);
        }

        // Inside the period the field does move
        let moved = start
            .samples()
            .iter()
            .zip(later.samples())
            .map(|(a, b)| (a.height - b.height).abs())
            .fold(0.0f32, f32::max);
        assert!(moved > 0.1 * amplitude, "max change {moved}");
    }

    #[test]
    fn test_surface_at_lattice_matches_step() {
        let engine = SequentialEngine::new(&config()).unwrap();
        let params = *engine.params();
        let time = 2.7;
        let surface = engine.step(time).unwrap();

        let (lo, hi) = surface.min_max_height();
        let scale = lo.abs().max(hi.abs()).max(1.0);

        for (x, z) in [(0, 0), (1, 0), (0, 3), (5, 9), (8, 8), (15, 15)] {
            let location = lattice_position(x, z, &params);
            let point = engine.surface_at(location, time).unwrap();
            let cell = surface.sample(x, z);

            assert!((point.height - cell.height).abs() <= 1e-3 * scale);
            assert!((point.dx - cell.dx).abs() <= 1e-3 * scale);
            assert!((point.dz - cell.dz).abs() <= 1e-3 * scale);
            assert!((point.normal - cell.normal).length() <= 1e-3);
        }
    }

    #[test]
    fn test_surface_at_between_cells() {
        let engine = SequentialEngine::new(&config()).unwrap();
        let params = *engine.params();
        let a = lattice_position(3, 4, &params);
        let b = lattice_position(4, 4, &params);
        let middle = (a + b) / 2.0;

        let point = engine.surface_at(middle, 1.0).unwrap();
        assert!(point.height.is_finite());
        assert!((point.normal.length() - 1.0).abs() < 1e-5);

        // One tile over is the same water
        let shifted = engine
            .surface_at(middle + Vec2::new(params.wave_length, 0.0), 1.0)
            .unwrap();
        assert!((point.height - shifted.height).abs() <= 1e-3);
    }

    #[test]
    fn test_surface_at_rejects_bad_input() {
        let engine = SequentialEngine::new(&config()).unwrap();
        assert!(matches!(
            engine.surface_at(Vec2::ZERO, f32::NAN),
            Err(OceanError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.surface_at(Vec2::new(f32::INFINITY, 0.0), 1.0),
            Err(OceanError::InvalidArgument(_))
        ));
        assert!(matches!(
            surface_at(&engine.samples()[..3], Vec2::ZERO, 1.0, engine.params()),
            Err(OceanError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_update_spectrum_keeps_draws() {
        let config = config();
        let mut engine = SequentialEngine::new(&config).unwrap();
        let before = engine.samples().to_vec();

        let calmer = OceanConfig {
            wind_speed: 4.0,
            ..config.clone()
        };
        engine.update_spectrum(&calmer.wave_params()).unwrap();
        assert_ne!(engine.samples(), &before[..]);

        engine.update_spectrum(&config.wave_params()).unwrap();
        assert_eq!(engine.samples(), &before[..]);
    }
}
