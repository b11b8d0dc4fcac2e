//! Initial spectrum H₀(k) from the Phillips model.
//!
//! Gaussian draws are made once per ocean, row-major with two samples per
//! cell, so every backend starts from the same random field.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use num_complex::Complex32;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::Result;
use crate::fft::ComplexGrid;
use crate::params::{OceanConfig, WaveParams, GRAVITY, SPECTRUM_EPSILON};

/// Wave vector of grid cell `(x, z)`: `(2πx − πN, 2πz − πN) / waveLength`
pub fn wave_vector(x: usize, z: usize, params: &WaveParams) -> Vec2 {
    let n = params.n as f32;
    Vec2::new(TAU * x as f32 - PI * n, TAU * z as f32 - PI * n) / params.wave_length
}

/// Tile-local position of synthesized cell `(x, z)`:
/// `((x − N/2)·L/N, (N/2 − z)·L/N)` with `L = waveLength`.
///
/// A point query at this position reproduces the lattice sample exactly,
/// checkerboard sign included.
pub fn lattice_position(x: usize, z: usize, params: &WaveParams) -> Vec2 {
    let half = params.n as f32 / 2.0;
    let spacing = params.wave_length / params.n as f32;
    Vec2::new((x as f32 - half) * spacing, (half - z as f32) * spacing)
}

/// Phillips spectrum P(k). Zero for |k| below [`SPECTRUM_EPSILON`].
pub fn phillips(k: Vec2, params: &WaveParams) -> f32 {
    let k_length = k.length();
    if k_length < SPECTRUM_EPSILON {
        return 0.0;
    }

    let k_length2 = k_length * k_length;
    let k_length4 = k_length2 * k_length2;

    // Largest wave arising from a continuous wind
    let l = params.wind_speed * params.wind_speed / GRAVITY;
    let l2 = l * l;

    // Suppress waves much smaller than the grid spacing
    let l_min = 0.001 * l;

    let k_dot_w = (k / k_length).dot(params.wind_unit());
    let k_dot_w2 = k_dot_w * k_dot_w;

    params.spectrum_scale * (-1.0 / (k_length2 * l2)).exp() / k_length4
        * k_dot_w2
        * (-k_length2 * l_min * l_min).exp()
}

/// Standard-normal pairs (ξ₁, ξ₂) for every cell, row-major
pub fn gaussian_draws(n: usize, seed: u64) -> Vec<Vec2> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n * n)
        .map(|_| Vec2::new(rng.sample(StandardNormal), rng.sample(StandardNormal)))
        .collect()
}

/// `H₀(k) = (ξ₁ + iξ₂)·sqrt(P(k)/2)`
pub fn height_zero(draw: Vec2, k: Vec2, params: &WaveParams) -> Complex32 {
    Complex32::new(draw.x, draw.y) * (phillips(k, params) / 2.0).sqrt()
}

/// H₀ over the whole grid for the given draws
pub fn height_zero_grid(draws: &[Vec2], params: &WaveParams) -> ComplexGrid {
    let n = params.n as usize;
    ComplexGrid::from_fn(n, |x, z| {
        height_zero(draws[z * n + x], wave_vector(x, z, params), params)
    })
}

/// Validate `config`, draw the random field and build H₀
pub fn generate_initial_spectrum(config: &OceanConfig) -> Result<ComplexGrid> {
    config.validate()?;
    let params = config.wave_params();
    let draws = gaussian_draws(config.n, config.seed);

    log::debug!(
        "Initial spectrum: N = {}, wind speed = {} m/s, seed = {}",
        config.n,
        config.wind_speed,
        config.seed
    );

    Ok(height_zero_grid(&draws, &params))
}

/// Per-cell pair `(H₀(k), conj(H₀(−k)))`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralSample {
    pub h0_k: Complex32,
    pub h0_minus_k_conj: Complex32,
}

impl SpectralSample {
    /// RGBA32F texel layout: (h0_k.re, h0_k.im, h0_minus_k_conj.re, h0_minus_k_conj.im)
    pub fn to_texel(self) -> [f32; 4] {
        [
            self.h0_k.re,
            self.h0_k.im,
            self.h0_minus_k_conj.re,
            self.h0_minus_k_conj.im,
        ]
    }

    pub fn from_texel(texel: [f32; 4]) -> Self {
        Self {
            h0_k: Complex32::new(texel[0], texel[1]),
            h0_minus_k_conj: Complex32::new(texel[2], texel[3]),
        }
    }
}

/// Grid cell holding −k for cell `(x, z)`
pub fn mirror_cell(x: usize, z: usize, n: usize) -> (usize, usize) {
    ((n - x) % n, (n - z) % n)
}

/// Spectral pair for one cell, evaluated straight from the draws
pub fn spectral_sample(
    x: usize,
    z: usize,
    draws: &[Vec2],
    params: &WaveParams,
) -> SpectralSample {
    let n = params.n as usize;
    let (mx, mz) = mirror_cell(x, z, n);

    let h0_k = height_zero(draws[z * n + x], wave_vector(x, z, params), params);
    let h0_minus_k = height_zero(draws[mz * n + mx], wave_vector(mx, mz, params), params);

    SpectralSample {
        h0_k,
        h0_minus_k_conj: h0_minus_k.conj(),
    }
}

/// Spectral pairs for every cell, row-major
pub fn spectral_samples(draws: &[Vec2], params: &WaveParams) -> Vec<SpectralSample> {
    let n = params.n as usize;
    (0..n * n)
        .map(|i| spectral_sample(i % n, i / n, draws, params))
        .collect()
}

/// Spectral pairs taken from an existing H₀ grid
pub fn pairs_from_grid(h0: &ComplexGrid) -> Vec<SpectralSample> {
    let n = h0.n();
    h0.cells()
        .iter()
        .enumerate()
        .map(|(i, &h0_k)| SpectralSample {
            h0_k,
            h0_minus_k_conj: h0[mirror_cell(i % n, i / n, n)].conj(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OceanError;
    use approx::assert_relative_eq;

    fn small_params() -> WaveParams {
        OceanConfig {
            n: 8,
            wave_length: 8.0,
            wind_direction: Vec2::new(1.0, 0.0),
            ..Default::default()
        }
        .wave_params()
    }

    #[test]
    fn test_wave_vector_is_centered() {
        let params = small_params();
        assert_eq!(wave_vector(4, 4, &params), Vec2::ZERO);
        assert_relative_eq!(wave_vector(0, 4, &params).x, -PI, epsilon = 1e-6);
        assert_relative_eq!(wave_vector(6, 4, &params).x, PI / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lattice_position() {
        let params = small_params();
        assert_eq!(lattice_position(4, 4, &params), Vec2::ZERO);
        assert_eq!(lattice_position(0, 0, &params), Vec2::new(-4.0, 4.0));
        assert_eq!(lattice_position(7, 6, &params), Vec2::new(3.0, -2.0));
    }

    #[test]
    fn test_phillips_zero_at_origin() {
        let params = small_params();
        assert_eq!(phillips(Vec2::ZERO, &params), 0.0);
        assert_eq!(phillips(Vec2::splat(SPECTRUM_EPSILON * 0.5), &params), 0.0);
    }

    #[test]
    fn test_phillips_follows_wind() {
        let params = small_params();

        // Waves perpendicular to the wind carry no energy
        assert_eq!(phillips(Vec2::new(0.0, 0.5), &params), 0.0);

        let along = phillips(Vec2::new(0.5, 0.0), &params);
        let against = phillips(Vec2::new(-0.5, 0.0), &params);
        assert!(along > 0.0);
        assert_relative_eq!(along, against);
    }

    #[test]
    fn test_draws_are_seeded() {
        assert_eq!(gaussian_draws(8, 7), gaussian_draws(8, 7));
        assert_ne!(gaussian_draws(8, 7), gaussian_draws(8, 8));
        assert_eq!(gaussian_draws(8, 7).len(), 64);
    }

    #[test]
    fn test_generate_validates_first() {
        let config = OceanConfig {
            n: 6,
            ..Default::default()
        };
        assert!(matches!(
            generate_initial_spectrum(&config),
            Err(OceanError::InvalidArgument(_))
        ));

        let config = OceanConfig {
            wind_direction: Vec2::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            generate_initial_spectrum(&config),
            Err(OceanError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_center_bin_is_empty() {
        let config = OceanConfig {
            n: 16,
            ..Default::default()
        };
        let h0 = generate_initial_spectrum(&config).unwrap();
        assert_eq!(h0.n(), 16);
        assert_eq!(h0[(8, 8)], Complex32::new(0.0, 0.0));
    }

    #[test]
    fn test_pairs_agree_with_grid() {
        let config = OceanConfig {
            n: 8,
            ..Default::default()
        };
        let params = config.wave_params();
        let draws = gaussian_draws(config.n, config.seed);

        let direct = spectral_samples(&draws, &params);
        let from_grid = pairs_from_grid(&height_zero_grid(&draws, &params));
        assert_eq!(direct, from_grid);

        // Pairs of mirrored cells are conjugates of each other
        // (3, 1) and (5, 7)
        let a = direct[11];
        let b = direct[61];
        assert_eq!(a.h0_k, b.h0_minus_k_conj.conj());
    }

    #[test]
    fn test_sample_texel_round_trip() {
        let sample = SpectralSample {
            h0_k: Complex32::new(1.0, -2.0),
            h0_minus_k_conj: Complex32::new(0.5, 0.25),
        };
        assert_eq!(SpectralSample::from_texel(sample.to_texel()), sample);
    }
}
