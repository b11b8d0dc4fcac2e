//! Time evolution of the spectrum via the deep-water dispersion relation.

use glam::Vec2;
use num_complex::Complex32;

use super::spectrum::{wave_vector, SpectralSample};
use crate::error::{OceanError, Result};
use crate::fft::ComplexGrid;
use crate::params::{WaveParams, DISPLACEMENT_EPSILON, GRAVITY};

/// Angular frequency of `k`, quantized to multiples of 2π / period.
///
/// The quantization makes the whole field repeat exactly after one period.
pub fn dispersion(k: Vec2, params: &WaveParams) -> f32 {
    let w0 = params.base_frequency();
    ((GRAVITY * k.length()).sqrt() / w0).floor() * w0
}

/// The five spectral values of one cell at one instant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralCell {
    pub height: Complex32,
    pub slope_x: Complex32,
    pub slope_z: Complex32,
    pub dx: Complex32,
    pub dz: Complex32,
}

/// Evolve one cell to `time` (seconds)
pub fn evolve_cell(
    sample: SpectralSample,
    k: Vec2,
    time: f32,
    params: &WaveParams,
) -> SpectralCell {
    let omega_t = dispersion(k, params) * time;
    let (sin, cos) = omega_t.sin_cos();

    // H(k, t) = H₀(k)·e^{iωt} + conj(H₀(−k))·e^{−iωt}
    let height = sample.h0_k * Complex32::new(cos, sin)
        + sample.h0_minus_k_conj * Complex32::new(cos, -sin);

    let slope_x = height * Complex32::new(0.0, k.x);
    let slope_z = height * Complex32::new(0.0, k.y);

    let length = k.length();
    let (dx, dz) = if length < DISPLACEMENT_EPSILON {
        (Complex32::new(0.0, 0.0), Complex32::new(0.0, 0.0))
    } else {
        (
            height * Complex32::new(0.0, -k.x / length),
            height * Complex32::new(0.0, -k.y / length),
        )
    };

    SpectralCell {
        height,
        slope_x,
        slope_z,
        dx,
        dz,
    }
}

/// Grids synthesized per step
pub const FIELD_COUNT: usize = 5;

/// The five grids of one simulation step.
///
/// Holds spectra after [`evolve`] and spatial fields after synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFields {
    pub height: ComplexGrid,
    pub slope_x: ComplexGrid,
    pub slope_z: ComplexGrid,
    pub dx: ComplexGrid,
    pub dz: ComplexGrid,
}

impl SpectralFields {
    pub fn n(&self) -> usize {
        self.height.n()
    }

    /// Apply `f` to every field, keeping the field order
    pub fn try_map(
        &self,
        mut f: impl FnMut(&ComplexGrid) -> Result<ComplexGrid>,
    ) -> Result<Self> {
        Ok(Self {
            height: f(&self.height)?,
            slope_x: f(&self.slope_x)?,
            slope_z: f(&self.slope_z)?,
            dx: f(&self.dx)?,
            dz: f(&self.dz)?,
        })
    }

    /// Fields in kernel order: height, slope x, slope z, dx, dz
    pub fn as_array(&self) -> [&ComplexGrid; FIELD_COUNT] {
        [&self.height, &self.slope_x, &self.slope_z, &self.dx, &self.dz]
    }

    /// Inverse of [`Self::as_array`]. Every grid must have the same size.
    pub fn from_array(grids: [ComplexGrid; FIELD_COUNT]) -> Result<Self> {
        let [height, slope_x, slope_z, dx, dz] = grids;
        for grid in [&slope_x, &slope_z, &dx, &dz] {
            height.ensure_same_size(grid)?;
        }
        Ok(Self {
            height,
            slope_x,
            slope_z,
            dx,
            dz,
        })
    }
}

/// Evolve every spectral pair to `time`. `samples` is row-major N×N.
pub fn evolve(
    samples: &[SpectralSample],
    time: f32,
    params: &WaveParams,
) -> Result<SpectralFields> {
    let n = params.n as usize;
    if samples.len() != n * n {
        return Err(OceanError::GridMismatch {
            expected: n,
            actual: (samples.len() as f64).sqrt() as usize,
        });
    }

    let mut height = ComplexGrid::zeros(n);
    let mut slope_x = ComplexGrid::zeros(n);
    let mut slope_z = ComplexGrid::zeros(n);
    let mut dx = ComplexGrid::zeros(n);
    let mut dz = ComplexGrid::zeros(n);

    for z in 0..n {
        for x in 0..n {
            let cell = evolve_cell(samples[z * n + x], wave_vector(x, z, params), time, params);
            height[(x, z)] = cell.height;
            slope_x[(x, z)] = cell.slope_x;
            slope_z[(x, z)] = cell.slope_z;
            dx[(x, z)] = cell.dx;
            dz[(x, z)] = cell.dz;
        }
    }

    Ok(SpectralFields {
        height,
        slope_x,
        slope_z,
        dx,
        dz,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::OceanConfig;
    use approx::assert_relative_eq;

    fn params() -> WaveParams {
        OceanConfig {
            n: 4,
            period_time: 10.0,
            ..Default::default()
        }
        .wave_params()
    }

    #[test]
    fn test_dispersion_is_quantized() {
        let params = params();
        let w0 = params.base_frequency();

        for k in [0.1f32, 0.7, 2.5, 9.0] {
            let omega = dispersion(Vec2::new(k, 0.0), &params);
            let steps = omega / w0;
            assert_relative_eq!(steps, steps.round(), epsilon = 1e-4);
            assert!(omega <= (GRAVITY * k).sqrt() + 1e-5);
        }
        assert_eq!(dispersion(Vec2::ZERO, &params), 0.0);
    }

    #[test]
    fn test_slopes_and_displacement() {
        let params = params();
        let sample = SpectralSample {
            h0_k: Complex32::new(1.0, 0.0),
            h0_minus_k_conj: Complex32::new(0.0, 0.0),
        };
        let k = Vec2::new(3.0, 4.0);
        let cell = evolve_cell(sample, k, 0.0, &params);

        assert_eq!(cell.height, Complex32::new(1.0, 0.0));
        assert_eq!(cell.slope_x, Complex32::new(0.0, 3.0));
        assert_eq!(cell.slope_z, Complex32::new(0.0, 4.0));
        assert_relative_eq!(cell.dx.im, -0.6, epsilon = 1e-6);
        assert_relative_eq!(cell.dz.im, -0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_vector_has_no_displacement() {
        let params = params();
        let sample = SpectralSample {
            h0_k: Complex32::new(1.0, 2.0),
            h0_minus_k_conj: Complex32::new(3.0, 4.0),
        };
        let cell = evolve_cell(sample, Vec2::ZERO, 1.5, &params);

        assert_eq!(cell.dx, Complex32::new(0.0, 0.0));
        assert_eq!(cell.dz, Complex32::new(0.0, 0.0));
        assert!(cell.height.re.is_finite() && cell.height.im.is_finite());
    }

    #[test]
    fn test_conjugate_pair_stays_real() {
        // A self-conjugate pair evolves to a real amplitude
        let params = params();
        let h0 = Complex32::new(0.3, -0.7);
        let sample = SpectralSample {
            h0_k: h0,
            h0_minus_k_conj: h0.conj(),
        };
        let cell = evolve_cell(sample, Vec2::new(1.2, 0.4), 2.3, &params);
        assert_relative_eq!(cell.height.im, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_evolve_does_not_touch_input() {
        let params = params();
        let samples = vec![
            SpectralSample {
                h0_k: Complex32::new(1.0, 1.0),
                h0_minus_k_conj: Complex32::new(0.5, 0.0),
            };
            16
        ];
        let before = samples.clone();

        let fields = evolve(&samples, 1.0, &params).unwrap();
        assert_eq!(samples, before);
        assert_eq!(fields.n(), 4);

        assert!(matches!(
            evolve(&samples[..9], 1.0, &params),
            Err(OceanError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_field_array_round_trip() {
        let params = params();
        let samples = vec![
            SpectralSample {
                h0_k: Complex32::new(0.2, 0.1),
                h0_minus_k_conj: Complex32::new(0.1, 0.3),
            };
            16
        ];
        let fields = evolve(&samples, 0.5, &params).unwrap();
        let grids = fields.as_array().map(|grid| grid.clone());
        assert_eq!(SpectralFields::from_array(grids).unwrap(), fields);
    }
}
