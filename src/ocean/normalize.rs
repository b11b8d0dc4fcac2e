//! Sign and scale correction of synthesized fields.
//!
//! The inverse transform leaves a checkerboard sign `(-1)^(x+z)` on every
//! sample and no amplitude normalization. Both are removed here; the exact
//! formulas are the contract the mesh and the compute kernels reproduce.

use glam::Vec3;
use num_complex::Complex32;

use super::evolution::SpectralFields;
use crate::error::{OceanError, Result};
use crate::params::WaveParams;

/// Checkerboard sign of cell `(x, z)`
pub fn checkerboard(x: usize, z: usize) -> f32 {
    if (x + z) % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Physical surface values of one cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    /// Vertical offset (object-space units)
    pub height: f32,
    /// Horizontal displacement along x, choppiness applied
    pub dx: f32,
    /// Horizontal displacement along z, choppiness applied
    pub dz: f32,
    pub normal: Vec3,
}

/// Correct one cell of the five synthesized fields.
///
/// Arguments are the raw cells in field order: height, slope x, slope z, dx, dz.
pub fn surface_sample(
    x: usize,
    z: usize,
    cells: [Complex32; 5],
    params: &WaveParams,
) -> SurfaceSample {
    corrected_sample(cells, checkerboard(x, z), params)
}

/// Scale, choppiness and normal of one set of field values carrying `sign`
pub(crate) fn corrected_sample(
    cells: [Complex32; 5],
    sign: f32,
    params: &WaveParams,
) -> SurfaceSample {
    let [height, slope_x, slope_z, dx, dz] = cells;
    let l = params.wave_length;

    let gradient_x = slope_x.re * sign / l;
    let gradient_z = slope_z.re * sign / l;

    SurfaceSample {
        height: height.re * sign / l,
        dx: params.choppiness * (dx.re * sign / l),
        dz: params.choppiness * (dz.re * sign / l),
        normal: Vec3::new(-gradient_x, 1.0, -gradient_z).normalize(),
    }
}

/// Corrected surface of one simulation step, N×N row-major
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceFields {
    n: usize,
    samples: Vec<SurfaceSample>,
}

impl SurfaceFields {
    /// Flat water: zero height and displacement, normals pointing up
    pub fn flat(n: usize) -> Self {
        let sample = SurfaceSample {
            height: 0.0,
            dx: 0.0,
            dz: 0.0,
            normal: Vec3::Y,
        };
        Self {
            n,
            samples: vec![sample; n * n],
        }
    }

    /// Wrap row-major samples. Fails if `samples.len() != n * n`.
    pub fn from_samples(n: usize, samples: Vec<SurfaceSample>) -> Result<Self> {
        if samples.len() != n * n {
            return Err(OceanError::invalid(format!(
                "expected {} surface samples, got {}",
                n * n,
                samples.len()
            )));
        }
        Ok(Self { n, samples })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn samples(&self) -> &[SurfaceSample] {
        &self.samples
    }

    pub fn sample(&self, x: usize, z: usize) -> &SurfaceSample {
        &self.samples[z * self.n + x]
    }

    /// Height map, row-major
    pub fn heights(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.height).collect()
    }

    /// Choppy x displacement, row-major
    pub fn dx(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.dx).collect()
    }

    /// Choppy z displacement, row-major
    pub fn dz(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.dz).collect()
    }

    /// Smallest and largest height. `(inf, -inf)` for an empty surface.
    pub fn min_max_height(&self) -> (f32, f32) {
        self.samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.height), hi.max(s.height))
            })
    }

    pub fn mean_height(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.height).sum::<f32>() / self.samples.len() as f32
    }
}

/// Correct all five synthesized fields into a surface
pub fn normalize(fields: &SpectralFields, params: &WaveParams) -> Result<SurfaceFields> {
    let n = fields.n();
    if n != params.n as usize {
        return Err(OceanError::GridMismatch {
            expected: params.n as usize,
            actual: n,
        });
    }

    let [height, slope_x, slope_z, dx, dz] = fields.as_array();
    let mut samples = Vec::with_capacity(n * n);
    for z in 0..n {
        for x in 0..n {
            let cells = [
                height[(x, z)],
                slope_x[(x, z)],
                slope_z[(x, z)],
                dx[(x, z)],
                dz[(x, z)],
            ];
            samples.push(surface_sample(x, z, cells, params));
        }
    }

    SurfaceFields::from_samples(n, samples)
}
