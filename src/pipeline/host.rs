//! Host compute device: every kernel is a rayon parallel loop over texels.
//!
//! Dispatches are blocking, but the device still tracks fences: a dispatch
//! or readback issued while the previous dispatch is unfenced fails with
//! [`OceanError::MissingBarrier`].

use glam::Vec2;
use num_complex::Complex32;
use rayon::prelude::*;

use super::arena::{
    check_bindings, Handle, HostArena, Read, Rg32F, Rgba32F, TexelFormat, Write,
};
use super::{ComputeDevice, DispatchStats, IfftPass};
use crate::error::{OceanError, Result};
use crate::fft::{Axis, ButterflyEntry, FftPlan};
use crate::ocean::evolution::evolve_cell;
use crate::ocean::normalize::surface_sample;
use crate::ocean::spectrum::{spectral_sample, wave_vector, SpectralSample};
use crate::params::WaveParams;

fn complex(texel: [f32; 2]) -> Complex32 {
    Complex32::new(texel[0], texel[1])
}

fn texel(value: Complex32) -> [f32; 2] {
    [value.re, value.im]
}

/// Rayon-backed [`ComputeDevice`]
#[derive(Debug, Default)]
pub struct HostDevice {
    arena: HostArena,
    /// Stage whose writes are not fenced yet
    unfenced: Option<&'static str>,
    stats: DispatchStats,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self) -> Result<()> {
        match self.unfenced {
            Some(stage) => Err(OceanError::MissingBarrier(stage)),
            None => Ok(()),
        }
    }

    fn finish(&mut self, stage: &'static str) {
        log::trace!("host dispatch: {stage}");
        self.unfenced = Some(stage);
        self.stats.dispatches += 1;
    }

    /// Run `kernel` with the storage of `writes` moved out of the arena.
    ///
    /// The storage is put back even when the kernel fails.
    fn dispatch<const W: usize>(
        &mut self,
        stage: &'static str,
        reads: &[usize],
        writes: [usize; W],
        kernel: impl FnOnce(&HostArena, &mut [Vec<f32>; W]) -> Result<()>,
    ) -> Result<()> {
        self.begin()?;
        check_bindings(reads, &writes)?;
        for &id in reads.iter().chain(&writes) {
            if id >= self.arena.len() {
                return Err(OceanError::UnknownResource(id));
            }
        }

        let mut taken: [Vec<f32>; W] = std::array::from_fn(|_| Vec::new());
        for (slot, &id) in taken.iter_mut().zip(&writes) {
            *slot = self.arena.take(id)?;
        }

        let result = kernel(&self.arena, &mut taken);
        for (&id, data) in writes.iter().zip(taken) {
            self.arena.restore(id, data)?;
        }
        result?;

        self.finish(stage);
        Ok(())
    }
}

/// Reinterpret moved-out storage as texels of `F`
fn texels_mut<F: TexelFormat>(data: &mut [f32]) -> &mut [F::Texel] {
    bytemuck::cast_slice_mut(data)
}

fn ensure_square<F: TexelFormat>(handle: Handle<F>, n: usize) -> Result<()> {
    handle.ensure_extent(n as u32, n as u32)
}

impl ComputeDevice for HostDevice {
    fn name(&self) -> &'static str {
        "host"
    }

    fn create_texture<F: TexelFormat>(&mut self, width: u32, height: u32) -> Result<Handle<F>> {
        Ok(self.arena.create(width, height))
    }

    fn upload<F: TexelFormat>(&mut self, target: Write<F>, texels: &[F::Texel]) -> Result<()> {
        self.arena.upload(target, texels)
    }

    fn height_zero(
        &mut self,
        params: &WaveParams,
        gaussian: Read<Rg32F>,
        spectrum: Write<Rgba32F>,
    ) -> Result<()> {
        let n = params.n as usize;
        ensure_square(gaussian.0, n)?;
        ensure_square(spectrum.0, n)?;

        self.dispatch(
            "height zero",
            &[gaussian.0.id()],
            [spectrum.0.id()],
            |arena, [out]| {
                let draws: Vec<Vec2> = arena
                    .view(gaussian)?
                    .iter()
                    .map(|&d| Vec2::from_array(d))
                    .collect();

                texels_mut::<Rgba32F>(out)
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, t)| {
                        *t = spectral_sample(i % n, i / n, &draws, params).to_texel();
                    });
                Ok(())
            },
        )
    }

    fn spectra(
        &mut self,
        params: &WaveParams,
        spectrum: Read<Rgba32F>,
        fields: [Write<Rg32F>; 5],
    ) -> Result<()> {
        let n = params.n as usize;
        ensure_square(spectrum.0, n)?;
        for field in &fields {
            ensure_square(field.0, n)?;
        }

        self.dispatch(
            "spectra",
            &[spectrum.0.id()],
            fields.map(|f| f.0.id()),
            |arena, [height, slope_x, slope_z, dx, dz]| {
                let samples = arena.view(spectrum)?;
                (
                    texels_mut::<Rg32F>(height),
                    texels_mut::<Rg32F>(slope_x),
                    texels_mut::<Rg32F>(slope_z),
                    texels_mut::<Rg32F>(dx),
                    texels_mut::<Rg32F>(dz),
                )
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(i, (h, sx, sz, x, z))| {
                        let k = wave_vector(i % n, i / n, params);
                        let sample = SpectralSample::from_texel(samples[i]);
                        let cell = evolve_cell(sample, k, params.time, params);
                        *h = texel(cell.height);
                        *sx = texel(cell.slope_x);
                        *sz = texel(cell.slope_z);
                        *x = texel(cell.dx);
                        *z = texel(cell.dz);
                    });
                Ok(())
            },
        )
    }

    fn butterfly(&mut self, params: &WaveParams, table: Write<Rgba32F>) -> Result<()> {
        table.0.ensure_extent(params.n, params.log2_n)?;
        let plan = FftPlan::new(params.n as usize)?;
        let n = plan.n();

        self.dispatch("butterfly", &[], [table.0.id()], |_, [out]| {
            texels_mut::<Rgba32F>(out)
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, t)| *t = plan.butterfly_entry(i / n, i % n).to_texel());
            Ok(())
        })
    }

    fn ifft_stage(
        &mut self,
        params: &WaveParams,
        pass: IfftPass,
        butterfly: Read<Rgba32F>,
        input: Read<Rg32F>,
        output: Write<Rg32F>,
    ) -> Result<()> {
        let n = params.n as usize;
        butterfly.0.ensure_extent(params.n, params.log2_n)?;
        ensure_square(input.0, n)?;
        ensure_square(output.0, n)?;

        self.dispatch(
            "ifft stage",
            &[butterfly.0.id(), input.0.id()],
            [output.0.id()],
            |arena, [out]| {
                let table = arena.view(butterfly)?;
                let source = arena.view(input)?;
                let row = pass.stage as usize * n;

                texels_mut::<Rg32F>(out)
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, t)| {
                        let (x, z) = (i % n, i / n);
                        let (position, base, stride) = match pass.axis {
                            Axis::Rows => (x, z * n, 1),
                            Axis::Columns => (z, x, n),
                        };
                        let q = pass.unshuffle.source(position, n);
                        let entry = ButterflyEntry::from_texel(table[row + q]);

                        let a = complex(source[base + entry.a * stride]);
                        let b = complex(source[base + entry.b * stride]);
                        *t = texel(a + b * entry.twiddle);
                    });
                Ok(())
            },
        )
    }

    fn blit(&mut self, source: Read<Rg32F>, target: Write<Rg32F>) -> Result<()> {
        source.0.ensure_extent(target.0.width(), target.0.height())?;

        self.dispatch("blit", &[source.0.id()], [target.0.id()], |arena, [out]| {
            let texels = arena.view(source)?;
            out.copy_from_slice(bytemuck::cast_slice(texels));
            Ok(())
        })?;
        self.stats.blits += 1;
        Ok(())
    }

    fn normalize_permute(
        &mut self,
        params: &WaveParams,
        fields: [Read<Rg32F>; 5],
        displacement: Write<Rgba32F>,
        normal: Write<Rgba32F>,
    ) -> Result<()> {
        let n = params.n as usize;
        for field in &fields {
            ensure_square(field.0, n)?;
        }
        ensure_square(displacement.0, n)?;
        ensure_square(normal.0, n)?;

        let reads = fields.map(|f| f.0.id());
        self.dispatch(
            "normalize permute",
            &reads,
            [displacement.0.id(), normal.0.id()],
            |arena, [displacement_out, normal_out]| {
                let [height, slope_x, slope_z, dx, dz] = [
                    arena.view(fields[0])?,
                    arena.view(fields[1])?,
                    arena.view(fields[2])?,
                    arena.view(fields[3])?,
                    arena.view(fields[4])?,
                ];

                (
                    texels_mut::<Rgba32F>(displacement_out),
                    texels_mut::<Rgba32F>(normal_out),
                )
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(i, (d, nrm))| {
                        let cells = [height[i], slope_x[i], slope_z[i], dx[i], dz[i]].map(complex);
                        let sample = surface_sample(i % n, i / n, cells, params);
                        *d = [sample.dx, sample.height, sample.dz, 0.0];
                        *nrm = sample.normal.extend(0.0).to_array();
                    });
                Ok(())
            },
        )
    }

    fn barrier(&mut self) -> Result<()> {
        self.unfenced = None;
        self.stats.barriers += 1;
        Ok(())
    }

    fn readback<F: TexelFormat>(&mut self, source: Read<F>) -> Result<Vec<F::Texel>> {
        self.begin()?;
        Ok(self.arena.view(source)?.to_vec())
    }

    fn stats(&self) -> DispatchStats {
        self.stats
    }
}
