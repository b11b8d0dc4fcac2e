//! Stage-barriered compute pipeline.
//!
//! The same math as the sequential executor, expressed as five dependent
//! kernel stages over textures:
//!
//! ```text
//! (a) height zero      gaussian ──> spectrum            (construction, wind change)
//! (c) butterfly        ──> butterfly table               (construction)
//! (b) spectra          spectrum, t ──> 5 fields          (every frame)
//! (d) ifft stage × log2 N per axis per field, ping-pong  (every frame)
//! (e) normalize        5 fields ──> displacement, normal (every frame)
//! ```
//!
//! A barrier follows every dispatch. Devices differ only in where the
//! kernels run (see [`HostDevice`] and, with feature `gpu`, `WgpuDevice`).

mod arena;
#[cfg(feature = "gpu")]
mod gpu;
mod host;

pub use arena::{check_bindings, Handle, HostArena, Read, Rg32F, Rgba32F, TexelFormat, Write};
#[cfg(feature = "gpu")]
pub use gpu::WgpuDevice;
pub use host::HostDevice;

use glam::Vec3;

use crate::error::Result;
use crate::fft::{synthesis_unshuffle, Axis, Unshuffle};
use crate::ocean::evolution::FIELD_COUNT;
use crate::ocean::normalize::{SurfaceFields, SurfaceSample};
use crate::ocean::spectrum::gaussian_draws;
use crate::ocean::SimulationBackend;
use crate::params::{OceanConfig, WaveParams};

/// One butterfly stage along one axis
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IfftPass {
    pub axis: Axis,
    pub stage: u32,
    /// Reordering folded into this stage's writes (only the last stage has one)
    pub unshuffle: Unshuffle,
}

impl IfftPass {
    pub fn new(axis: Axis, stage: u32, log2_n: u32) -> Self {
        let unshuffle = if stage + 1 == log2_n {
            synthesis_unshuffle(axis)
        } else {
            Unshuffle::None
        };
        Self {
            axis,
            stage,
            unshuffle,
        }
    }
}

/// Work counters of a device
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatches: usize,
    pub barriers: usize,
    pub blits: usize,
}

/// A device that runs the pipeline kernels.
///
/// Each kernel reads only through [`Read`] bindings and writes only through
/// [`Write`] bindings. Its writes are visible to later dispatches only after
/// [`ComputeDevice::barrier`].
pub trait ComputeDevice {
    fn name(&self) -> &'static str;

    fn create_texture<F: TexelFormat>(&mut self, width: u32, height: u32) -> Result<Handle<F>>;

    /// Replace a texture's contents from the host
    fn upload<F: TexelFormat>(&mut self, target: Write<F>, texels: &[F::Texel]) -> Result<()>;

    /// (a) Spectral pairs `(H₀(k), conj(H₀(−k)))` from the Gaussian draws
    fn height_zero(
        &mut self,
        params: &WaveParams,
        gaussian: Read<Rg32F>,
        spectrum: Write<Rgba32F>,
    ) -> Result<()>;

    /// (b) Height, slope x, slope z, dx, dz spectra at `params.time`
    fn spectra(
        &mut self,
        params: &WaveParams,
        spectrum: Read<Rgba32F>,
        fields: [Write<Rg32F>; FIELD_COUNT],
    ) -> Result<()>;

    /// (c) N × log2 N butterfly table
    fn butterfly(&mut self, params: &WaveParams, table: Write<Rgba32F>) -> Result<()>;

    /// (d) One butterfly stage of the inverse transform
    fn ifft_stage(
        &mut self,
        params: &WaveParams,
        pass: IfftPass,
        butterfly: Read<Rgba32F>,
        input: Read<Rg32F>,
        output: Write<Rg32F>,
    ) -> Result<()>;

    /// Copy `source` into `target`
    fn blit(&mut self, source: Read<Rg32F>, target: Write<Rg32F>) -> Result<()>;

    /// (e) Sign/scale correction into displacement `(dx, height, dz, 0)` and normal
    fn normalize_permute(
        &mut self,
        params: &WaveParams,
        fields: [Read<Rg32F>; FIELD_COUNT],
        displacement: Write<Rgba32F>,
        normal: Write<Rgba32F>,
    ) -> Result<()>;

    /// Make all previous writes visible to later dispatches
    fn barrier(&mut self) -> Result<()>;

    fn readback<F: TexelFormat>(&mut self, source: Read<F>) -> Result<Vec<F::Texel>>;

    fn stats(&self) -> DispatchStats;
}

/// Every texture the pipeline owns, allocated once per ocean
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub params: WaveParams,
    pub gaussian: Handle<Rg32F>,
    pub spectrum: Handle<Rgba32F>,
    pub butterfly: Handle<Rgba32F>,
    /// Height, slope x, slope z, dx, dz
    pub fields: [Handle<Rg32F>; FIELD_COUNT],
    pub ping_pong: Handle<Rg32F>,
    pub displacement: Handle<Rgba32F>,
    pub normal: Handle<Rgba32F>,
}

impl SimulationContext {
    fn allocate<D: ComputeDevice>(device: &mut D, params: WaveParams) -> Result<Self> {
        let n = params.n;
        Ok(Self {
            params,
            gaussian: device.create_texture(n, n)?,
            spectrum: device.create_texture(n, n)?,
            butterfly: device.create_texture(n, params.log2_n)?,
            fields: [
                device.create_texture(n, n)?,
                device.create_texture(n, n)?,
                device.create_texture(n, n)?,
                device.create_texture(n, n)?,
                device.create_texture(n, n)?,
            ],
            ping_pong: device.create_texture(n, n)?,
            displacement: device.create_texture(n, n)?,
            normal: device.create_texture(n, n)?,
        })
    }
}

/// Drives a [`ComputeDevice`] through the five stages
pub struct ParallelPipeline<D: ComputeDevice> {
    device: D,
    context: SimulationContext,
}

impl<D: ComputeDevice> ParallelPipeline<D> {
    /// Allocate all textures, upload the draws and run stages (a) and (c)
    pub fn new(mut device: D, config: &OceanConfig) -> Result<Self> {
        config.validate()?;
        let params = config.wave_params();
        let context = SimulationContext::allocate(&mut device, params)?;

        let draws: Vec<[f32; 2]> = gaussian_draws(config.n, config.seed)
            .into_iter()
            .map(|d| d.to_array())
            .collect();
        device.upload(context.gaussian.write(), &draws)?;

        device.height_zero(&params, context.gaussian.read(), context.spectrum.write())?;
        device.barrier()?;
        device.butterfly(&params, context.butterfly.write())?;
        device.barrier()?;

        log::debug!(
            "Parallel pipeline on {} device: N = {}, {} stages per axis",
            device.name(),
            params.n,
            params.log2_n
        );

        Ok(Self { device, context })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    /// Run stages (b), (d) and (e) for `time` and read the surface back
    pub fn run(&mut self, time: f32) -> Result<SurfaceFields> {
        let params = self.context.params.at_time(time);
        let ctx = &self.context;
        let device = &mut self.device;

        device.spectra(&params, ctx.spectrum.read(), ctx.fields.map(|f| f.write()))?;
        device.barrier()?;

        for axis in [Axis::Columns, Axis::Rows] {
            for field in ctx.fields {
                let (mut input, mut output) = (field, ctx.ping_pong);
                for stage in 0..params.log2_n {
                    let pass = IfftPass::new(axis, stage, params.log2_n);
                    device.ifft_stage(
                        &params,
                        pass,
                        ctx.butterfly.read(),
                        input.read(),
                        output.write(),
                    )?;
                    device.barrier()?;
                    std::mem::swap(&mut input, &mut output);
                }

                // After an odd number of stages the result sits in the ping-pong texture
                if input != field {
                    device.blit(input.read(), field.write())?;
                    device.barrier()?;
                }
            }
        }

        device.normalize_permute(
            &params,
            ctx.fields.map(|f| f.read()),
            ctx.displacement.write(),
            ctx.normal.write(),
        )?;
        device.barrier()?;

        let displacement = device.readback(ctx.displacement.read())?;
        let normals = device.readback(ctx.normal.read())?;

        let samples = displacement
            .iter()
            .zip(&normals)
            .map(|(d, n)| SurfaceSample {
                height: d[1],
                dx: d[0],
                dz: d[2],
                normal: Vec3::new(n[0], n[1], n[2]),
            })
            .collect();
        SurfaceFields::from_samples(params.n as usize, samples)
    }

    /// Rerun stage (a) for new wind parameters
    pub fn rebuild_spectrum(&mut self, params: &WaveParams) -> Result<()> {
        let ctx = &self.context;
        self.device
            .height_zero(params, ctx.gaussian.read(), ctx.spectrum.write())?;
        self.device.barrier()?;
        self.context.params = *params;
        Ok(())
    }

    /// Butterfly table as computed by the device, `log2 N` rows of N texels
    pub fn butterfly_table(&mut self) -> Result<Vec<[f32; 4]>> {
        self.device.readback(self.context.butterfly.read())
    }

    /// Spectral pairs as computed by the device, row-major
    pub fn spectrum_texels(&mut self) -> Result<Vec<[f32; 4]>> {
        self.device.readback(self.context.spectrum.read())
    }
}

impl<D: ComputeDevice> SimulationBackend for ParallelPipeline<D> {
    fn name(&self) -> &'static str {
        self.device.name()
    }

    fn simulate(&mut self, time: f32) -> Result<SurfaceFields> {
        self.run(time)
    }

    fn update_spectrum(&mut self, params: &WaveParams) -> Result<()> {
        self.rebuild_spectrum(params)
    }
}
