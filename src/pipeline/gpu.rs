//! wgpu compute device.
//!
//! Textures are storage buffers; every kernel is a 16×16 compute shader
//! sharing the `Params` uniform at binding 0. Dispatches are recorded into
//! one command encoder and a barrier submits it.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::arena::{check_bindings, Handle, Read, Rg32F, Rgba32F, TexelFormat, Write};
use super::{ComputeDevice, DispatchStats, IfftPass};
use crate::error::{OceanError, Result};
use crate::fft::{Axis, Unshuffle};
use crate::params::WaveParams;

const WORKGROUP_SIZE: u32 = 16;

const COMMON: &str = include_str!("shaders/common.wgsl");

/// Per-pass uniform of the ifft kernel, `IfftPass` in ifft.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct PassUniform {
    axis: u32,
    stage: u32,
    unshuffle: u32,
    _padding: u32,
}

impl From<IfftPass> for PassUniform {
    fn from(pass: IfftPass) -> Self {
        Self {
            axis: match pass.axis {
                Axis::Rows => 0,
                Axis::Columns => 1,
            },
            stage: pass.stage,
            unshuffle: match pass.unshuffle {
                Unshuffle::None => 0,
                Unshuffle::Centered => 1,
                Unshuffle::Mirrored => 2,
            },
            _padding: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Kernel {
    HeightZero,
    Spectra,
    Butterfly,
    Ifft,
    Normalize,
}

struct Kernels {
    height_zero: wgpu::ComputePipeline,
    spectra: wgpu::ComputePipeline,
    butterfly: wgpu::ComputePipeline,
    ifft: wgpu::ComputePipeline,
    normalize: wgpu::ComputePipeline,
}

impl Kernels {
    fn new(device: &wgpu::Device) -> Self {
        let build = |label: &str, source: &str| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(format!("{COMMON}\n{source}").into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: None,
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        Self {
            height_zero: build("Height Zero Kernel", include_str!("shaders/height_zero.wgsl")),
            spectra: build("Spectra Kernel", include_str!("shaders/spectra.wgsl")),
            butterfly: build("Butterfly Kernel", include_str!("shaders/butterfly.wgsl")),
            ifft: build("IFFT Stage Kernel", include_str!("shaders/ifft.wgsl")),
            normalize: build("Normalize Kernel", include_str!("shaders/normalize.wgsl")),
        }
    }

    fn get(&self, kernel: Kernel) -> &wgpu::ComputePipeline {
        match kernel {
            Kernel::HeightZero => &self.height_zero,
            Kernel::Spectra => &self.spectra,
            Kernel::Butterfly => &self.butterfly,
            Kernel::Ifft => &self.ifft,
            Kernel::Normalize => &self.normalize,
        }
    }
}

/// [`ComputeDevice`] running the kernels on a wgpu adapter
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    kernels: Kernels,
    buffers: Vec<wgpu::Buffer>,
    /// Dispatches recorded since the last barrier
    encoder: Option<wgpu::CommandEncoder>,
    unfenced: Option<&'static str>,
    stats: DispatchStats,
}

impl WgpuDevice {
    /// Open the first high-performance adapter.
    ///
    /// Fails with [`OceanError::GpuUnavailable`] when the host has none.
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::request())
    }

    async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| OceanError::GpuUnavailable("no compatible adapter".into()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Ocean Compute Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| OceanError::GpuUnavailable(format!("failed to request device: {e}")))?;

        log::info!("GPU compute device: {}", adapter.get_info().name);

        let kernels = Kernels::new(&device);
        Ok(Self {
            device,
            queue,
            kernels,
            buffers: Vec::new(),
            encoder: None,
            unfenced: None,
            stats: DispatchStats::default(),
        })
    }

    fn begin(&self) -> Result<()> {
        match self.unfenced {
            Some(stage) => Err(OceanError::MissingBarrier(stage)),
            None => Ok(()),
        }
    }

    fn finish(&mut self, stage: &'static str) {
        log::trace!("gpu dispatch: {stage}");
        self.unfenced = Some(stage);
        self.stats.dispatches += 1;
    }

    fn uniform<T: Pod>(&self, label: &str, value: &T) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM,
            })
    }

    /// Submit everything recorded so far
    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
    }

    /// Record one kernel. Bindings are uniforms first, then reads, then writes.
    fn dispatch(
        &mut self,
        stage: &'static str,
        kernel: Kernel,
        uniforms: &[&wgpu::Buffer],
        reads: &[usize],
        writes: &[usize],
        workgroups: (u32, u32),
    ) -> Result<()> {
        self.begin()?;
        check_bindings(reads, writes)?;

        let storage = reads
            .iter()
            .chain(writes)
            .map(|&id| lookup(&self.buffers, id))
            .collect::<Result<Vec<_>>>()?;

        let entries: Vec<wgpu::BindGroupEntry> = uniforms
            .iter()
            .copied()
            .chain(storage)
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let pipeline = self.kernels.get(kernel);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(stage),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        let device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Ocean Compute Encoder"),
            })
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(stage),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups.0, workgroups.1, 1);
        }

        self.finish(stage);
        Ok(())
    }
}

fn lookup(buffers: &[wgpu::Buffer], id: usize) -> Result<&wgpu::Buffer> {
    buffers.get(id).ok_or(OceanError::UnknownResource(id))
}

fn workgroups(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(WORKGROUP_SIZE), height.div_ceil(WORKGROUP_SIZE))
}

fn ensure_square<F: TexelFormat>(handle: Handle<F>, n: u32) -> Result<()> {
    handle.ensure_extent(n, n)
}

fn byte_size<F: TexelFormat>(handle: Handle<F>) -> u64 {
    (handle.texel_count() * std::mem::size_of::<F::Texel>()) as u64
}

impl ComputeDevice for WgpuDevice {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn create_texture<F: TexelFormat>(&mut self, width: u32, height: u32) -> Result<Handle<F>> {
        let handle = Handle::new(self.buffers.len(), width, height);
        // Empty tables still need a bindable buffer
        let size = byte_size(handle).max(16);
        let label = format!("{} texture {}", F::NAME, handle.id());

        self.buffers.push(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        Ok(handle)
    }

    fn upload<F: TexelFormat>(&mut self, target: Write<F>, texels: &[F::Texel]) -> Result<()> {
        if texels.len() != target.0.texel_count() {
            return Err(OceanError::GridMismatch {
                expected: target.0.texel_count(),
                actual: texels.len(),
            });
        }
        self.flush();
        let buffer = lookup(&self.buffers, target.0.id())?;
        self.queue
            .write_buffer(buffer, 0, bytemuck::cast_slice(texels));
        Ok(())
    }

    fn height_zero(
        &mut self,
        params: &WaveParams,
        gaussian: Read<Rg32F>,
        spectrum: Write<Rgba32F>,
    ) -> Result<()> {
        ensure_square(gaussian.0, params.n)?;
        ensure_square(spectrum.0, params.n)?;

        let uniform = self.uniform("Height Zero Params", params);
        self.dispatch(
            "height zero",
            Kernel::HeightZero,
            &[&uniform],
            &[gaussian.0.id()],
            &[spectrum.0.id()],
            workgroups(params.n, params.n),
        )
    }

    fn spectra(
        &mut self,
        params: &WaveParams,
        spectrum: Read<Rgba32F>,
        fields: [Write<Rg32F>; 5],
    ) -> Result<()> {
        ensure_square(spectrum.0, params.n)?;
        for field in &fields {
            ensure_square(field.0, params.n)?;
        }

        let uniform = self.uniform("Spectra Params", params);
        self.dispatch(
            "spectra",
            Kernel::Spectra,
            &[&uniform],
            &[spectrum.0.id()],
            &fields.map(|f| f.0.id()),
            workgroups(params.n, params.n),
        )
    }

    fn butterfly(&mut self, params: &WaveParams, table: Write<Rgba32F>) -> Result<()> {
        table.0.ensure_extent(params.n, params.log2_n)?;

        let uniform = self.uniform("Butterfly Params", params);
        self.dispatch(
            "butterfly",
            Kernel::Butterfly,
            &[&uniform],
            &[],
            &[table.0.id()],
            workgroups(params.n, params.log2_n),
        )
    }

    fn ifft_stage(
        &mut self,
        params: &WaveParams,
        pass: IfftPass,
        butterfly: Read<Rgba32F>,
        input: Read<Rg32F>,
        output: Write<Rg32F>,
    ) -> Result<()> {
        butterfly.0.ensure_extent(params.n, params.log2_n)?;
        ensure_square(input.0, params.n)?;
        ensure_square(output.0, params.n)?;

        let uniform = self.uniform("IFFT Params", params);
        let pass_uniform = self.uniform("IFFT Pass", &PassUniform::from(pass));
        self.dispatch(
            "ifft stage",
            Kernel::Ifft,
            &[&uniform, &pass_uniform],
            &[butterfly.0.id(), input.0.id()],
            &[output.0.id()],
            workgroups(params.n, params.n),
        )
    }

    fn blit(&mut self, source: Read<Rg32F>, target: Write<Rg32F>) -> Result<()> {
        source.0.ensure_extent(target.0.width(), target.0.height())?;
        self.begin()?;
        check_bindings(&[source.0.id()], &[target.0.id()])?;

        let size = byte_size(source.0);
        let from = lookup(&self.buffers, source.0.id())?;
        let to = lookup(&self.buffers, target.0.id())?;
        let device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Ocean Compute Encoder"),
            })
        });
        encoder.copy_buffer_to_buffer(from, 0, to, 0, size);

        self.finish("blit");
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
        for field in &fields {
            ensure_square(field.0, params.n)?;
        }
        ensure_square(displacement.0, params.n)?;
        ensure_square(normal.0, params.n)?;

        let uniform = self.uniform("Normalize Params", params);
        self.dispatch(
            "normalize permute",
            Kernel::Normalize,
            &[&uniform],
            &fields.map(|f| f.0.id()),
            &[displacement.0.id(), normal.0.id()],
            workgroups(params.n, params.n),
        )
    }

    fn barrier(&mut self) -> Result<()> {
        self.flush();
        self.unfenced = None;
        self.stats.barriers += 1;
        Ok(())
    }

    fn readback<F: TexelFormat>(&mut self, source: Read<F>) -> Result<Vec<F::Texel>> {
        self.begin()?;
        let size = byte_size(source.0);
        if size == 0 {
            return Ok(Vec::new());
        }

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(lookup(&self.buffers, source.0.id())?, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| OceanError::Gpu(format!("readback never completed: {e}")))?
            .map_err(|e| OceanError::Gpu(format!("failed to map readback buffer: {e}")))?;

        let texels = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, F::Texel>(&data).to_vec()
        };
        staging.unmap();
        Ok(texels)
    }

    fn stats(&self) -> DispatchStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::OceanConfig;
    use crate::pipeline::{HostDevice, ParallelPipeline};

    /// None on hosts without an adapter; those runs skip the GPU checks
    fn device() -> Option<WgpuDevice> {
        match WgpuDevice::new() {
            Ok(device) => Some(device),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }

    fn config() -> OceanConfig {
        OceanConfig {
            n: 16,
            wave_length: 16.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_barrier() {
        let Some(mut device) = device() else { return };
        let params = config().wave_params();
        let table = device.create_texture::<Rgba32F>(16, 4).unwrap();

        device.butterfly(&params, table.write()).unwrap();
        assert_eq!(
            device.readback(table.read()),
            Err(OceanError::MissingBarrier("butterfly"))
        );
        device.barrier().unwrap();
        assert_eq!(device.readback(table.read()).unwrap().len(), 64);
    }

    #[test]
    fn test_butterfly_matches_host() {
        let Some(device) = device() else { return };
        let mut gpu = ParallelPipeline::new(device, &config()).unwrap();
        let mut host = ParallelPipeline::new(HostDevice::new(), &config()).unwrap();

        let (gpu_table, host_table) = (gpu.butterfly_table().unwrap(), host.butterfly_table().unwrap());
        for (g, h) in gpu_table.iter().zip(&host_table) {
            // Indices are exact, twiddles within f32 trig accuracy
            assert_eq!((g[2], g[3]), (h[2], h[3]));
            assert!((g[0] - h[0]).abs() < 1e-5 && (g[1] - h[1]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_surface_matches_host() {
        let Some(device) = device() else { return };
        let config = config();
        let mut gpu = ParallelPipeline::new(device, &config).unwrap();
        let mut host = ParallelPipeline::new(HostDevice::new(), &config).unwrap();

        let a = gpu.run(4.5).unwrap();
        let b = host.run(4.5).unwrap();
        let (lo, hi) = b.min_max_height();
        let tolerance = 1e-3 * lo.abs().max(hi.abs()).max(1.0);

        for (g, h) in a.samples().iter().zip(b.samples()) {
            assert!((g.height - h.height).abs() <= tolerance);
            assert!((g.dx - h.dx).abs() <= tolerance);
            assert!((g.dz - h.dz).abs() <= tolerance);
            assert!((g.normal - h.normal).length() <= 1e-3);
        }
    }
}
