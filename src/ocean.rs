//! Spectral ocean: initial spectrum, time evolution, synthesis and tile mesh.
//!
//! ```text
//! OceanConfig ──> spectrum (H₀ pairs, once)
//!                    │
//!   simulate(t) ──> evolution ──> 5 × inverse FFT ──> normalize ──> TileMesh
//! ```
//!
//! The same math runs on one of several executors (see [`BackendKind`]).

pub mod evolution;
pub mod mesh;
pub mod normalize;
pub mod sequential;
pub mod spectrum;

use glam::{Mat4, UVec2, Vec2, Vec3};

use crate::error::{OceanError, Result};
use crate::params::{OceanConfig, WaveParams};
use crate::pipeline::{HostDevice, ParallelPipeline};

use mesh::{TileMesh, WaveVertex};
use normalize::{SurfaceFields, SurfaceSample};
use sequential::SequentialEngine;
use spectrum::{gaussian_draws, spectral_samples, SpectralSample};

/// An executor that turns the precomputed spectrum into a surface
pub trait SimulationBackend {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Surface at `time` (seconds). Nothing is published on error.
    fn simulate(&mut self, time: f32) -> Result<SurfaceFields>;

    /// Rebuild H₀ for new wind parameters, keeping the original random draws
    fn update_spectrum(&mut self, params: &WaveParams) -> Result<()>;
}

/// Which executor an [`Ocean`] runs on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Single thread, plain loops
    Sequential,
    /// Stage-barriered compute pipeline on the host thread pool
    Parallel,
    /// Stage-barriered compute pipeline on a GPU (feature `gpu`)
    Gpu,
}

/// Per-column water depth range used by screen-space effects downstream.
///
/// Sized by the render target, independent of the spectral grids.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterDepthRanges {
    pub width: u32,
    pub height: u32,
    pub min_depth: Vec<f32>,
    pub max_depth: Vec<f32>,
}

impl WaterDepthRanges {
    pub fn new(width: u32, height: u32) -> Self {
        let columns = width as usize;
        Self {
            width,
            height,
            min_depth: vec![f32::INFINITY; columns],
            max_depth: vec![f32::NEG_INFINITY; columns],
        }
    }

    /// Reset every column to an empty range
    pub fn clear(&mut self) {
        self.min_depth.fill(f32::INFINITY);
        self.max_depth.fill(f32::NEG_INFINITY);
    }

    /// Widen the range of `column` to include `depth`
    pub fn record(&mut self, column: usize, depth: f32) {
        if let (Some(lo), Some(hi)) = (
            self.min_depth.get_mut(column),
            self.max_depth.get_mut(column),
        ) {
            *lo = lo.min(depth);
            *hi = hi.max(depth);
        }
    }
}

/// Tileable spectral ocean
pub struct Ocean {
    config: OceanConfig,
    kind: BackendKind,
    backend: Box<dyn SimulationBackend>,
    mesh: TileMesh,
    surface: SurfaceFields,
    /// Draws and H₀ pairs kept for point queries
    draws: Vec<Vec2>,
    samples: Vec<SpectralSample>,
    position: Vec3,
    animation_time: f32,
    depth_ranges: Option<WaterDepthRanges>,
}

impl Ocean {
    /// Ocean on the sequential executor
    pub fn new(config: OceanConfig) -> Result<Self> {
        Self::with_backend(config, BackendKind::Sequential)
    }

    /// Validate `config` and build the ocean on the chosen executor
    pub fn with_backend(config: OceanConfig, kind: BackendKind) -> Result<Self> {
        config.validate()?;

        let backend: Box<dyn SimulationBackend> = match kind {
            BackendKind::Sequential => Box::new(SequentialEngine::new(&config)?),
            BackendKind::Parallel => Box::new(ParallelPipeline::new(HostDevice::new(), &config)?),
            BackendKind::Gpu => gpu_backend(&config)?,
        };
        log::info!("Ocean backend: {} (N = {})", backend.name(), config.n);

        let mesh = TileMesh::build_grid(&config);
        let surface = SurfaceFields::flat(config.n);
        let draws = gaussian_draws(config.n, config.seed);
        let samples = spectral_samples(&draws, &config.wave_params());

        Ok(Self {
            config,
            kind,
            backend,
            mesh,
            surface,
            draws,
            samples,
            position: Vec3::ZERO,
            animation_time: 0.0,
            depth_ranges: None,
        })
    }

    /// Advance the surface to absolute time `time` (seconds).
    ///
    /// The time is wrapped into one period first and must be finite. The
    /// mesh and height map change only if the whole step succeeds.
    pub fn simulate(&mut self, time: f32) -> Result<()> {
        let wrapped = self.wrap_time(time)?;
        let surface = self.backend.simulate(wrapped)?;
        self.mesh.refresh_positions(&surface)?;
        self.surface = surface;

        log::trace!("Simulated t = {time} (wrapped {wrapped})");
        Ok(())
    }

    /// Height, displacement and normal at tile-local `location` (object
    /// space, before the model matrix) at absolute `time` (seconds).
    ///
    /// Evaluated directly from the spectrum, so any point works, not just
    /// grid cells. Costs O(N²) per call.
    pub fn surface_at(&self, location: Vec2, time: f32) -> Result<SurfaceSample> {
        let wrapped = self.wrap_time(time)?;
        let params = self.config.wave_params().at_time(wrapped);
        sequential::surface_at(&self.samples, location, wrapped, &params)
    }

    /// Advance the animation clock by `delta` seconds and simulate
    pub fn advance(&mut self, delta: f32) -> Result<()> {
        self.update_animation_time(self.animation_time + delta)?;
        self.simulate(self.animation_time)
    }

    /// Set the animation clock (seconds, wrapped into one period)
    pub fn update_animation_time(&mut self, time: f32) -> Result<()> {
        self.animation_time = self.wrap_time(time)?;
        Ok(())
    }

    fn wrap_time(&self, time: f32) -> Result<f32> {
        if !time.is_finite() {
            return Err(OceanError::invalid(format!(
                "simulation time has to be finite, got {time}"
            )));
        }
        Ok(time.rem_euclid(self.config.period_time))
    }

    pub fn animation_time(&self) -> f32 {
        self.animation_time
    }

    pub fn config(&self) -> &OceanConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Surface of the last successful step
    pub fn surface(&self) -> &SurfaceFields {
        &self.surface
    }

    /// Heights, N×N row-major
    pub fn height_map(&self) -> Vec<f32> {
        self.surface.heights()
    }

    /// Choppy x displacement, N×N row-major
    pub fn dx(&self) -> Vec<f32> {
        self.surface.dx()
    }

    /// Choppy z displacement, N×N row-major
    pub fn dz(&self) -> Vec<f32> {
        self.surface.dz()
    }

    pub fn mesh(&self) -> &TileMesh {
        &self.mesh
    }

    pub fn vertices(&self) -> &[WaveVertex] {
        &self.mesh.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    pub fn min_max_height(&self) -> (f32, f32) {
        self.surface.min_max_height()
    }

    /// Object-space extent of one tile
    pub fn tile_size(&self) -> f32 {
        self.config.wave_length
    }

    pub fn tile_count(&self) -> UVec2 {
        self.config.tile_count
    }

    pub fn water_height(&self) -> f32 {
        self.config.water_height
    }

    pub fn set_water_height(&mut self, height: f32) {
        self.config.water_height = height;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// translate(position) · translate(0, water height, 0) · scale(dimension / wave length)
    pub fn model_matrix(&self) -> Mat4 {
        let scale = self.config.dimension / self.config.wave_length;
        Mat4::from_translation(self.position)
            * Mat4::from_translation(Vec3::new(0.0, self.config.water_height, 0.0))
            * Mat4::from_scale(Vec3::splat(scale))
    }

    /// One model matrix per tile instance, row by row.
    ///
    /// Tiles step by `dimension` along +x and along -z (local z is negated).
    pub fn tile_transforms(&self) -> Vec<Mat4> {
        let model = self.model_matrix();
        let step = self.config.dimension;
        let count = self.config.tile_count;

        (0..count.y)
            .flat_map(|j| {
                (0..count.x).map(move |i| {
                    Mat4::from_translation(Vec3::new(i as f32 * step, 0.0, -(j as f32 * step)))
                        * model
                })
            })
            .collect()
    }

    /// Change the wind and rebuild the initial spectrum with the same draws.
    ///
    /// The current surface is kept until the next [`Ocean::simulate`].
    pub fn set_wind(&mut self, direction: Vec2, speed: f32) -> Result<()> {
        let config = OceanConfig {
            wind_direction: direction,
            wind_speed: speed,
            ..self.config.clone()
        };
        config.validate()?;
        let params = config.wave_params();
        self.backend.update_spectrum(&params)?;
        self.samples = spectral_samples(&self.draws, &params);

        log::debug!("Wind changed: direction = {direction}, speed = {speed} m/s");
        self.config = config;
        Ok(())
    }

    /// Reallocate the per-column depth ranges for a new render target size.
    /// Spectral grids are sized by N alone and stay untouched.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(OceanError::invalid(format!(
                "render target must be at least 1x1, got {width}x{height}"
            )));
        }
        self.depth_ranges = Some(WaterDepthRanges::new(width, height));
        Ok(())
    }

    pub fn water_depth_ranges(&self) -> Option<&WaterDepthRanges> {
        self.depth_ranges.as_ref()
    }

    pub fn water_depth_ranges_mut(&mut self) -> Option<&mut WaterDepthRanges> {
        self.depth_ranges.as_mut()
    }
}

#[cfg(feature = "gpu")]
fn gpu_backend(config: &OceanConfig) -> Result<Box<dyn SimulationBackend>> {
    let device = crate::pipeline::WgpuDevice::new()?;
    Ok(Box::new(ParallelPipeline::new(device, config)?))
}

#[cfg(not(feature = "gpu"))]
fn gpu_backend(_config: &OceanConfig) -> Result<Box<dyn SimulationBackend>> {
    Err(OceanError::GpuUnavailable(
        "built without the `gpu` feature".to_string(),
    ))
}
