//! Command-line argument parsing.

use clap::Parser;
use glam::{UVec2, Vec2};

use spectral_ocean::ocean::BackendKind;
use spectral_ocean::params::{ExportConfig, OceanConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "spectral-ocean")]
#[command(about = "Simulate a spectral ocean tile and export it as images", long_about = None)]
pub struct Args {
    /// Samples per axis (power of two)
    #[arg(long, default_value_t = 64)]
    pub n: usize,

    /// Maximum wave extent (object-space units)
    #[arg(long, value_name = "UNITS", default_value_t = 64.0)]
    pub wave_length: f32,

    /// World-space size of one tile (meters)
    #[arg(long, value_name = "METERS", default_value_t = 10.0)]
    pub dimension: f32,

    /// Phillips spectrum scale
    #[arg(long, default_value_t = 1.0)]
    pub spectrum_scale: f32,

    /// Wind direction, x component
    #[arg(long, default_value_t = 0.707, allow_hyphen_values = true)]
    pub wind_x: f32,

    /// Wind direction, z component
    #[arg(long, default_value_t = 0.707, allow_hyphen_values = true)]
    pub wind_z: f32,

    /// Wind speed (m/s)
    #[arg(long, value_name = "M/S", default_value_t = 12.0)]
    pub wind_speed: f32,

    /// Period after which the surface repeats (seconds)
    #[arg(long, value_name = "SECONDS", default_value_t = 20.0)]
    pub period: f32,

    /// RNG seed for the initial spectrum
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Executor: sequential (default), parallel, gpu
    #[arg(long, default_value = "sequential")]
    pub backend: String,

    /// Simulation time of the snapshot (seconds)
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,

    /// Output directory
    #[arg(long, default_value = "ocean")]
    pub output: String,

    /// Also export the FFT butterfly table
    #[arg(long)]
    pub butterfly: bool,
}

impl Args {
    /// Ocean parameters from the flags; everything else keeps its default
    pub fn ocean_config(&self) -> OceanConfig {
        OceanConfig {
            n: self.n,
            wave_length: self.wave_length,
            dimension: self.dimension,
            spectrum_scale: self.spectrum_scale,
            wind_direction: Vec2::new(self.wind_x, self.wind_z),
            wind_speed: self.wind_speed,
            period_time: self.period,
            tile_count: UVec2::ONE,
            seed: self.seed,
            ..Default::default()
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            butterfly: self.butterfly,
            ..ExportConfig::new(self.output.clone(), self.time)
        }
    }

    /// Parse the executor name
    pub fn parse_backend(&self) -> Result<BackendKind, String> {
        match self.backend.to_lowercase().as_str() {
            "sequential" => Ok(BackendKind::Sequential),
            "parallel" => Ok(BackendKind::Parallel),
            "gpu" => Ok(BackendKind::Gpu),
            other => Err(format!(
                "unknown backend '{other}' (expected sequential, parallel or gpu)"
            )),
        }
    }
}
