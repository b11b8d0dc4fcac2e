//! Ocean simulation parameters and physical constants.

use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2};

use crate::error::{OceanError, Result};

/// Gravitational acceleration (m/s²)
pub const GRAVITY: f32 = 9.81;

/// Horizontal displacement scale for choppy waves (dimensionless).
/// Negative values push wave crests together.
pub const CHOPPINESS: f32 = -0.8;

/// Wave vectors shorter than this carry no energy in the Phillips spectrum
pub const SPECTRUM_EPSILON: f32 = 0.0001;

/// Wave vectors shorter than this produce no horizontal displacement
pub const DISPLACEMENT_EPSILON: f32 = 0.000001;

/// Immutable parameters of one spectral ocean
#[derive(Debug, Clone, PartialEq)]
pub struct OceanConfig {
    /// Unique samples per axis (power of two, > 0).
    /// The tile mesh has n + 1 vertices per side.
    pub n: usize,

    /// Maximum spatial extent of a wave (object-space units).
    /// Also the object-space size of one tile.
    pub wave_length: f32,

    /// World-space size of one tile (meters)
    pub dimension: f32,

    /// Scale factor applied to the Phillips spectrum (> 0)
    pub spectrum_scale: f32,

    /// Wind direction on the x-z plane (normalized on use, must be non-zero)
    pub wind_direction: Vec2,

    /// Wind speed (m/s)
    pub wind_speed: f32,

    /// Simulation period (seconds); the wave field repeats after this long
    pub period_time: f32,

    /// Number of tile instances along local x and z
    pub tile_count: UVec2,

    /// Vertical offset of the water plane (meters)
    pub water_height: f32,

    /// Horizontal displacement scale (see [`CHOPPINESS`])
    pub choppiness: f32,

    /// Seed for the Gaussian draws of the initial spectrum
    pub seed: u64,
}

impl Default for OceanConfig {
    fn default() -> Self {
        Self {
            n: 64,
            wave_length: 64.0,
            dimension: 10.0,
            spectrum_scale: 1.0,
            wind_direction: Vec2::new(0.707, 0.707),
            wind_speed: 12.0,
            period_time: 20.0,
            tile_count: UVec2::ONE,
            water_height: 0.0,
            choppiness: CHOPPINESS,
            seed: 42,
        }
    }
}

impl OceanConfig {
    /// Validate configuration. Nothing is clamped; every violation is an error.
    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(OceanError::invalid("N has to be greater than 0"));
        }
        if !self.n.is_power_of_two() {
            return Err(OceanError::invalid(format!(
                "N has to be a power of 2, got {}",
                self.n
            )));
        }
        if !(self.wave_length > 0.0) {
            return Err(OceanError::invalid("wave length has to be greater than 0"));
        }
        if !(self.dimension > 0.0) {
            return Err(OceanError::invalid("dimension has to be greater than 0"));
        }
        if !(self.spectrum_scale > 0.0) {
            return Err(OceanError::invalid(
                "spectrum scale has to be greater than 0",
            ));
        }
        if !(self.wind_direction.length() > 0.0) {
            return Err(OceanError::invalid(
                "length of wind direction has to be greater than 0",
            ));
        }
        if !(self.period_time > 0.0) {
            return Err(OceanError::invalid("period time has to be greater than 0"));
        }
        if self.tile_count.x == 0 || self.tile_count.y == 0 {
            return Err(OceanError::invalid("tile count has to be at least 1x1"));
        }
        Ok(())
    }

    /// log2(n)
    pub fn log2_n(&self) -> u32 {
        self.n.trailing_zeros()
    }

    /// Vertices per mesh side (n + 1)
    pub fn point_count(&self) -> usize {
        self.n + 1
    }

    /// Normalized wind direction
    pub fn wind_unit(&self) -> Vec2 {
        self.wind_direction.normalize_or_zero()
    }

    /// Base angular frequency 2π / period
    pub fn base_frequency(&self) -> f32 {
        std::f32::consts::TAU / self.period_time
    }

    /// Per-cell wave parameters at time 0
    pub fn wave_params(&self) -> WaveParams {
        let wind = self.wind_unit();
        WaveParams {
            n: self.n as u32,
            log2_n: self.log2_n(),
            wave_length: self.wave_length,
            spectrum_scale: self.spectrum_scale,
            wind_x: wind.x,
            wind_z: wind.y,
            wind_speed: self.wind_speed,
            period_time: self.period_time,
            time: 0.0,
            choppiness: self.choppiness,
            _padding: [0.0; 2],
        }
    }
}

/// Parameters every per-cell kernel reads.
///
/// Layout matches the `Params` uniform block of the compute shaders
/// (48 bytes, scalars only).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WaveParams {
    pub n: u32,
    pub log2_n: u32,
    pub wave_length: f32,
    pub spectrum_scale: f32,
    /// Normalized wind direction (x component)
    pub wind_x: f32,
    /// Normalized wind direction (z component)
    pub wind_z: f32,
    /// Wind speed (m/s)
    pub wind_speed: f32,
    /// Simulation period (seconds)
    pub period_time: f32,
    /// Simulation time of the current frame (seconds, already wrapped)
    pub time: f32,
    pub choppiness: f32,
    pub _padding: [f32; 2],
}

impl WaveParams {
    pub fn wind_unit(&self) -> Vec2 {
        Vec2::new(self.wind_x, self.wind_z)
    }

    /// Base angular frequency 2π / period
    pub fn base_frequency(&self) -> f32 {
        std::f32::consts::TAU / self.period_time
    }

    /// Same parameters evaluated at `time`
    pub fn at_time(self, time: f32) -> Self {
        Self { time, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OceanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let config = OceanConfig {
            n: 6,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OceanError::InvalidArgument(_))
        ));

        let config = OceanConfig {
            n: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OceanError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_degenerate_parameters() {
        let cases = [
            OceanConfig {
                wind_direction: Vec2::ZERO,
                ..Default::default()
            },
            OceanConfig {
                dimension: 0.0,
                ..Default::default()
            },
            OceanConfig {
                spectrum_scale: -1.0,
                ..Default::default()
            },
            OceanConfig {
                period_time: 0.0,
                ..Default::default()
            },
            OceanConfig {
                wave_length: f32::NAN,
                ..Default::default()
            },
            OceanConfig {
                tile_count: UVec2::new(0, 1),
                ..Default::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(OceanError::InvalidArgument(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_derived_values() {
        let config = OceanConfig {
            n: 16,
            period_time: 10.0,
            ..Default::default()
        };
        assert_eq!(config.log2_n(), 4);
        assert_eq!(config.point_count(), 17);
        assert!((config.base_frequency() - std::f32::consts::TAU / 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_wave_params_layout() {
        assert_eq!(std::mem::size_of::<WaveParams>(), 48);

        let config = OceanConfig {
            n: 32,
            wind_direction: Vec2::new(0.0, 2.0),
            ..Default::default()
        };
        let params = config.wave_params();
        assert_eq!(params.n, 32);
        assert_eq!(params.log2_n, 5);
        assert_eq!(params.wind_unit(), Vec2::new(0.0, 1.0));
        assert_eq!(params.at_time(3.0).time, 3.0);
        assert_eq!(params.base_frequency(), config.base_frequency());
    }
}
