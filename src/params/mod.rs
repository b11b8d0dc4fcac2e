//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable constants live here with:
//! - Physical units (meters, seconds, etc.)
//! - Documented ranges and meanings
//! - Validation at construction time

mod export;
mod ocean;

// Re-export all types
pub use export::ExportConfig;
pub use ocean::{
    OceanConfig, WaveParams, CHOPPINESS, DISPLACEMENT_EPSILON, GRAVITY, SPECTRUM_EPSILON,
};
