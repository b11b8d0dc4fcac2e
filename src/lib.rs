//! Spectral ocean - FFT-synthesized, tileable wave surfaces
//!
//! Phillips spectrum, deep-water dispersion and a radix-2 inverse FFT,
//! running on a single thread or as a stage-barriered compute pipeline.

pub mod error;
pub mod fft;
pub mod ocean;
pub mod params;
pub mod pipeline;
