//! Radix-2 FFT: plan tables, butterfly engine and a direct-DFT oracle.
//!
//! ```text
//! FftPlan (bit reversal + twiddles, built once per N)
//!    └─> FftEngine: columns pass, then rows pass
//!           each line: bit-reverse load -> log2 N stages -> unshuffle
//! ```

pub mod dft;
mod engine;
mod grid;
mod plan;

pub use engine::{
    fft_stage, synthesis_unshuffle, transform_line, Axis, FftEngine, Unshuffle,
};
pub use grid::ComplexGrid;
pub use plan::{ButterflyEntry, Direction, FftPlan};
