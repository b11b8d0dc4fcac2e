//! Precomputed FFT tables: bit-reversal permutation, twiddle factors, butterfly entries.

use std::f64::consts::TAU;

use num_complex::Complex32;

use crate::error::{OceanError, Result};

/// Transform direction.
///
/// `Inverse` uses twiddles e^{+2πi·k/size}, `Forward` their conjugates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

/// Read-only tables for radix-2 decimation-in-time transforms of length `n`.
///
/// Built once per `n` and shared by every line, grid and stage that uses it.
#[derive(Debug, Clone)]
pub struct FftPlan {
    n: usize,
    log2_n: usize,
    reversed: Vec<usize>,
    /// One table per stage; stage `s` holds 2^s factors e^{2πi·k/2^(s+1)}
    twiddles: Vec<Vec<Complex32>>,
}

/// One cell of the butterfly table: `out[p] = in[a] + twiddle * in[b]`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ButterflyEntry {
    pub twiddle: Complex32,
    pub a: usize,
    pub b: usize,
}

impl ButterflyEntry {
    /// RGBA32F texel layout: (twiddle.re, twiddle.im, a, b)
    pub fn to_texel(self) -> [f32; 4] {
        [self.twiddle.re, self.twiddle.im, self.a as f32, self.b as f32]
    }

    pub fn from_texel(texel: [f32; 4]) -> Self {
        Self {
            twiddle: Complex32::new(texel[0], texel[1]),
            a: texel[2] as usize,
            b: texel[3] as usize,
        }
    }
}

impl FftPlan {
    /// Build the tables for length `n`. Fails unless `n` is a power of two.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 || !n.is_power_of_two() {
            return Err(OceanError::invalid(format!(
                "FFT size must be a power of 2, got {n}"
            )));
        }
        let log2_n = n.trailing_zeros() as usize;

        let reversed = (0..n).map(|i| reverse_bits(i, log2_n)).collect();

        let twiddles = (0..log2_n)
            .map(|stage| {
                let half = 1usize << stage;
                let size = half * 2;
                (0..half)
                    .map(|k| {
                        let angle = TAU * k as f64 / size as f64;
                        Complex32::new(angle.cos() as f32, angle.sin() as f32)
                    })
                    .collect()
            })
            .collect();

        log::debug!("FFT plan: n = {n}, {log2_n} stages");

        Ok(Self {
            n,
            log2_n,
            reversed,
            twiddles,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn log2_n(&self) -> usize {
        self.log2_n
    }

    /// Bit-reversal permutation table (length n)
    pub fn reversed(&self) -> &[usize] {
        &self.reversed
    }

    /// Number of per-stage twiddle tables (log2 n)
    pub fn stage_count(&self) -> usize {
        self.twiddles.len()
    }

    /// Twiddle factor `k` of `stage` for the given direction
    pub fn twiddle(&self, stage: usize, k: usize, direction: Direction) -> Complex32 {
        let w = self.twiddles[stage][k];
        match direction {
            Direction::Inverse => w,
            Direction::Forward => w.conj(),
        }
    }

    /// Butterfly table cell for `stage` and output `position` of an inverse transform.
    ///
    /// Lower wings use +w, upper wings -w; stage 0 addresses the input through
    /// the bit-reversal table, so the table alone encodes the whole transform.
    pub fn butterfly_entry(&self, stage: usize, position: usize) -> ButterflyEntry {
        let half = 1usize << stage;
        let size = half * 2;
        let block = position / size * size;
        let k = position % size;

        let (k, upper) = if k < half { (k, false) } else { (k - half, true) };
        let mut a = block + k;
        let mut b = a + half;

        let w = self.twiddles[stage][k];
        let twiddle = if upper { -w } else { w };

        if stage == 0 {
            a = self.reversed[a];
            b = self.reversed[b];
        }

        ButterflyEntry { twiddle, a, b }
    }

    /// Whole butterfly table, `log2 n` rows of `n` texels
    pub fn butterfly_table(&self) -> Vec<[f32; 4]> {
        (0..self.log2_n)
            .flat_map(|stage| (0..self.n).map(move |p| self.butterfly_entry(stage, p).to_texel()))
            .collect()
    }
}

fn reverse_bits(i: usize, bits: usize) -> usize {
    if bits == 0 {
        return 0;
    }
    i.reverse_bits() >> (usize::BITS as usize - bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(FftPlan::new(0).is_err());
        assert!(FftPlan::new(6).is_err());
        assert!(FftPlan::new(1).is_ok());
    }

    #[test]
    fn test_table_sizes() {
        let plan = FftPlan::new(16).unwrap();
        assert_eq!(plan.reversed().len(), 16);
        assert_eq!(plan.stage_count(), 4);
        assert_eq!(plan.butterfly_table().len(), 16 * 4);
    }

    #[test]
    fn test_bit_reversal() {
        let plan = FftPlan::new(8).unwrap();
        assert_eq!(plan.reversed(), &[0, 4, 2, 6, 1, 5, 3, 7]);

        // Reversal is an involution
        for i in 0..8 {
            assert_eq!(plan.reversed()[plan.reversed()[i]], i);
        }
    }

    #[test]
    fn test_twiddles_are_unit_roots() {
        let plan = FftPlan::new(8).unwrap();

        // Last stage: e^{2πi k/8}
        let w = plan.twiddle(2, 2, Direction::Inverse);
        assert!((w.re - 0.0).abs() < 1e-6);
        assert!((w.im - 1.0).abs() < 1e-6);

        let w = plan.twiddle(2, 2, Direction::Forward);
        assert!((w.im + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_butterfly_wings() {
        let plan = FftPlan::new(8).unwrap();

        // Stage 1 (size 4): position 1 pairs with 3, position 3 is the upper wing of 1
        let lower = plan.butterfly_entry(1, 1);
        let upper = plan.butterfly_entry(1, 3);
        assert_eq!((lower.a, lower.b), (1, 3));
        assert_eq!((upper.a, upper.b), (1, 3));
        assert_eq!(upper.twiddle, -lower.twiddle);

        // Stage 0 addresses through the bit-reversal table
        let first = plan.butterfly_entry(0, 2);
        assert_eq!((first.a, first.b), (plan.reversed()[2], plan.reversed()[3]));
    }

    #[test]
    fn test_texel_round_trip() {
        let plan = FftPlan::new(32).unwrap();
        let entry = plan.butterfly_entry(3, 21);
        assert_eq!(ButterflyEntry::from_texel(entry.to_texel()), entry);
    }
}
