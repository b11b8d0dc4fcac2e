//! Square complex-valued grid.

use std::ops::{Index, IndexMut};

use num_complex::Complex32;

use crate::error::{OceanError, Result};

/// N×N complex samples in row-major order (row = z, column = x)
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexGrid {
    n: usize,
    cells: Vec<Complex32>,
}

impl ComplexGrid {
    /// Zero-filled grid
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            cells: vec![Complex32::new(0.0, 0.0); n * n],
        }
    }

    /// Wrap existing row-major cells. Fails if `cells.len() != n * n`.
    pub fn from_cells(n: usize, cells: Vec<Complex32>) -> Result<Self> {
        if cells.len() != n * n {
            return Err(OceanError::invalid(format!(
                "expected {} cells for a {n}x{n} grid, got {}",
                n * n,
                cells.len()
            )));
        }
        Ok(Self { n, cells })
    }

    /// Build a grid by evaluating `f(x, z)` for every cell
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> Complex32) -> Self {
        let mut cells = Vec::with_capacity(n * n);
        for z in 0..n {
            for x in 0..n {
                cells.push(f(x, z));
            }
        }
        Self { n, cells }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn cells(&self) -> &[Complex32] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Complex32] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<Complex32> {
        self.cells
    }

    /// Row `z` (constant z, varying x)
    pub fn row(&self, z: usize) -> &[Complex32] {
        &self.cells[z * self.n..(z + 1) * self.n]
    }

    /// Copy of column `x` (constant x, varying z)
    pub fn column(&self, x: usize) -> Vec<Complex32> {
        (0..self.n).map(|z| self.cells[z * self.n + x]).collect()
    }

    pub fn set_row(&mut self, z: usize, values: &[Complex32]) {
        self.cells[z * self.n..(z + 1) * self.n].copy_from_slice(values);
    }

    pub fn set_column(&mut self, x: usize, values: &[Complex32]) {
        for (z, value) in values.iter().enumerate() {
            self.cells[z * self.n + x] = *value;
        }
    }

    /// Fails unless `other` has the same dimensions
    pub fn ensure_same_size(&self, other: &ComplexGrid) -> Result<()> {
        if self.n != other.n {
            return Err(OceanError::GridMismatch {
                expected: self.n,
                actual: other.n,
            });
        }
        Ok(())
    }

    /// Largest magnitude of any cell (0 for an empty grid)
    pub fn max_norm(&self) -> f32 {
        self.cells.iter().map(|c| c.norm()).fold(0.0, f32::max)
    }
}

/// Indexed by `(x, z)`
impl Index<(usize, usize)> for ComplexGrid {
    type Output = Complex32;

    fn index(&self, (x, z): (usize, usize)) -> &Complex32 {
        &self.cells[z * self.n + x]
    }
}

impl IndexMut<(usize, usize)> for ComplexGrid {
    fn index_mut(&mut self, (x, z): (usize, usize)) -> &mut Complex32 {
        &mut self.cells[z * self.n + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let grid = ComplexGrid::from_fn(4, |x, z| Complex32::new(x as f32, z as f32));

        assert_eq!(grid[(3, 1)], Complex32::new(3.0, 1.0));
        assert_eq!(grid.cells()[4 + 3], Complex32::new(3.0, 1.0));
        assert_eq!(grid.row(2)[1], Complex32::new(1.0, 2.0));
        assert_eq!(grid.column(1)[2], Complex32::new(1.0, 2.0));
    }

    #[test]
    fn test_set_column_round_trip() {
        let mut grid = ComplexGrid::zeros(4);
        let column: Vec<_> = (0..4).map(|i| Complex32::new(i as f32, 0.0)).collect();
        grid.set_column(2, &column);

        assert_eq!(grid.column(2), column);
        assert_eq!(grid[(2, 3)], Complex32::new(3.0, 0.0));
        assert_eq!(grid[(1, 3)], Complex32::new(0.0, 0.0));
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert!(ComplexGrid::from_cells(4, vec![Complex32::new(0.0, 0.0); 15]).is_err());
        assert!(ComplexGrid::from_cells(4, vec![Complex32::new(0.0, 0.0); 16]).is_ok());
    }

    #[test]
    fn test_size_mismatch() {
        let a = ComplexGrid::zeros(4);
        let b = ComplexGrid::zeros(8);
        assert_eq!(
            a.ensure_same_size(&b),
            Err(OceanError::GridMismatch {
                expected: 4,
                actual: 8
            })
        );
    }
}
