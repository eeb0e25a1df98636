use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Default relative tolerance of `Mueller::allclose`.
pub const RTOL: f32 = 1e-5;
/// Default absolute tolerance of `Mueller::allclose`.
pub const ATOL: f32 = 1e-8;

/// A 4x4 Mueller matrix acting on Stokes vectors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mueller(pub [[f32; 4]; 4]);

impl Mueller {
    pub const IDENTITY: Mueller = Mueller([
        [1., 0., 0., 0.],
        [0., 1., 0., 0.],
        [0., 0., 1., 0.],
        [0., 0., 0., 1.],
    ]);

    /// Builds a matrix from 16 row major values.
    pub fn from_row_major(values: &[f32; 16]) -> Self {
        let mut m = [[0.; 4]; 4];
        for (row, chunk) in m.iter_mut().zip(values.chunks_exact(4)) {
            row.copy_from_slice(chunk);
        }
        Self(m)
    }

    /// Whether every element satisfies `|a - b| <= atol + rtol * |b|`, with
    /// `other` as `b`.
    pub fn allclose_with(&self, other: &Mueller, rtol: f32, atol: f32) -> bool {
        self.0
            .iter()
            .flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= atol + rtol * b.abs())
    }

    pub fn allclose(&self, other: &Mueller) -> bool {
        self.allclose_with(other, RTOL, ATOL)
    }

    /// Applies the matrix to a Stokes vector.
    pub fn apply(&self, stokes: [f32; 4]) -> [f32; 4] {
        self.0
            .map(|row| row.iter().zip(stokes).map(|(m, s)| m * s).sum())
    }
}

impl Index<(usize, usize)> for Mueller {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        &self.0[row][col]
    }
}

impl IndexMut<(usize, usize)> for Mueller {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        &mut self.0[row][col]
    }
}

impl fmt::Display for Mueller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",\n ")?;
            }
            write!(
                f,
                "[{:.8}, {:.8}, {:.8}, {:.8}]",
                row[0], row[1], row[2], row[3]
            )?;
        }
        write!(f, "]")
    }
}
