//! Sparse Adjacency Matrices
//!
//! Compressed sparse row storage for adjacency matrices built from a graph.
//! Rows and columns follow the graph's node index order.

use serde::{Deserialize, Serialize};

/// What the non-zero entries of an adjacency matrix hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatrixMode {
    /// Every present relation is stored as `1.0`.
    #[default]
    Binary,
    /// Present relations store the (summed) edge weight.
    Weighted,
}

/// Square or rectangular matrix in compressed sparse row form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Builds a matrix from per-row `(column, value)` entries.
    ///
    /// Entries are sorted by column; repeated columns in a row are summed.
    /// Columns outside `0..cols` are ignored.
    pub fn from_rows(cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Self {
        let num_rows = rows.len();
        let mut row_ptr = Vec::with_capacity(num_rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);

        for mut row in rows {
            row.retain(|(c, _)| *c < cols);
            row.sort_by_key(|(c, _)| *c);
            let mut last: Option<usize> = None;
            for (c, v) in row {
                if last == Some(c) {
                    if let Some(slot) = values.last_mut() {
                        *slot += v;
                    }
                } else {
                    col_idx.push(c);
                    values.push(v);
                    last = Some(c);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            rows: num_rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Matrix with no entries.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self::from_rows(cols, vec![Vec::new(); rows])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Value at `(row, col)`, `0.0` when absent or out of range.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.rows {
            return 0.0;
        }
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        match self.col_idx[start..end].binary_search(&col) {
            Ok(pos) => self.values[start + pos],
            Err(_) => 0.0,
        }
    }

    /// Stored `(column, value)` entries of one row.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = if row < self.rows {
            (self.row_ptr[row], self.row_ptr[row + 1])
        } else {
            (0, 0)
        };
        self.col_idx[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// Transposed copy.
    pub fn transpose(&self) -> Self {
        let mut rows = vec![Vec::new(); self.cols];
        for r in 0..self.rows {
            for (c, v) in self.row(r) {
                rows[c].push((r, v));
            }
        }
        Self::from_rows(self.rows, rows)
    }

    /// True when the matrix is square and equal to its transpose.
    pub fn is_symmetric(&self) -> bool {
        self.rows == self.cols && *self == self.transpose()
    }

    /// Matrix-vector product. Missing vector entries count as zero.
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        (0..self.rows)
            .map(|r| {
                self.row(r)
                    .map(|(c, v)| v * x.get(c).copied().unwrap_or(0.0))
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_sums_duplicates() {
        let m = SparseMatrix::from_rows(3, vec![vec![(2, 1.0), (0, 2.0), (2, 0.5)], vec![]]);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.get(0, 2), 1.5);
        assert_eq!(m.get(0, 0), 2.0);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.get(7, 0), 0.0);
    }

    #[test]
    fn test_transpose_and_symmetry() {
        let m = SparseMatrix::from_rows(2, vec![vec![(1, 1.0)], vec![]]);
        assert!(!m.is_symmetric());
        let t = m.transpose();
        assert_eq!(t.get(1, 0), 1.0);
        let sym = SparseMatrix::from_rows(2, vec![vec![(1, 1.0)], vec![(0, 1.0)]]);
        assert!(sym.is_symmetric());
    }

    #[test]
    fn test_mul_vec() {
        let m = SparseMatrix::from_rows(2, vec![vec![(0, 1.0), (1, 2.0)], vec![(1, 3.0)]]);
        assert_eq!(m.mul_vec(&[1.0, 1.0]), vec![3.0, 3.0]);
    }
}
