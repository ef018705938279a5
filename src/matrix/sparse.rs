//! Compressed sparse row matrices and triplet assembly.

use crate::core::traits::{Indexing, MatVec};
use crate::error::Error;
use num_traits::Float;

/// A read-only sparse matrix supporting y = A * x.
pub trait SparseMatrix<T> {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Number of stored entries.
    fn nnz(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[T], y: &mut [T]);
}

/// Owned CSR storage.
///
/// Rows are contiguous slices of `col_idx`/`values` delimited by `row_ptr`.
/// Column indices within a row are sorted and unique.
pub struct CsrMatrix<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Float> CsrMatrix<T> {
    /// Build a CSR matrix from raw row-pointer, column-index, and value arrays.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, Error> {
        if row_ptr.len() != nrows + 1 {
            return Err(Error::AssemblyError(format!(
                "row_ptr has length {}, expected {}",
                row_ptr.len(),
                nrows + 1
            )));
        }
        if row_ptr[0] != 0 || *row_ptr.last().unwrap() != col_idx.len() {
            return Err(Error::AssemblyError(
                "row_ptr must start at 0 and end at nnz".into(),
            ));
        }
        if col_idx.len() != values.len() {
            return Err(Error::AssemblyError(
                "col_idx and values have different lengths".into(),
            ));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::AssemblyError("row_ptr is not monotone".into()));
        }
        if col_idx.iter().any(|&j| j >= ncols) {
            return Err(Error::AssemblyError("column index out of bounds".into()));
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    /// Build a CSR matrix from `(row, col, value)` triplets.
    ///
    /// Duplicate entries accumulate, matching the semantics the
    /// finite-difference assembly relies on when a stencil coefficient and a
    /// boundary fold-in target the same slot.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, Error> {
        for &(i, j, _) in triplets {
            if i >= nrows || j >= ncols {
                return Err(Error::AssemblyError(format!(
                    "triplet ({i}, {j}) out of bounds for {nrows}x{ncols}"
                )));
            }
        }

        // Counting sort by row, then order and merge duplicates within rows.
        let mut row_counts = vec![0usize; nrows + 1];
        for &(i, _, _) in triplets {
            row_counts[i + 1] += 1;
        }
        for i in 0..nrows {
            row_counts[i + 1] += row_counts[i];
        }
        let mut slot = row_counts.clone();
        let mut cols = vec![0usize; triplets.len()];
        let mut vals = vec![T::zero(); triplets.len()];
        for &(i, j, v) in triplets {
            cols[slot[i]] = j;
            vals[slot[i]] = v;
            slot[i] += 1;
        }

        let mut row_ptr = vec![0usize; nrows + 1];
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        for i in 0..nrows {
            let lo = row_counts[i];
            let hi = row_counts[i + 1];
            let mut row: Vec<(usize, T)> =
                cols[lo..hi].iter().copied().zip(vals[lo..hi].iter().copied()).collect();
            row.sort_by_key(|&(j, _)| j);
            for (j, v) in row {
                if col_idx.len() > row_ptr[i] && *col_idx.last().unwrap() == j {
                    let last = values.len() - 1;
                    values[last] = values[last] + v;
                } else {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr[i + 1] = col_idx.len();
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    /// Iterate the stored entries of row `i` as `(col, value)` pairs.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let lo = self.row_ptr[i];
        let hi = self.row_ptr[i + 1];
        self.col_idx[lo..hi].iter().copied().zip(self.values[lo..hi].iter().copied())
    }
}

impl<T: Float> SparseMatrix<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
    fn ncols(&self) -> usize {
        self.ncols
    }
    fn nnz(&self) -> usize {
        self.values.len()
    }
    fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows);
        for i in 0..self.nrows {
            let lo = self.row_ptr[i];
            let hi = self.row_ptr[i + 1];
            let mut sum = T::zero();
            for k in lo..hi {
                sum = sum + self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
    }
}

impl<T: Float> MatVec<Vec<T>> for CsrMatrix<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        self.spmv(x.as_slice(), y.as_mut_slice());
    }
}

impl<T> Indexing for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
}
