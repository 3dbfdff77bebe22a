//! Row-partitioned sparse matrices.
//!
//! Each worker owns a contiguous range of rows of every assembled matrix.
//! Entries are inserted additively into the owned rows and compressed into
//! CSR form once, on [`MatrixSink::finalize`]; after that the matrix is
//! read-only.

use std::ops::Range;
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use tracing::debug;
use crate::error::{ ConfigError, MatrixError, Result };

/// Position of one worker among `size` cooperating workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    rank: usize,
    size: usize,
}

impl Default for Partition {
    fn default() -> Self { Self::serial() }
}

impl Partition {
    /// Create a new `Partition`; fails unless `rank < size`.
    pub fn new(rank: usize, size: usize) -> Result<Self> {
        if rank < size {
            Ok(Self { rank, size })
        } else {
            Err(ConfigError::InvalidWorkers { rank, size }.into())
        }
    }

    /// A single worker owning every row.
    pub fn serial() -> Self { Self { rank: 0, size: 1 } }

    /// All ranks of a `size`-worker layout.
    pub fn all(size: usize) -> impl Iterator<Item = Self> {
        (0..size).map(move |rank| Self { rank, size })
    }

    pub fn rank(&self) -> usize { self.rank }

    pub fn size(&self) -> usize { self.size }

    /// Rows of an `n`-row matrix owned by this worker.
    ///
    /// Rows are split as evenly as possible; the first `n mod size` ranks own
    /// one extra row.
    pub fn row_range(&self, n: usize) -> Range<usize> {
        let base = n / self.size;
        let extra = n % self.size;
        let start = self.rank * base + self.rank.min(extra);
        let len = base + usize::from(self.rank < extra);
        start..start + len
    }
}

/// Minimal interface of a distributed matrix being assembled.
pub trait MatrixSink {
    /// Global (square) dimension.
    fn dim(&self) -> usize;

    /// Rows owned by this worker.
    fn ownership(&self) -> Range<usize>;

    /// Add `val` to the entry at `(row, col)`.
    fn add_value(&mut self, row: usize, col: usize, val: C64)
        -> std::result::Result<(), MatrixError>;

    /// Compress all pending entries. Must be called exactly once, by every
    /// worker, before the matrix is read.
    fn finalize(&mut self) -> std::result::Result<(), MatrixError>;

    /// Return `true` once [`Self::finalize`] has been called.
    fn is_finalized(&self) -> bool;
}

/// The locally owned rows of a row-partitioned sparse matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct DistMatrix {
    dim: usize,
    rows: Range<usize>,
    pending: Vec<Vec<(usize, C64)>>,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<C64>,
    finalized: bool,
    fingerprint: Option<u64>,
}

impl MatrixSink for DistMatrix {
    fn dim(&self) -> usize { self.dim }

    fn ownership(&self) -> Range<usize> { self.rows.clone() }

    fn add_value(&mut self, row: usize, col: usize, val: C64)
        -> std::result::Result<(), MatrixError>
    {
        if self.finalized { return Err(MatrixError::Finalized); }
        if !self.rows.contains(&row) {
            return Err(MatrixError::RowNotOwned {
                row,
                start: self.rows.start,
                end: self.rows.end,
            });
        }
        if col >= self.dim {
            return Err(MatrixError::ColumnOutOfRange { col, dim: self.dim });
        }
        self.pending[row - self.rows.start].push((col, val));
        Ok(())
    }

    fn finalize(&mut self) -> std::result::Result<(), MatrixError> {
        if self.finalized { return Err(MatrixError::Finalized); }
        let pending = std::mem::take(&mut self.pending);
        self.indptr = Vec::with_capacity(pending.len() + 1);
        self.indptr.push(0);
        for mut row in pending.into_iter() {
            // stable, so duplicates are summed in insertion order
            row.sort_by_key(|(col, _)| *col);
            let mut iter = row.into_iter();
            if let Some((mut prev, mut running)) = iter.next() {
                for (col, val) in iter {
                    if col == prev {
                        running += val;
                    } else {
                        self.indices.push(prev);
                        self.data.push(running);
                        prev = col;
                        running = val;
                    }
                }
                self.indices.push(prev);
                self.data.push(running);
            }
            self.indptr.push(self.indices.len());
        }
        self.finalized = true;
        debug!(
            dim = self.dim,
            start = self.rows.start,
            end = self.rows.end,
            nnz = self.data.len(),
            "finalized matrix",
        );
        Ok(())
    }

    fn is_finalized(&self) -> bool { self.finalized }
}

impl DistMatrix {
    /// Create a new, empty `dim × dim` matrix owning the rows assigned to
    /// `partition`.
    pub fn new(dim: usize, partition: Partition) -> Self {
        let rows = partition.row_range(dim);
        Self {
            dim,
            pending: vec![Vec::new(); rows.len()],
            rows,
            indptr: Vec::new(),
            indices: Vec::new(),
            data: Vec::new(),
            finalized: false,
            fingerprint: None,
        }
    }

    pub(crate) fn set_fingerprint(&mut self, fingerprint: u64) {
        self.fingerprint = Some(fingerprint);
    }

    /// Fingerprint of the term set the matrix was assembled from, if any.
    pub fn fingerprint(&self) -> Option<u64> { self.fingerprint }

    fn check_finalized(&self) -> std::result::Result<(), MatrixError> {
        if self.finalized { Ok(()) } else { Err(MatrixError::NotFinalized) }
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize { self.data.len() }

    /// Column indices and values of an owned row.
    pub fn row(&self, row: usize) -> Result<(&[usize], &[C64])> {
        self.check_finalized()?;
        if !self.rows.contains(&row) {
            return Err(MatrixError::RowNotOwned {
                row,
                start: self.rows.start,
                end: self.rows.end,
            }.into());
        }
        let k = row - self.rows.start;
        let span = self.indptr[k]..self.indptr[k + 1];
        Ok((&self.indices[span.clone()], &self.data[span]))
    }

    /// Element at `(row, col)` of an owned row; zero if not stored.
    pub fn get(&self, row: usize, col: usize) -> Result<C64> {
        let (cols, vals) = self.row(row)?;
        Ok(
            cols.binary_search(&col)
                .map(|k| vals[k])
                .unwrap_or_else(|_| C64::zero())
        )
    }

    /// Iterate over all stored `(row, col, value)` triples in row-major
    /// order. Empty before finalization.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, C64)> + '_ {
        let start = self.rows.start;
        self.indptr.iter().zip(self.indptr.iter().skip(1))
            .enumerate()
            .flat_map(move |(k, (&lo, &hi))| {
                (lo..hi).map(move |j| (start + k, self.indices[j], self.data[j]))
            })
    }

    /// Diagonal elements of the owned rows.
    pub fn diagonal(&self) -> Result<nd::Array1<C64>> {
        self.rows.clone()
            .map(|r| self.get(r, r))
            .collect()
    }

    /// Owned rows of `self · x` for a full-length vector `x`.
    pub fn mul_vec(&self, x: &nd::Array1<C64>) -> Result<nd::Array1<C64>> {
        self.check_finalized()?;
        if x.len() != self.dim {
            return Err(MatrixError::DimensionMismatch {
                expected: self.dim,
                got: x.len(),
            }.into());
        }
        let y: nd::Array1<C64>
            = self.indptr.iter().zip(self.indptr.iter().skip(1))
            .map(|(&lo, &hi)| {
                (lo..hi).map(|j| self.data[j] * x[self.indices[j]]).sum()
            })
            .collect();
        Ok(y)
    }

    /// Dense copy of the full matrix; rows not owned by this worker are
    /// zero.
    pub fn to_dense(&self) -> Result<nd::Array2<C64>> {
        self.check_finalized()?;
        let mut a: nd::Array2<C64> = nd::Array2::zeros((self.dim, self.dim));
        self.iter().for_each(|(i, j, v)| { a[[i, j]] += v; });
        Ok(a)
    }

    /// Gather the pieces assembled by every worker into a single matrix that
    /// owns all rows.
    ///
    /// The pieces must be finalized, share a dimension, cover `0..dim`
    /// without gaps, and carry the same term-set fingerprint.
    pub fn stitch<I>(parts: I) -> Result<Self>
    where I: IntoIterator<Item = Self>
    {
        let mut parts: Vec<Self> = parts.into_iter().collect();
        parts.sort_by_key(|part| part.rows.start);
        let Some(first) = parts.first() else {
            return Err(ConfigError::InvalidWorkers { rank: 0, size: 0 }.into());
        };
        let dim = first.dim;
        let fingerprint = first.fingerprint;
        let mut next_row: usize = 0;
        for part in parts.iter() {
            part.check_finalized()?;
            if part.dim != dim {
                return Err(MatrixError::DimensionMismatch {
                    expected: dim,
                    got: part.dim,
                }.into());
            }
            if part.fingerprint != fingerprint {
                return Err(ConfigError::DivergentTerms.into());
            }
            if part.rows.start != next_row {
                return Err(MatrixError::NonContiguous(next_row).into());
            }
            next_row = part.rows.end;
        }
        if next_row != dim {
            return Err(MatrixError::NonContiguous(next_row).into());
        }
        let nnz: usize = parts.iter().map(|part| part.nnz()).sum();
        let mut indptr: Vec<usize> = Vec::with_capacity(dim + 1);
        let mut indices: Vec<usize> = Vec::with_capacity(nnz);
        let mut data: Vec<C64> = Vec::with_capacity(nnz);
        indptr.push(0);
        for part in parts.into_iter() {
            let offset = indices.len();
            indptr.extend(part.indptr.iter().skip(1).map(|k| k + offset));
            indices.extend(part.indices);
            data.extend(part.data);
        }
        Ok(Self {
            dim,
            rows: 0..dim,
            pending: Vec::new(),
            indptr,
            indices,
            data,
            finalized: true,
            fingerprint,
        })
    }
}
