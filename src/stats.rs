//! Nucleotide statistics (C1): per-position A/C/G/T counts over a read submatrix.

use ndarray::{Array2, ArrayView2, ArrayViewD, Ix2};

use crate::error::{CoreError, CoreResult};

/// ACGT statistics of a read matrix already known to be 2-D.
///
/// `m` has shape (n_reads, n_snvs) with entries in `0..=4` (0 is a gap). Returns an
/// (n_snvs, 4) matrix whose (j, c) entry is the number of reads carrying nucleotide `c + 1`
/// at position `j`. Gap cells contribute to no column.
pub fn acgt_count(m: ArrayView2<i32>) -> Array2<u32> {
    let n_snvs = m.ncols();
    let mut out = Array2::<u32>::zeros((n_snvs, 4));
    for (j, column) in m.columns().into_iter().enumerate() {
        for &symbol in column.iter() {
            if symbol >= 1 && symbol <= 4 {
                out[[j, (symbol - 1) as usize]] += 1;
            }
        }
    }
    out
}

/// Same as [`acgt_count`] but for call sites that only have a dynamic-dimension array (e.g. one
/// freshly parsed from disk). Fails with [`CoreError::ShapeError`] unless `m` is exactly 2-D.
pub fn acgt_count_dyn(m: &ArrayViewD<i32>) -> CoreResult<Array2<u32>> {
    if m.ndim() != 2 {
        return Err(CoreError::ShapeError { ndim: m.ndim() });
    }
    let view = m
        .view()
        .into_dimensionality::<Ix2>()
        .expect("ndim checked above");
    Ok(acgt_count(view))
}
