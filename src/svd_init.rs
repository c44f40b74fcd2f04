//! SVD-based seeding of the haplotype tensor `Vt` for one alternating-minimization run.
//!
//! Grounded in `factorization/seeding.rs`'s use of `ndarray_linalg::SVD` for NNDSVD seeding; this
//! solver does not need NNDSVD's sign-splitting, only a rank-truncated SVD of the tensor-encoded
//! read matrix, scaled by the square root of the singular values.

use ndarray::{s, Array1, Array2};
use ndarray_linalg::SVD;

use crate::error::{CoreError, CoreResult};

/// Which sign branch of the SVD initialization is in effect. The non-convex alternating
/// minimization is sign-sensitive, so both are explored per rank and the one with lower MEC wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

/// Seed `Vt` (shape `(rank, t.ncols())`) from a rank-truncated SVD of `t`.
///
/// Singular values/vectors from a full LAPACK SVD come back in descending order; the top `rank`
/// triplets are kept and then row-reversed so the largest singular component ends up last,
/// matching the ascending-order convention of truncated sparse SVD solvers this tensor layout
/// was designed around.
pub fn seed(t: &Array2<f64>, rank: usize, sign: Sign) -> CoreResult<Array2<f64>> {
    let (rows, cols) = t.dim();
    if rank == 0 || rank > rows.min(cols) {
        return Err(CoreError::SvdFailure { rank, rows, cols });
    }

    let (_, s, vt) = t
        .svd(false, true)
        .map_err(|_| CoreError::SvdFailure { rank, rows, cols })?;
    let vt = vt.ok_or(CoreError::SvdFailure { rank, rows, cols })?;

    let s_top: Array1<f64> = s.slice(s![..rank]).to_owned();
    let vt_top = vt.slice(s![..rank, ..]).to_owned();

    let mut scaled = Array2::<f64>::zeros((rank, cols));
    for i in 0..rank {
        let scale = s_top[i].max(0.0).sqrt();
        scaled.row_mut(i).assign(&(&vt_top.row(i) * scale));
    }

    // Reverse row order so the largest singular component is last.
    let mut vt0 = Array2::<f64>::zeros((rank, cols));
    for i in 0..rank {
        vt0.row_mut(i).assign(&scaled.row(rank - 1 - i));
    }

    if sign == Sign::Minus {
        vt0.mapv_inplace(|x| -x);
    }

    Ok(vt0)
}
