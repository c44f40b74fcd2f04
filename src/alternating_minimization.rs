//! Alternating minimization (C4): for a fixed haplotype count `R`, alternate read assignment
//! (U) and majority-vote reconstruction (V) until a composite convergence criterion triggers.

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;

use crate::config::{ERROR_THRE, MAX_ITE};
use crate::error::CoreResult;
use crate::numeric::argmax_u32;
use crate::stats::acgt_count;
use crate::svd_init::{self, Sign};
use crate::tensor;

/// Outcome of one alternating-minimization run at fixed rank.
#[derive(Debug, Clone)]
pub struct AmOutcome {
    /// Reconstructed haplotypes, shape `(rank, l)`, entries in `1..=4`.
    pub v: Array2<i32>,
    /// `assignment[i]` is the haplotype index read `i` was assigned to in the final U-update.
    pub assignment: Vec<usize>,
    pub iterations: usize,
}

/// Run alternating minimization to convergence (or to the iteration cap) on `m`.
///
/// `m` must have more rows than `rank`; the caller (successive clustering, C5) must not invoke
/// this once the active submatrix has shrunk to `rank` or fewer reads.
pub fn alternating_minimize(
    m: ArrayView2<i32>,
    rank: usize,
    sign: Sign,
    rng: &mut StdRng,
) -> CoreResult<AmOutcome> {
    let (n, l) = m.dim();
    debug_assert!(n > rank, "AM must not be invoked with rows <= rank");

    let t = tensor::encode(m);
    let p = tensor::projection(m);
    let pt = tensor::tile_projection(&p);
    let acgt = acgt_count(m);

    let mut vt = svd_init::seed(&t, rank, sign)?;
    // Sentinel "last" haplotype tensor so the first iteration's err_hap cannot spuriously
    // satisfy the convergence test.
    let mut vt_last = Array2::<f64>::from_elem((rank, t.ncols()), 100.0);

    let mut v = Array2::<i32>::zeros((rank, l));
    let mut assignment = vec![0usize; n];
    let mut prev_err: Option<f64> = None;
    let mut iterations = 0usize;

    loop {
        iterations += 1;

        // U-update: assign each read to the haplotype minimizing the projected squared distance
        // against the *current* Vt.
        let distances: Vec<Vec<f64>> = (0..rank)
            .into_par_iter()
            .map(|r| {
                let vt_row = vt.row(r);
                (0..n)
                    .map(|i| {
                        let mut acc = 0.0;
                        for j in 0..t.ncols() {
                            let d = (t[[i, j]] - vt_row[j]) * pt[[i, j]];
                            acc += d * d;
                        }
                        acc
                    })
                    .collect()
            })
            .collect();
        for i in 0..n {
            let mut best_r = 0usize;
            let mut best_d = distances[0][i];
            for r in 1..rank {
                if distances[r][i] < best_d {
                    best_d = distances[r][i];
                    best_r = r;
                }
            }
            assignment[i] = best_r;
        }

        // V-update: majority vote per haplotype, falling back to the submatrix ACGT counts for
        // positions no member read covers.
        v = Array2::<i32>::zeros((rank, l));
        for r in 0..rank {
            let member_rows: Vec<usize> = (0..n).filter(|&i| assignment[i] == r).collect();
            let single_sta = if member_rows.is_empty() {
                Array2::<u32>::zeros((l, 4))
            } else {
                let members = m.select(Axis(0), &member_rows);
                acgt_count(members.view())
            };
            for j in 0..l {
                let row = single_sta.row(j);
                let row = row.as_slice().unwrap();
                if row.iter().sum::<u32>() != 0 {
                    v[[r, j]] = (argmax_u32(row) + 1) as i32;
                } else {
                    let fallback = acgt.row(j);
                    let fallback = fallback.as_slice().unwrap();
                    let max_val = *fallback.iter().max().unwrap();
                    let ties: Vec<usize> = fallback
                        .iter()
                        .enumerate()
                        .filter(|(_, &c)| c == max_val)
                        .map(|(c, _)| c)
                        .collect();
                    let chosen = if ties.len() == 1 {
                        ties[0]
                    } else {
                        ties[rng.gen_range(0..ties.len())]
                    };
                    v[[r, j]] = (chosen + 1) as i32;
                }
            }
        }
        let vt_new = tensor::encode(v.view());

        // Convergence: Frobenius norm of the projected residual, its change since last
        // iteration, and the (rank-normalized) haplotype-tensor drift.
        let mut err_sq = 0.0;
        for i in 0..n {
            let vt_row = vt_new.row(assignment[i]);
            for j in 0..t.ncols() {
                let d = (t[[i, j]] - vt_row[j]) * pt[[i, j]];
                err_sq += d * d;
            }
        }
        let err = err_sq.sqrt();
        let err_com = match prev_err {
            None => f64::INFINITY,
            Some(prev) => (err - prev).abs(),
        };
        let err_hap = frobenius_norm(&(&vt_new - &vt_last)) / (4.0 * l as f64 / rank as f64).sqrt();

        vt_last = vt_new.clone();
        vt = vt_new;
        prev_err = Some(err);

        log::trace!(
            "ite: {ite}; err: {err}; err_Com: {err_com}; err_hap: {err_hap}; R: {rank}",
            ite = iterations
        );

        if err <= ERROR_THRE && err_com <= ERROR_THRE && err_hap <= ERROR_THRE {
            break;
        }
        if iterations >= MAX_ITE {
            break;
        }
    }

    Ok(AmOutcome {
        v,
        assignment,
        iterations,
    })
}

fn frobenius_norm(a: &Array2<f64>) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}
