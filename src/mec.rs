//! MEC evaluation (C6): reassign every original read to the closest reconstructed haplotype by
//! identical-nucleotide count, then score the result with Minimum Error Correction.

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use crate::numeric::argmax_u32;
use crate::stats::acgt_count;

/// Result of scoring one (K, sign) branch's peeled haplotypes against the full original matrix.
#[derive(Debug, Clone)]
pub struct MecOutcome {
    pub mec: u64,
    /// Haplotypes after the "one more majority vote" refinement pass.
    pub recon_v2: Array2<i32>,
    /// Final per-read haplotype assignment against `recon_v2`.
    pub assignment: Vec<usize>,
}

/// Reassign reads, run the second majority vote, and compute MEC.
///
/// `ori_acgt` is the ACGT statistics of the *entire* original matrix, used as the fallback prior
/// for positions no read assigned to a haplotype happens to cover.
pub fn evaluate(s: ArrayView2<i32>, recon_v: &Array2<i32>, ori_acgt: &Array2<u32>, rng: &mut StdRng) -> MecOutcome {
    let l = s.ncols();
    let num_haplotypes = recon_v.nrows();

    let first_assignment = reassign(s, recon_v);

    let mut recon_v2 = Array2::<i32>::zeros((num_haplotypes, l));
    for h in 0..num_haplotypes {
        let member_rows: Vec<usize> = (0..s.nrows())
            .filter(|&i| first_assignment[i] == h)
            .collect();
        let single_sta = if member_rows.is_empty() {
            Array2::<u32>::zeros((l, 4))
        } else {
            let members = s.select(Axis(0), &member_rows);
            acgt_count(members.view())
        };
        for j in 0..l {
            let row = single_sta.row(j);
            let row = row.as_slice().unwrap();
            if row.iter().sum::<u32>() != 0 {
                recon_v2[[h, j]] = (argmax_u32(row) + 1) as i32;
            } else {
                let fallback = ori_acgt.row(j);
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
                recon_v2[[h, j]] = (chosen + 1) as i32;
            }
        }
    }

    let assignment = reassign(s, &recon_v2);

    let mut mec = 0u64;
    for i in 0..s.nrows() {
        let hap = recon_v2.row(assignment[i]);
        for j in 0..l {
            let observed = s[[i, j]];
            if observed != 0 && observed != hap[j] {
                mec += 1;
            }
        }
    }

    MecOutcome {
        mec,
        recon_v2,
        assignment,
    }
}

/// Assign each read in `s` to the haplotype in `haplotypes` with the most identical nucleotides.
fn reassign(s: ArrayView2<i32>, haplotypes: &Array2<i32>) -> Vec<usize> {
    let num_haplotypes = haplotypes.nrows();
    (0..s.nrows())
        .map(|i| {
            let row = s.row(i);
            let mut best_h = 0usize;
            let mut best_ident = -1i64;
            for h in 0..num_haplotypes {
                let ident = row
                    .iter()
                    .zip(haplotypes.row(h).iter())
                    .filter(|(&a, &b)| a == b)
                    .count() as i64;
                if ident > best_ident {
                    best_ident = ident;
                    best_h = h;
                }
            }
            best_h
        })
        .collect()
}
