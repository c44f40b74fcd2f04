//! Successive clustering (C5): given a starting rank, repeatedly run alternating minimization,
//! peel off the most dominant haplotype, decrement the rank, and repeat.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use statrs::distribution::{Binomial, Discrete};

use crate::alternating_minimization::alternating_minimize;
use crate::error::CoreResult;
use crate::numeric::argmax_u32;
use crate::stats::acgt_count;
use crate::svd_init::Sign;
use crate::threshold::MismatchThresholds;

/// Outcome of a successive-clustering run: `None` if the empty-selection guard (step 5) fired
/// before every haplotype slot was filled, in which case this (K, sign) branch is abandoned.
pub type ClusterOutcome = Option<Array2<i32>>;

/// Peel `r0` haplotypes out of `s` (the full SNV matrix), one per outer iteration.
pub fn successive_cluster(
    s: ArrayView2<i32>,
    r0: usize,
    sign: Sign,
    seq_err: f64,
    thresholds: &MismatchThresholds,
    rng: &mut StdRng,
) -> CoreResult<ClusterOutcome> {
    let l = s.ncols();

    let mut active: Vec<usize> = (0..s.nrows()).collect();
    let mut mis_cri: Vec<usize> = active
        .iter()
        .map(|&i| {
            let nongap = s.row(i).iter().filter(|&&v| v != 0).count();
            thresholds.criterion(nongap)
        })
        .collect();

    let mut recon: Vec<Array1<i32>> = Vec::with_capacity(r0);
    let mut r = r0;

    while r > 0 && active.len() > r {
        let m_active = s.select(Axis(0), &active);

        let outcome = alternating_minimize(m_active.view(), r, sign, rng)?;

        let domi = dominant_haplotype(&outcome.assignment, r);
        let mut v_star = outcome.v.row(domi).to_owned();

        let acgt_active = acgt_count(m_active.view());

        let mut selected = Vec::new();
        for idx in 0..active.len() {
            let row = m_active.row(idx);
            let nongap = row.iter().filter(|&&v| v != 0).count();
            let ident = row
                .iter()
                .zip(v_star.iter())
                .filter(|(&a, &b)| a == b)
                .count();
            let hd = nongap - ident;

            let select = if hd == 0 {
                true
            } else if hd <= mis_cri[idx] {
                let mut pr_variant = 1.0f64;
                for (j, &symbol) in row.iter().enumerate() {
                    if symbol != 0 {
                        let column_total: u32 = acgt_active.row(j).sum();
                        pr_variant *=
                            acgt_active[[j, (symbol - 1) as usize]] as f64 / column_total as f64;
                    }
                }
                let pr_seq = Binomial::new(seq_err, nongap as u64)
                    .expect("seq_err must be a valid probability")
                    .pmf(hd as u64);
                pr_seq > pr_variant
            } else {
                false
            };

            if select {
                selected.push(idx);
            }
        }

        if selected.is_empty() {
            return Ok(None);
        }

        let selected_rows = m_active.select(Axis(0), &selected);
        let addi_count = acgt_count(selected_rows.view());
        for j in 0..l {
            let row = addi_count.row(j);
            if row.sum() != 0 {
                v_star[j] = (argmax_u32(row.as_slice().unwrap()) + 1) as i32;
            }
        }
        recon.push(v_star);

        let selected_set: std::collections::HashSet<usize> = selected.into_iter().collect();
        let mut next_active = Vec::with_capacity(active.len() - selected_set.len());
        let mut next_mis_cri = Vec::with_capacity(active.len() - selected_set.len());
        for (idx, &orig) in active.iter().enumerate() {
            if !selected_set.contains(&idx) {
                next_active.push(orig);
                next_mis_cri.push(mis_cri[idx]);
            }
        }
        active = next_active;
        mis_cri = next_mis_cri;

        r -= 1;
    }

    // A requested rank at or above the active read count never enters the peel loop at all, so
    // nothing was recovered. Treat this the same as the empty-selection guard: this (K, sign)
    // branch is unusable rather than a haplotype set callers would index into.
    if recon.is_empty() {
        return Ok(None);
    }

    let mut haplotypes = Array2::<i32>::zeros((recon.len(), l));
    for (i, row) in recon.into_iter().enumerate() {
        haplotypes.row_mut(i).assign(&row);
    }
    Ok(Some(haplotypes))
}

fn dominant_haplotype(assignment: &[usize], rank: usize) -> usize {
    let mut counts = vec![0usize; rank];
    for &r in assignment {
        counts[r] += 1;
    }
    let mut best = 0usize;
    for r in 1..rank {
        if counts[r] > counts[best] {
            best = r;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    #[test]
    fn peeling_preserves_read_totals() {
        let s = Array2::<i32>::from_shape_fn((60, 8), |(i, j)| {
            if i < 30 {
                (j % 4) as i32 + 1
            } else {
                ((j + 2) % 4) as i32 + 1
            }
        });
        let thresholds = MismatchThresholds::build(0.002);
        let mut rng = StdRng::seed_from_u64(3);
        let result = successive_cluster(s.view(), 2, Sign::Plus, 0.002, &thresholds, &mut rng)
            .unwrap();
        assert!(result.is_some());
        let haplotypes = result.unwrap();
        assert_eq!(haplotypes.ncols(), 8);
        assert!(haplotypes.nrows() <= 2);
    }

    #[test]
    fn requesting_rank_at_or_above_read_count_yields_no_branch() {
        let s = Array2::<i32>::from_shape_fn((5, 6), |(_, j)| (j % 4) as i32 + 1);
        let thresholds = MismatchThresholds::build(0.002);
        let mut rng = StdRng::seed_from_u64(13);
        let result = successive_cluster(s.view(), 5, Sign::Plus, 0.002, &thresholds, &mut rng)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn single_haplotype_population_peels_exactly_one() {
        let s = Array2::<i32>::from_shape_fn((50, 6), |(_, j)| (j % 4) as i32 + 1);
        let thresholds = MismatchThresholds::build(0.002);
        let mut rng = StdRng::seed_from_u64(11);
        let haplotypes = successive_cluster(s.view(), 1, Sign::Plus, 0.002, &thresholds, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(haplotypes.nrows(), 1);
        assert_eq!(haplotypes.row(0).to_vec(), vec![1, 2, 3, 4, 1, 2]);
    }
}
