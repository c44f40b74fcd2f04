//! Post-processor (C8): reassign reads against the chosen haplotypes one last time, drop
//! duplicates, aggregate frequencies, and refine the reported population size via matrix rank.

use ndarray::{Array2, ArrayView2, Axis};
use ndarray_linalg::SVD;

use crate::numeric::argmax_u32;
use crate::stats::acgt_count;

/// One finalized strain: its sequence and the fraction of reads assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Strain {
    pub sequence: Vec<i32>,
    pub frequency: f64,
}

/// Collapse `recon_v2` into the final reported strain list.
///
/// Unlike the majority vote in C4/C6, uncovered positions here are left as gaps (0) rather than
/// filled from ACGT priors, so the resulting `V_del` faithfully reflects what the assigned reads
/// actually cover; this is what the rank computation below is meant to measure.
pub fn finalize(s: ArrayView2<i32>, recon_v2: &Array2<i32>) -> Vec<Strain> {
    let n = s.nrows();
    let l = s.ncols();
    let num_haplotypes = recon_v2.nrows();

    let assignment = reassign(s, recon_v2);

    let mut v_del = Array2::<i32>::zeros((num_haplotypes, l));
    let mut counts = vec![0usize; num_haplotypes];
    for &h in &assignment {
        counts[h] += 1;
    }
    for h in 0..num_haplotypes {
        let member_rows: Vec<usize> = (0..n).filter(|&i| assignment[i] == h).collect();
        if member_rows.is_empty() {
            continue;
        }
        let members = s.select(Axis(0), &member_rows);
        let single_sta = acgt_count(members.view());
        for j in 0..l {
            let row = single_sta.row(j);
            let row = row.as_slice().unwrap();
            if row.iter().sum::<u32>() != 0 {
                v_del[[h, j]] = (argmax_u32(row) + 1) as i32;
            }
        }
    }

    let mut candidates: Vec<Strain> = (0..num_haplotypes)
        .map(|h| Strain {
            sequence: v_del.row(h).to_vec(),
            frequency: counts[h] as f64 / n as f64,
        })
        .collect();
    candidates.sort_by(|a, b| b.frequency.partial_cmp(&a.frequency).unwrap());

    let target = numerical_rank(&v_del).min(num_haplotypes).max(1);

    let mut retained: Vec<Strain> = Vec::with_capacity(target);
    for candidate in candidates {
        if let Some(existing) = retained
            .iter_mut()
            .find(|kept: &&mut Strain| kept.sequence == candidate.sequence)
        {
            existing.frequency += candidate.frequency;
            continue;
        }
        if retained.len() < target {
            retained.push(candidate);
        } else {
            // Identical to nothing retained and no room left: its reads are folded into the
            // nearest-frequency survivor so the total frequency mass is preserved.
            if let Some(last) = retained.last_mut() {
                last.frequency += candidate.frequency;
            }
        }
    }
    retained.sort_by(|a, b| b.frequency.partial_cmp(&a.frequency).unwrap());
    retained
}

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

/// Numerical matrix rank via singular values, counting those above a tolerance scaled by the
/// largest singular value and the matrix's dimensions (mirroring `numpy.linalg.matrix_rank`'s
/// default cutoff).
fn numerical_rank(m: &Array2<i32>) -> usize {
    let (rows, cols) = m.dim();
    if rows == 0 || cols == 0 {
        return 0;
    }
    let float_m = m.mapv(|x| x as f64);
    let svd = match float_m.svd(false, false) {
        Ok(result) => result,
        Err(_) => return rows.min(cols),
    };
    let s = svd.1;
    let max_sv = s.iter().cloned().fold(0.0_f64, f64::max);
    if max_sv == 0.0 {
        return 0;
    }
    let tol = max_sv * rows.max(cols) as f64 * f64::EPSILON;
    s.iter().filter(|&&sv| sv > tol).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn identical_duplicate_haplotypes_merge_frequency() {
        let s = array![
            [1, 2, 3, 4],
            [1, 2, 3, 4],
            [1, 2, 3, 4],
            [4, 3, 2, 1],
        ];
        let recon_v2 = array![[1, 2, 3, 4], [1, 2, 3, 4], [4, 3, 2, 1]];
        let strains = finalize(s.view(), &recon_v2);
        let total: f64 = strains.iter().map(|st| st.frequency).sum();
        assert_approx_eq!(total, 1.0, 1e-9);
    }

    #[test]
    fn frequencies_sum_to_one_and_are_sorted_descending() {
        let s = array![
            [1, 2, 3, 4],
            [1, 2, 3, 4],
            [1, 2, 3, 4],
            [4, 3, 2, 1],
            [4, 3, 2, 1],
        ];
        let recon_v2 = array![[1, 2, 3, 4], [4, 3, 2, 1]];
        let strains = finalize(s.view(), &recon_v2);
        let total: f64 = strains.iter().map(|st| st.frequency).sum();
        assert_approx_eq!(total, 1.0, 1e-9);
        for pair in strains.windows(2) {
            assert!(pair[0].frequency >= pair[1].frequency);
        }
    }

    #[test]
    fn single_haplotype_population_has_full_frequency() {
        let s = Array2::<i32>::from_shape_fn((20, 5), |(_, j)| (j % 4) as i32 + 1);
        let recon_v2 = array![[1, 2, 3, 4, 1]];
        let strains = finalize(s.view(), &recon_v2);
        assert_eq!(strains.len(), 1);
        assert_approx_eq!(strains[0].frequency, 1.0, 1e-9);
    }
}
