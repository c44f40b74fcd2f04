//! Mismatch-threshold table (C3): per-read Hamming-distance budgets derived from the
//! sequencing-error rate via a binomial tail bound.

use statrs::distribution::{Binomial, Discrete};

use crate::config::{MAX_LEN, MAX_THRE, P_VALUE};

/// For a read with `n` non-gap positions, the largest Hamming distance `h` such that
/// `Pr[X >= h | X ~ Binomial(n, seq_err)]` is still at least `p_value`. Built once per run from
/// `seq_err` and looked up per-read via [`MismatchThresholds::criterion`].
#[derive(Debug, Clone)]
pub struct MismatchThresholds {
    /// `l[i]` is the smallest non-gap length at which threshold `th[i]` applies.
    l: Vec<usize>,
    /// `th[i]` is the mismatch threshold associated with `l[i]`.
    th: Vec<usize>,
}

impl MismatchThresholds {
    /// Build the table for a given sequencing error rate (probability, not percent).
    pub fn build(seq_err: f64) -> Self {
        let mut l = Vec::new();
        let mut th = Vec::new();

        for thre in 1..=MAX_THRE {
            for len in 1..=MAX_LEN {
                let binom = Binomial::new(seq_err, len as u64)
                    .expect("seq_err must be a valid probability");
                let mut pr = 1.0;
                for k in 0..thre as u64 {
                    pr -= binom.pmf(k);
                }
                if pr >= P_VALUE {
                    th.push(thre);
                    l.push(len);
                    break;
                }
            }
        }

        // Reads with a single non-gap position get threshold 1: bump the first breakpoint so
        // the table effectively starts at n = 2.
        if let Some(first) = l.first_mut() {
            *first += 1;
        }

        Self { l, th }
    }

    /// Mismatch budget for a read covering `nongap` non-gap positions.
    pub fn criterion(&self, nongap: usize) -> usize {
        for (idx, &breakpoint) in self.l.iter().enumerate() {
            if nongap < breakpoint {
                return idx + 1;
            }
        }
        self.th.len() + 1
    }

    /// Vectorized form of [`Self::criterion`] for a whole read matrix's non-gap counts.
    pub fn criteria(&self, nongap: &[usize]) -> Vec<usize> {
        nongap.iter().map(|&n| self.criterion(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_monotone_in_breakpoints() {
        let table = MismatchThresholds::build(0.002);
        for w in table.l.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn single_nongap_position_gets_threshold_one() {
        let table = MismatchThresholds::build(0.002);
        assert_eq!(table.criterion(1), 1);
    }

    #[test]
    fn longer_reads_get_larger_or_equal_budget() {
        let table = MismatchThresholds::build(0.002);
        let short = table.criterion(10);
        let long = table.criterion(200);
        assert!(long >= short);
    }

    #[test]
    fn criterion_never_exceeds_table_length_plus_one() {
        let table = MismatchThresholds::build(0.002);
        assert_eq!(table.criterion(100_000), table.th.len() + 1);
    }
}
