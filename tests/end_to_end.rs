//! End-to-end scenarios driving the public library API against in-memory SNV matrices.

use assert_approx_eq::assert_approx_eq;
use ndarray::Array2;
use quasirecon::error::CoreError;
use quasirecon::postprocess;
use quasirecon::rank_estimator::{estimate_rank, RankEstimatorConfig};
use quasirecon::threshold::MismatchThresholds;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SEQ_ERR: f64 = 0.002;

fn build_cfg(thresholds: &MismatchThresholds, k_init: u32) -> RankEstimatorConfig<'_> {
    RankEstimatorConfig {
        seq_err: SEQ_ERR,
        mec_thre: 0.0312,
        k_init,
        thresholds,
    }
}

#[test]
fn single_haplotype_synthetic_recovers_one_strain_at_full_frequency() {
    // With a single true haplotype and no read noise, MEC is 0 at every probed K (a 0/0
    // improvement ratio), so the bisection's chosen K is not itself meaningful here; what
    // matters is that exactly one haplotype is recovered and it explains every read.
    let l = 10;
    let v: Vec<i32> = (0..l).map(|j| (j % 4) as i32 + 1).collect();
    let s = Array2::<i32>::from_shape_fn((100, l), |(_, j)| v[j]);

    let thresholds = MismatchThresholds::build(SEQ_ERR);
    let cfg = build_cfg(&thresholds, 5);
    let mut rng = StdRng::seed_from_u64(1);
    let estimate = estimate_rank(s.view(), &cfg, &mut rng).unwrap();
    assert_eq!(estimate.mec, 0);

    let strains = postprocess::finalize(s.view(), &estimate.recon_v2);
    assert_eq!(strains.len(), 1);
    assert_eq!(strains[0].sequence, v);
    assert_approx_eq!(strains[0].frequency, 1.0, 1e-9);
}

#[test]
fn two_balanced_haplotypes_recover_k_two_at_even_frequency() {
    let l = 10;
    let v1: Vec<i32> = (0..l).map(|j| (j % 4) as i32 + 1).collect();
    let mut v2 = v1.clone();
    for j in 0..5 {
        v2[j] = (v1[j] % 4) + 1; // differ at the first 5 of 10 positions
    }

    let s = Array2::<i32>::from_shape_fn((100, l), |(i, j)| if i < 50 { v1[j] } else { v2[j] });

    let thresholds = MismatchThresholds::build(SEQ_ERR);
    let cfg = build_cfg(&thresholds, 5);
    let mut rng = StdRng::seed_from_u64(2);
    let estimate = estimate_rank(s.view(), &cfg, &mut rng).unwrap();
    assert_eq!(estimate.k, 2);

    let strains = postprocess::finalize(s.view(), &estimate.recon_v2);
    assert_eq!(strains.len(), 2);
    let sequences: Vec<&Vec<i32>> = strains.iter().map(|st| &st.sequence).collect();
    assert!(sequences.contains(&&v1));
    assert!(sequences.contains(&&v2));
    for strain in &strains {
        assert_approx_eq!(strain.frequency, 0.5, 0.05);
    }
}

#[test]
fn two_haplotypes_unbalanced_eighty_twenty() {
    let l = 10;
    let v1: Vec<i32> = (0..l).map(|j| (j % 4) as i32 + 1).collect();
    let mut v2 = v1.clone();
    for j in 0..5 {
        v2[j] = (v1[j] % 4) + 1;
    }

    let n = 100;
    let s = Array2::<i32>::from_shape_fn((n, l), |(i, j)| if i < 80 { v1[j] } else { v2[j] });

    let thresholds = MismatchThresholds::build(SEQ_ERR);
    let cfg = build_cfg(&thresholds, 5);
    let mut rng = StdRng::seed_from_u64(3);
    let estimate = estimate_rank(s.view(), &cfg, &mut rng).unwrap();

    let strains = postprocess::finalize(s.view(), &estimate.recon_v2);
    assert_eq!(strains.len(), 2);
    assert_approx_eq!(strains[0].frequency, 0.8, 0.02);
    assert_approx_eq!(strains[1].frequency, 0.2, 0.02);
}

#[test]
fn empty_snv_matrix_is_reported_and_produces_no_fasta() {
    use quasirecon::io;
    use std::fs;

    let mut path = std::env::temp_dir();
    path.push("quasirecon-empty-matrix-scenario.txt");
    fs::write(&path, "").unwrap();

    let matrix = io::read_snv_matrix(&path).unwrap();
    assert_eq!(matrix.nrows(), 0);

    fs::remove_file(&path).unwrap();
}

#[test]
fn acgt_count_matches_naive_reference_on_random_matrices() {
    use quasirecon::stats::acgt_count;

    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..5 {
        let m = Array2::<i32>::from_shape_fn((9, 5), |_| {
            use rand::Rng;
            rng.gen_range(1..=4)
        });
        let out = acgt_count(m.view());
        let mut naive = Array2::<u32>::zeros((5, 4));
        for c in 0..4 {
            for j in 0..5 {
                naive[[j, c]] = m.column(j).iter().filter(|&&v| v == c as i32 + 1).count() as u32;
            }
        }
        assert_eq!(out, naive);
    }
}

#[test]
fn one_dimensional_input_to_acgt_count_is_a_shape_error() {
    use ndarray::IxDyn;
    use quasirecon::stats::acgt_count_dyn;

    let m = ndarray::Array1::from_elem(9, 1i32)
        .into_shape(IxDyn(&[9]))
        .unwrap();
    let err = acgt_count_dyn(&m.view()).unwrap_err();
    assert!(matches!(err, CoreError::ShapeError { ndim: 1 }));
}
