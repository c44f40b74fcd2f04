//! Top-level orchestration: wires the I/O adapters, rank estimator, and post-processor into one
//! run.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Cli, RunConfig};
use crate::error::CoreResult;
use crate::postprocess::{self, Strain};
use crate::rank_estimator::{estimate_rank, RankEstimatorConfig};
use crate::io;
use crate::threshold::MismatchThresholds;

/// Everything worth reporting back to the CLI after a successful run.
#[derive(Debug)]
pub struct RunSummary {
    pub estimated_population_size: u32,
    pub mec: u64,
    pub strains: Vec<Strain>,
    pub fasta_path: String,
}

/// Run the full pipeline for one `zone_name` prefix. Returns `Ok(None)` if the SNV matrix is
/// empty, per the "report and exit cleanly" policy; a fatal condition surfaces as `Err`.
pub fn run(cli: &Cli) -> CoreResult<Option<RunSummary>> {
    let cfg = RunConfig::from_cli(cli);

    let matrix_path = format!("{}_SNV_matrix.txt", cfg.zone_name);
    let positions_path = format!("{}_SNV_pos.txt", cfg.zone_name);
    let homo_path = format!("{}_Homo_seq.txt", cfg.zone_name);
    let fasta_path = format!("{}_ViralSeq.fasta", cfg.zone_name);

    let matrix = io::read_snv_matrix(&matrix_path)?;
    if matrix.nrows() == 0 {
        log::warn!("SNV matrix ({matrix_path}) is empty. Not running reconstruction.");
        return Ok(None);
    }

    let positions = io::read_snv_positions(&positions_path)?;
    io::check_shape_match(&positions_path, &matrix_path, &positions, &matrix)?;

    let homo_seq = io::read_homogeneous_sequence(&homo_path)?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let thresholds = MismatchThresholds::build(cfg.seq_err);
    let rank_cfg = RankEstimatorConfig {
        seq_err: cfg.seq_err,
        mec_thre: cfg.mec_thre,
        k_init: cfg.k_init,
        thresholds: &thresholds,
    };

    log::info!("Rank bisection starting from K = {}", cfg.k_init);
    let solve_started = Instant::now();
    let estimate = estimate_rank(matrix.view(), &rank_cfg, &mut rng)?;
    let cpu_time = solve_started.elapsed();
    log::info!("Rank bisection settled on K = {} (MEC = {})", estimate.k, estimate.mec);
    log::info!("CPU time: {:.3}s", cpu_time.as_secs_f64());

    let strains = postprocess::finalize(matrix.view(), &estimate.recon_v2);
    // The reported population size is the matrix rank of the de-duplicated haplotype set, not
    // the bisection K above -- the two usually agree but K only picks which cached solution to
    // hand to the post-processor, it isn't itself the final strain count.
    let estimated_population_size = strains.len() as u32;

    io::write_fasta(&fasta_path, &homo_seq, &positions, &strains)?;
    log::info!("Estimated population size: {estimated_population_size}");
    for (i, strain) in strains.iter().enumerate() {
        log::info!("Frequency of strain {}: {:.6}", i + 1, strain.frequency);
    }

    Ok(Some(RunSummary {
        estimated_population_size,
        mec: estimate.mec,
        strains,
        fasta_path,
    }))
}
