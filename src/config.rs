use clap::Parser;

/// Binomial tail cutoff used to size the mismatch-threshold table (C3). Fixed, not user tunable.
pub const P_VALUE: f64 = 1e-5;

/// AM iteration cap (C4).
pub const MAX_ITE: usize = 2000;

/// AM convergence tolerance (C4).
pub const ERROR_THRE: f64 = 1e-5;

/// Largest mismatch threshold considered when building the table (C3).
pub const MAX_THRE: usize = 20;

/// Largest non-gap read length considered when building the table (C3).
pub const MAX_LEN: usize = 300;

/// Command line surface for the `quasirecon` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "quasirecon", version, about = "Viral quasispecies reconstruction")]
pub struct Cli {
    /// Prefix shared by `<prefix>_SNV_matrix.txt`, `<prefix>_SNV_pos.txt` and
    /// `<prefix>_Homo_seq.txt`.
    #[arg(long = "zone-name")]
    pub zone_name: String,

    /// Sequencing error rate, in percent.
    #[arg(long = "err-rate", default_value_t = 0.2)]
    pub err_rate: f64,

    /// MEC-improvement ratio threshold driving the rank bisection.
    #[arg(long = "mec-thre", default_value_t = 0.0312)]
    pub mec_thre: f64,

    /// Initial population-size guess, also used as the bisection probe step.
    #[arg(short = 'k', long = "k", default_value_t = 5)]
    pub k: u32,

    /// Number of worker threads for the rayon pool. Defaults to all logical cores.
    #[arg(long = "threads", default_value_t = 0)]
    pub threads: usize,

    /// RNG seed for uncovered-position tie-breaking. Unset means entropy-seeded.
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Everything the solver needs for one run, built once from [`Cli`] and passed by reference from
/// then on. Mirrors the "no long-lived caches beyond the MEC table" resource model: this struct
/// itself never changes after construction.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub zone_name: String,
    pub seq_err: f64,
    pub mec_thre: f64,
    pub k_init: u32,
    pub threads: usize,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            zone_name: cli.zone_name.clone(),
            seq_err: cli.err_rate / 100.0,
            mec_thre: cli.mec_thre,
            k_init: cli.k,
            threads: cli.threads,
        }
    }
}
