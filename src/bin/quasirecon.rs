use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use quasirecon::{engine, Cli};
use std::env;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    set_log_level(cli.verbose);

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .expect("failed to build the rayon thread pool");
    }

    match engine::run(&cli)? {
        Some(summary) => {
            println!(
                "Estimated population size : {}",
                summary.estimated_population_size
            );
            println!("MEC : {}", summary.mec);
            println!("Wrote {}", summary.fasta_path);
        }
        None => {
            // Empty SNV matrix: reported and exited cleanly, no FASTA produced.
        }
    }
    Ok(())
}

fn set_log_level(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = Builder::new();
    builder.filter_level(log_level);
    if env::var("RUST_LOG").is_ok() {
        builder.parse_filters(&env::var("RUST_LOG").unwrap());
    }
    if builder.try_init().is_err() {
        panic!("Failed to set log level - has it been specified multiple times?")
    }
    log::info!("quasirecon version {}", env!("CARGO_PKG_VERSION"));
}
