use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod manifest;
mod runner;

use cli::{Cli, Commands};
use runner::{run_plan, PlanRun};

fn resolve_threads(spec: &str) -> usize {
    if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    }
}

fn plan(
    blocks: std::path::PathBuf,
    config: std::path::PathBuf,
    rainfall: std::path::PathBuf,
    rainfall_timestep_minutes: u32,
    evaporation: std::path::PathBuf,
    curves: std::path::PathBuf,
    mca_matrix: std::path::PathBuf,
    output: std::path::PathBuf,
    threads: String,
) -> anyhow::Result<()> {
    let (blocks, diagnostics) = wsud_io::load_block_table(&blocks)?;
    for issue in &diagnostics.issues {
        tracing::warn!(%issue, "block table diagnostic");
    }
    let cfg = wsud_io::load_planner_config(&config)?;
    let rainfall = wsud_io::load_rainfall_series(&rainfall, rainfall_timestep_minutes)?;
    let evaporation = wsud_io::load_evaporation_series(&evaporation)?;
    let curve_cache = wsud_io::load_curve_cache(&curves)?;
    let matrix = wsud_io::load_mca_matrix(&mca_matrix)?;

    let run = PlanRun {
        blocks,
        cfg,
        rainfall_mm: rainfall.intensities_mmh,
        evap_scale_daily: evaporation.daily_scale,
        curves: curve_cache,
        matrix,
        output_dir: output,
        threads: resolve_threads(&threads),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let summary = run_plan(run, cancel)?;
    info!(
        success = summary.success,
        failure = summary.failure,
        manifest = %summary.manifest_path.display(),
        "planning run complete"
    );
    if summary.failure > 0 {
        anyhow::bail!("{} of {} basins failed; see {}", summary.failure, summary.success + summary.failure, summary.manifest_path.display());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match cli.command {
        Commands::Plan {
            blocks,
            config,
            rainfall,
            rainfall_timestep_minutes,
            evaporation,
            curves,
            mca_matrix,
            output,
            threads,
        } => plan(blocks, config, rainfall, rainfall_timestep_minutes, evaporation, curves, mca_matrix, output, threads),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
