use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the planner over one catchment: load every input, plan every
    /// basin, write one result file per basin plus a run manifest.
    Plan {
        /// Block table CSV.
        #[arg(long)]
        blocks: PathBuf,
        /// Planner configuration (YAML or JSON).
        #[arg(long)]
        config: PathBuf,
        /// Rainfall series (one mm/h value per native timestep).
        #[arg(long)]
        rainfall: PathBuf,
        /// Rainfall series timestep, in minutes.
        #[arg(long, default_value_t = 6)]
        rainfall_timestep_minutes: u32,
        /// Daily evaporation scaling series.
        #[arg(long)]
        evaporation: PathBuf,
        /// Design-curve manifest (YAML or JSON).
        #[arg(long)]
        curves: PathBuf,
        /// MCA scoring matrix CSV.
        #[arg(long)]
        mca_matrix: PathBuf,
        /// Output directory: one `basin-<id>.json` per basin plus
        /// `run_manifest.json`.
        #[arg(long)]
        output: PathBuf,
        /// Worker thread count; "auto" uses every available core.
        #[arg(long, default_value = "auto")]
        threads: String,
    },
}
