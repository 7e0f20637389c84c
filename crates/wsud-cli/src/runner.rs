//! The Planner Orchestrator (§4.8): wires loaders and planner components
//! together, runs basins on a `rayon` thread pool (one basin per task),
//! and writes one result file per basin plus a run manifest.
//!
//! Retrofit (§4.5) is not wired into this pipeline: no external-interfaces
//! format for an existing-asset table is specified (§6), so every block
//! starts from a default, fully-available `ScaleAvailability` — see
//! DESIGN.md. `wsud_planner::retrofit` remains a complete, independently
//! tested library entry point for a future loader to drive.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use wsud_core::graph::BasinGraph;
use wsud_core::tech::TechRegistry;
use wsud_core::Block;
use wsud_planner::mca::McaMatrix;
use wsud_planner::{combine_block, compose_basin, map_block_opportunities, map_subbasin_opportunities};
use wsud_planner::{BasinInputs, MapperContext, PlannerConfig, ScaleAvailability};
use wsud_sizing::curves::DesignCurveCache;

use crate::manifest::{write_run_manifest, BasinRunRecord, RunManifest};

/// Everything one `plan` invocation needs, already loaded from disk.
pub struct PlanRun {
    pub blocks: Vec<Block>,
    pub cfg: PlannerConfig,
    pub rainfall_mm: Vec<f64>,
    pub evap_scale_daily: Vec<f64>,
    pub curves: DesignCurveCache,
    pub matrix: McaMatrix,
    pub output_dir: PathBuf,
    pub threads: usize,
}

pub struct PlanSummary {
    pub manifest_path: PathBuf,
    pub success: usize,
    pub failure: usize,
}

/// Runs every basin in `run.blocks` and writes its output, returning once
/// every basin has either completed or been skipped by cancellation.
pub fn run_plan(run: PlanRun, cancel: Arc<AtomicBool>) -> Result<PlanSummary> {
    std::fs::create_dir_all(&run.output_dir)
        .with_context(|| format!("creating output directory '{}'", run.output_dir.display()))?;

    let thread_count = if run.threads == 0 { num_cpus::get() } else { run.threads };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building rayon thread pool for basin runs")?;

    let registry = TechRegistry::standard();

    let mut by_basin: HashMap<u32, Vec<Block>> = HashMap::new();
    for block in &run.blocks {
        by_basin.entry(block.basin_id).or_default().push(block.clone());
    }
    let mut basin_ids: Vec<u32> = by_basin.keys().copied().collect();
    basin_ids.sort_unstable();

    let records: Vec<BasinRunRecord> = pool.install(|| {
        basin_ids
            .par_iter()
            .map(|&basin_id| {
                if cancel.load(Ordering::Relaxed) {
                    return BasinRunRecord {
                        basin_id,
                        status: "cancelled".to_string(),
                        error: None,
                        strategy_count: 0,
                        duration_ms: 0,
                        output: String::new(),
                    };
                }
                run_basin(basin_id, &by_basin[&basin_id], &run, &registry, &cancel)
            })
            .collect()
    });

    let success = records.iter().filter(|r| r.status == "ok").count();
    let failure = records.len() - success;

    let manifest = RunManifest {
        created_at: Utc::now(),
        config: run.cfg.clone(),
        seed: run.cfg.seed,
        num_basins: records.len(),
        success,
        failure,
        basins: records,
    };
    let manifest_path = run.output_dir.join("run_manifest.json");
    write_run_manifest(&manifest_path, &manifest)?;

    Ok(PlanSummary {
        manifest_path,
        success,
        failure,
    })
}

fn run_basin(basin_id: u32, blocks: &[Block], run: &PlanRun, registry: &TechRegistry, cancel: &AtomicBool) -> BasinRunRecord {
    let output_path = run.output_dir.join(format!("basin-{basin_id}.json"));
    let started = std::time::Instant::now();

    let attempt = || -> Result<usize> {
        let graph = BasinGraph::build(blocks, basin_id).context("building basin graph")?;

        let ctx = MapperContext {
            registry,
            curves: &run.curves,
            rainfall_mm: &run.rainfall_mm,
            evap_scale_daily: &run.evap_scale_daily,
            config: &run.cfg,
        };

        let mut subbasin_candidates = HashMap::new();
        let mut block_strategies = HashMap::new();

        for block in blocks {
            if !block.active {
                continue;
            }
            let availability = ScaleAvailability::default();
            let candidates = map_block_opportunities(block, &ctx, &availability);

            let subbasin = map_subbasin_opportunities(block, blocks, &graph, &ctx);
            if !subbasin.is_empty() {
                subbasin_candidates.insert(block.block_id, subbasin);
            }

            let mut rng = ChaCha8Rng::seed_from_u64(run.cfg.seed ^ basin_id as u64 ^ block.block_id as u64);
            let binned = combine_block(block, &candidates, registry, &run.matrix, &run.cfg, &mut rng);
            if !binned.is_empty() {
                block_strategies.insert(block.block_id, binned);
            }
        }

        let inputs = BasinInputs {
            graph: &graph,
            blocks,
            subbasin_candidates: &subbasin_candidates,
            block_strategies: &block_strategies,
        };
        let strategies = compose_basin(&inputs, registry, &run.matrix, &run.cfg, cancel);

        let json = serde_json::to_string_pretty(&strategies).context("serializing basin strategies")?;
        std::fs::write(&output_path, json).with_context(|| format!("writing '{}'", output_path.display()))?;
        Ok(strategies.len())
    };

    let outcome = attempt();
    let duration_ms = started.elapsed().as_millis();
    match outcome {
        Ok(count) => {
            tracing::info!(basin_id, strategy_count = count, "basin planned");
            BasinRunRecord {
                basin_id,
                status: "ok".to_string(),
                error: None,
                strategy_count: count,
                duration_ms,
                output: output_path.display().to_string(),
            }
        }
        Err(err) => {
            tracing::warn!(basin_id, error = %format!("{err:#}"), "basin failed");
            BasinRunRecord {
                basin_id,
                status: "error".to_string(),
                error: Some(format!("{err:#}")),
                strategy_count: 0,
                duration_ms,
                output: output_path.display().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsud_core::block::DemandBucket;
    use wsud_core::units::{KilolitresPerYear, SquareMetres};

    fn bare_block(id: u32, basin_id: u32) -> Block {
        Block {
            block_id: id,
            basin_id,
            down_id: None,
            outlet: true,
            active: true,
            in_service: true,
            soil_k: 36.0,
            area: SquareMetres::new(1000.0),
            res_allots: 5,
            res_houses: 5,
            res_flats: 0,
            li_estates: 0,
            hi_estates: 0,
            com_estates: 0,
            res_lot_eia: SquareMetres::new(200.0),
            res_lot_tia: SquareMetres::new(200.0),
            hdres_lot_eia: SquareMetres::ZERO,
            hdres_lot_tia: SquareMetres::ZERO,
            li_eia: SquareMetres::ZERO,
            li_tia: SquareMetres::ZERO,
            hi_eia: SquareMetres::ZERO,
            hi_tia: SquareMetres::ZERO,
            com_eia: SquareMetres::ZERO,
            com_tia: SquareMetres::ZERO,
            street_eia: SquareMetres::new(50.0),
            street_tia: SquareMetres::new(50.0),
            pg_av: SquareMetres::new(100.0),
            rsv_av: SquareMetres::ZERO,
            street_verge_av: SquareMetres::ZERO,
            lot_pervious_av: SquareMetres::ZERO,
            res_demand: DemandBucket::default(),
            hdres_demand: DemandBucket::default(),
            nonres_demand: KilolitresPerYear::ZERO,
            manage_eia: SquareMetres::new(250.0),
        }
    }

    #[test]
    fn plan_run_writes_one_file_per_basin_plus_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = vec![bare_block(1, 1), bare_block(2, 2)];
        let mut cfg = PlannerConfig::default();
        cfg.max_mc = 5;
        let run = PlanRun {
            blocks,
            cfg,
            rainfall_mm: vec![1.0, 2.0, 0.0],
            evap_scale_daily: vec![1.0],
            curves: DesignCurveCache::new(),
            matrix: McaMatrix::new(),
            output_dir: dir.path().to_path_buf(),
            threads: 1,
        };
        let summary = run_plan(run, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failure, 0);
        assert!(summary.manifest_path.exists());
        assert!(dir.path().join("basin-1.json").exists());
        assert!(dir.path().join("basin-2.json").exists());
    }

    #[test]
    fn pre_cancelled_run_skips_every_basin() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = vec![bare_block(1, 1)];
        let cfg = PlannerConfig::default();
        let run = PlanRun {
            blocks,
            cfg,
            rainfall_mm: vec![1.0],
            evap_scale_daily: vec![1.0],
            curves: DesignCurveCache::new(),
            matrix: McaMatrix::new(),
            output_dir: dir.path().to_path_buf(),
            threads: 1,
        };
        let summary = run_plan(run, Arc::new(AtomicBool::new(true))).unwrap();
        assert_eq!(summary.success, 0);
        assert_eq!(summary.failure, 1);
    }
}
