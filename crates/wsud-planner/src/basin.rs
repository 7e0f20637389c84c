//! The Basin Monte-Carlo Composer (§4.6): walks a basin upstream-first,
//! stochastically picks a contribution at each block from the mapper's
//! sub-basin candidates and the combiner's binned `BlockStrategy` pools,
//! rolls delivered service up to the outlet, and keeps the best-scoring
//! finalists.
//!
//! A basin with thousands of blocks has far too many block-by-block
//! combinations to enumerate the way the in-block combiner does within one
//! block — so the composer samples `max_mc` independent candidate basin
//! strategies instead and ranks the admissible ones, mirroring the
//! combiner's score-then-retain shape one level up.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use wsud_core::block::{service_fraction, Block};
use wsud_core::graph::BasinGraph;
use wsud_core::strategy::{BasinBlockSelection, BinnedStrategies};
use wsud_core::tech::TechRegistry;
use wsud_core::units::{Fraction, KilolitresPerYear, SquareMetres};
use wsud_core::{BasinStrategy, BlockStrategy, ServicePValues, WaterTech};

use crate::config::{HydraulicStrategy, PickingMethod, PlannerConfig, RankMode};
use crate::mca::{self, McaMatrix};

/// Probability that an eligible block contributes anything at all in a
/// given iteration, rather than sitting the iteration out. Without this, a
/// block with only one eligible candidate would be used in every single
/// iteration and the Monte-Carlo sample would collapse onto one basin
/// strategy.
const PARTICIPATION_P: f64 = 0.7;

/// One block's already-resolved treated amounts this iteration, keyed by
/// block id so a later, more-downstream block can subtract what its
/// strictly-local upstream set has already delivered.
#[derive(Debug, Clone, Copy, Default)]
struct Contribution {
    qty: f64,
    wq: f64,
    rec: f64,
}

/// Everything the composer needs about one basin: its graph, its member
/// blocks, and each block's already-sized candidates from the mapper
/// (sub-basin scale, keyed by the block the site sits at) and the combiner
/// (in-block combinations, binned by service level).
pub struct BasinInputs<'a> {
    pub graph: &'a BasinGraph,
    pub blocks: &'a [Block],
    pub subbasin_candidates: &'a HashMap<u32, Vec<WaterTech>>,
    pub block_strategies: &'a HashMap<u32, BinnedStrategies>,
}

fn flatten_block_strategies(binned: &BinnedStrategies) -> Vec<&BlockStrategy> {
    binned.values().flatten().collect()
}

fn pick_uniform<'a, T>(items: &'a [T], rng: &mut impl Rng) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.gen_range(0..items.len())])
    }
}

/// CDF-weighted pick over MCA total score. Weight is `score.max(0) + 1` so a
/// non-positive raw score never zeroes out a candidate's chance of being
/// drawn — a strategy that merely scores low should be picked less often,
/// not excluded outright.
fn pick_weighted<'a>(items: &[&'a BlockStrategy], rng: &mut impl Rng) -> Option<&'a BlockStrategy> {
    if items.is_empty() {
        return None;
    }
    let weights: Vec<f64> = items.iter().map(|s| s.scores.total.max(0.0) + 1.0).collect();
    let total: f64 = weights.iter().sum();
    let mut target = rng.gen_range(0.0..total);
    for (item, w) in items.iter().zip(weights.iter()) {
        if target < *w {
            return Some(item);
        }
        target -= w;
    }
    items.last().copied()
}

/// Decides what (if anything) `block_id` contributes to this iteration: a
/// sub-basin site, an in-block strategy, or nothing. A block eligible for
/// both picks one at random with equal odds — neither kind of candidate is
/// preferred by construction, the MCA score is what should separate them
/// across iterations.
///
/// `max_degree` (§4.6 step 4b) gates both pools: a sub-basin candidate must
/// fall within `max_degree ± bracket/2` of its design increment, and an
/// in-block strategy's bin (rescaled to a `[0,1]` fraction of `subbas_rigour`)
/// must not exceed `max_degree` — a block already nearly served by its
/// strictly-local upstream set should not also commit to a large increment.
fn choose_block_selection(
    block_id: u32,
    inputs: &BasinInputs,
    max_degree: f64,
    bracket: f64,
    subbas_rigour: u32,
    rng: &mut impl Rng,
) -> BasinBlockSelection {
    let empty: Vec<WaterTech> = Vec::new();
    let subbasin = inputs.subbasin_candidates.get(&block_id).unwrap_or(&empty);
    let block_strats = inputs.block_strategies.get(&block_id);

    let has_subbasin = !subbasin.is_empty();
    let has_inblock = block_strats.map(|b| !b.is_empty()).unwrap_or(false);

    let none = BasinBlockSelection {
        block_id,
        subbasin_tech: None,
        block_strategy: None,
    };
    if !has_subbasin && !has_inblock {
        return none;
    }
    if !rng.gen_bool(PARTICIPATION_P) {
        return none;
    }

    let use_subbasin = match (has_subbasin, has_inblock) {
        (true, true) => rng.gen_bool(0.5),
        (true, false) => true,
        (false, true) => false,
        (false, false) => unreachable!(),
    };

    if use_subbasin {
        let bracketed: Vec<&WaterTech> = subbasin
            .iter()
            .filter(|t| (t.design_increment - max_degree).abs() <= bracket / 2.0)
            .collect();
        BasinBlockSelection {
            block_id,
            subbasin_tech: pick_uniform(&bracketed, rng).map(|t| (*t).clone()),
            block_strategy: None,
        }
    } else {
        let rigour = subbas_rigour.max(1) as f64;
        let flat: Vec<&BlockStrategy> = flatten_block_strategies(block_strats.unwrap())
            .into_iter()
            .filter(|s| (s.service_bin as f64 / rigour) <= max_degree)
            .collect();
        BasinBlockSelection {
            block_id,
            subbasin_tech: None,
            block_strategy: pick_weighted(&flat, rng).cloned(),
        }
    }
}

fn required_service(cfg: &PlannerConfig) -> ServicePValues {
    ServicePValues {
        runoff: Fraction::new(cfg.service.swm_qty),
        water_quality: Fraction::new(cfg.service.swm_wq),
        recycling: Fraction::new(cfg.service.rec),
    }
}

/// `dP = max((target - already_served) / (1 - already_served), 0)` (§4.6
/// step 2).
fn remaining_fraction(target: f64, already_served: f64) -> f64 {
    if already_served >= 1.0 {
        0.0
    } else {
        ((target - already_served) / (1.0 - already_served)).max(0.0)
    }
}

/// The basin's remaining-service target: the raw per-objective target minus
/// what is already served, rescaled per [`remaining_fraction`]. No
/// existing-asset accounting feeds a basin run today (no external-interfaces
/// format for one is specified; see DESIGN.md), so `already_served` is
/// always zero and this is numerically just the raw target — but it still
/// drives the "all zero ⇒ skip basin" check below, and stands ready for an
/// `already_served` source once one exists.
fn remaining_service(cfg: &PlannerConfig) -> ServicePValues {
    let target = required_service(cfg);
    ServicePValues {
        runoff: Fraction::new(remaining_fraction(target.runoff.value(), 0.0)),
        water_quality: Fraction::new(remaining_fraction(target.water_quality.value(), 0.0)),
        recycling: Fraction::new(remaining_fraction(target.recycling.value(), 0.0)),
    }
}

/// The set of `block_id`'s ancestors not already covered by an
/// upstream-selected sub-basin site (§4.6 step 4b's `remainIDs`): a selected
/// site's own ancestors are excluded too, since that site's delivered
/// service already accounts for everything upstream of it.
fn remain_ids(block_id: u32, graph: &BasinGraph, selected_subbasin_sites: &HashSet<u32>) -> HashSet<u32> {
    graph
        .ancestors_of(block_id)
        .iter()
        .copied()
        .filter(|id| {
            if selected_subbasin_sites.contains(id) {
                return false;
            }
            !selected_subbasin_sites.iter().any(|s| graph.ancestors_of(*s).contains(id))
        })
        .collect()
}

fn sum_manage_eia(ids: impl Iterator<Item = u32>, block_by_id: &HashMap<u32, &Block>) -> f64 {
    ids.filter_map(|id| block_by_id.get(&id))
        .filter(|b| b.in_service)
        .map(|b| b.manage_eia.value())
        .sum()
}

fn sum_demand(ids: impl Iterator<Item = u32>, block_by_id: &HashMap<u32, &Block>) -> f64 {
    ids.filter_map(|id| block_by_id.get(&id))
        .filter(|b| b.in_service)
        .map(|b| b.substitutable_demand().value())
        .sum()
}

/// Draws one candidate basin strategy: a selection for every block in
/// upstream order, rolled up into a basin-wide service vector and scored.
///
/// Walked per block (§4.6 step 4b): compute `remainIDs`, scope `total_Q`/
/// `total_WQ` to it plus the block itself, scope a demand total per
/// `hs_strategy`, subtract what `remainIDs` has already delivered to get
/// `remain_*`, and derive `max_degree` — the ceiling this block's own pick is
/// gated against, so upstream sub-basin sites and in-block strategies are
/// never double-counted against the same remaining need.
fn run_iteration(
    inputs: &BasinInputs,
    registry: &TechRegistry,
    matrix: &McaMatrix,
    cfg: &PlannerConfig,
    required: &ServicePValues,
    rng: &mut impl Rng,
) -> BasinStrategy {
    let block_by_id: HashMap<u32, &Block> = inputs.blocks.iter().map(|b| (b.block_id, b)).collect();
    let bracket = 1.0 / (cfg.rigour.subbas.max(1) as f64);
    let all_ids: Vec<u32> = inputs.blocks.iter().map(|b| b.block_id).collect();

    let mut selections = Vec::with_capacity(inputs.blocks.len());
    let mut qty_total = SquareMetres::ZERO;
    let mut wq_total = SquareMetres::ZERO;
    let mut rec_total = KilolitresPerYear::ZERO;
    let mut score_sum = 0.0;
    let mut score_weight = 0.0;

    let mut selected_subbasin_sites: HashSet<u32> = HashSet::new();
    let mut contributions: HashMap<u32, Contribution> = HashMap::new();

    for &block_id in inputs.graph.upstream_order() {
        let remain = remain_ids(block_id, inputs.graph, &selected_subbasin_sites);

        let total_q = sum_manage_eia(remain.iter().copied().chain(std::iter::once(block_id)), &block_by_id).max(1e-9);
        let total_wq = total_q;
        let total_dem = match cfg.hs_strategy {
            HydraulicStrategy::Ud => sum_demand(
                inputs.graph.descendants_of(block_id).iter().copied().chain(std::iter::once(block_id)),
                &block_by_id,
            ),
            HydraulicStrategy::Uu => sum_demand(remain.iter().copied().chain(std::iter::once(block_id)), &block_by_id),
            HydraulicStrategy::Ua => sum_demand(all_ids.iter().copied(), &block_by_id),
        }
        .max(1e-9);

        let treated_qty: f64 = remain.iter().filter_map(|id| contributions.get(id)).map(|c| c.qty).sum();
        let treated_wq: f64 = remain.iter().filter_map(|id| contributions.get(id)).map(|c| c.wq).sum();
        let treated_rec: f64 = remain.iter().filter_map(|id| contributions.get(id)).map(|c| c.rec).sum();

        let remain_q = (total_q - treated_qty).max(0.0);
        let remain_wq = (total_wq - treated_wq).max(0.0);
        let remain_rec = (total_dem - treated_rec).max(0.0);

        let max_degree = (remain_q / total_q).min(remain_wq / total_wq).min(remain_rec / total_dem) + cfg.service_redundancy;

        let selection = choose_block_selection(block_id, inputs, max_degree, bracket, cfg.rigour.subbas, rng);

        let mut contrib = Contribution::default();
        if let Some(tech) = &selection.subbasin_tech {
            selected_subbasin_sites.insert(block_id);
            qty_total = qty_total + tech.treated_iao_qty;
            wq_total = wq_total + tech.treated_iao_wq;
            rec_total = rec_total + tech.recycled_demand_served;
            contrib.qty = tech.treated_iao_qty.value();
            contrib.wq = tech.treated_iao_wq.value();
            contrib.rec = tech.recycled_demand_served.value();
            let scores = mca::score_single_tech(tech, registry, matrix, cfg);
            score_sum += scores.total;
            score_weight += 1.0;
        }
        if let Some(strategy) = &selection.block_strategy {
            qty_total = qty_total + strategy.service.qty_treated;
            wq_total = wq_total + strategy.service.wq_treated;
            rec_total = rec_total + strategy.service.rec_supplied;
            contrib.qty = strategy.service.qty_treated.value();
            contrib.wq = strategy.service.wq_treated.value();
            contrib.rec = strategy.service.rec_supplied.value();
            score_sum += strategy.scores.total;
            score_weight += 1.0;
        }
        contributions.insert(block_id, contrib);

        selections.push(selection);
    }

    let manage_eia_total: f64 = inputs.blocks.iter().filter(|b| b.in_service).map(|b| b.manage_eia.value()).sum();
    let demand_total: f64 = inputs.blocks.iter().filter(|b| b.in_service).map(|b| b.substitutable_demand().value()).sum();

    let service = ServicePValues {
        runoff: service_fraction(qty_total.value(), manage_eia_total),
        water_quality: service_fraction(wq_total.value(), manage_eia_total),
        recycling: service_fraction(rec_total.value(), demand_total),
    };

    let raw_score = if score_weight > 0.0 { score_sum / score_weight } else { 0.0 };
    let mca_score = mca::apply_penalty(raw_score, &service, required, cfg);

    BasinStrategy {
        basin_id: inputs.graph.basin_id(),
        selections,
        service,
        mca_score,
    }
}

/// Runs the Monte-Carlo search for one basin and returns its finalist
/// strategies, already ranked and picked per `cfg.ranktype`/`cfg.pickingmethod`.
///
/// Single-block basins run at a tenth of `max_mc`: with only one block's
/// candidates to vary, the sample saturates its distinct outcomes long
/// before a multi-block basin would.
///
/// `cancel` is checked at the top of every Monte-Carlo iteration (never
/// mid-iteration, per §5's "mid-iteration work is not cancellable" rule); a
/// cancelled run finalizes whatever has been sampled so far instead of
/// discarding it.
pub fn compose_basin(
    inputs: &BasinInputs,
    registry: &TechRegistry,
    matrix: &McaMatrix,
    cfg: &PlannerConfig,
    cancel: &AtomicBool,
) -> Vec<BasinStrategy> {
    let basin_id = inputs.graph.basin_id();

    // §8 round-trip property: with every objective disabled, the planner
    // must return an empty strategy list for every basin.
    if cfg.all_objectives_disabled() {
        return Vec::new();
    }

    let required = remaining_service(cfg);
    if required.runoff.value() == 0.0 && required.water_quality.value() == 0.0 && required.recycling.value() == 0.0 {
        return Vec::new();
    }

    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed ^ basin_id as u64);

    let iterations = if inputs.blocks.len() <= 1 {
        (cfg.max_mc / 10).max(1)
    } else {
        cfg.max_mc
    };

    let enabled = cfg.objective_enabled_tuple();

    // §4.6 step 5's admission filter: the original "any negative dimension
    // forces rejection" reading is too strict once `service_redundancy`
    // exists as a configured tolerance, so a strategy is admitted whenever
    // its aggregate shortfall does not exceed that tolerance, rather than
    // requiring every single dimension to individually clear its target.
    // See DESIGN.md.
    let mut admissible: Vec<BasinStrategy> = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let strategy = run_iteration(inputs, registry, matrix, cfg, &required, &mut rng);
        if strategy.objective_function(&required, enabled) >= -cfg.service_redundancy {
            admissible.push(strategy);
        }
    }

    let admissible_count = admissible.len();
    let finalists = finalize(admissible, cfg, &mut rng);
    tracing::debug!(basin_id, iterations, admissible = admissible_count, finalists = finalists.len(), "composed basin");
    finalists
}

fn finalize(mut pool: Vec<BasinStrategy>, cfg: &PlannerConfig, rng: &mut impl Rng) -> Vec<BasinStrategy> {
    pool.sort_by(|a, b| b.mca_score.partial_cmp(&a.mca_score).unwrap_or(std::cmp::Ordering::Equal));

    match cfg.ranktype {
        RankMode::Rank => pool.truncate(cfg.topranklimit.max(1)),
        RankMode::ConfidenceInterval => {
            let keep = ((pool.len() as f64) * (1.0 - cfg.conf_int)).ceil().max(1.0) as usize;
            pool.truncate(keep);
        }
    }

    match cfg.pickingmethod {
        PickingMethod::Top => {
            pool.truncate(cfg.num_output_strats);
            pool
        }
        PickingMethod::Rnd => weighted_sample_without_replacement(pool, cfg.num_output_strats, rng),
    }
}

/// CDF-weighted sampling without replacement from the ranked pool, used by
/// `PickingMethod::Rnd` so the output finalists are not always the literal
/// top scorers but still favour them.
fn weighted_sample_without_replacement(mut pool: Vec<BasinStrategy>, n: usize, rng: &mut impl Rng) -> Vec<BasinStrategy> {
    let mut out = Vec::with_capacity(n.min(pool.len()));
    while !pool.is_empty() && out.len() < n {
        let weights: Vec<f64> = pool.iter().map(|s| s.mca_score.max(0.0) + 1.0).collect();
        let total: f64 = weights.iter().sum();
        let mut target = rng.gen_range(0.0..total);
        let mut idx = pool.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                idx = i;
                break;
            }
            target -= w;
        }
        out.push(pool.remove(idx));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsud_core::block::DemandBucket;
    use wsud_core::tech::{DesignBackendKind, StorageIntegration};
    use wsud_core::{LandUse, Scale, TechCode, TechDef, WaterQualityClass};
    use wsud_core::strategy::{IaoTotals, ServiceVector, StrategySlots};

    fn bare_block(id: u32) -> Block {
        Block {
            block_id: id,
            basin_id: 1,
            down_id: None,
            outlet: true,
            active: true,
            in_service: true,
            soil_k: 36.0,
            area: SquareMetres::new(1000.0),
            res_allots: 0,
            res_houses: 0,
            res_flats: 0,
            li_estates: 0,
            hi_estates: 0,
            com_estates: 0,
            res_lot_eia: SquareMetres::ZERO,
            res_lot_tia: SquareMetres::ZERO,
            hdres_lot_eia: SquareMetres::ZERO,
            hdres_lot_tia: SquareMetres::ZERO,
            li_eia: SquareMetres::ZERO,
            li_tia: SquareMetres::ZERO,
            hi_eia: SquareMetres::ZERO,
            hi_tia: SquareMetres::ZERO,
            com_eia: SquareMetres::ZERO,
            com_tia: SquareMetres::ZERO,
            street_eia: SquareMetres::ZERO,
            street_tia: SquareMetres::ZERO,
            pg_av: SquareMetres::ZERO,
            rsv_av: SquareMetres::ZERO,
            street_verge_av: SquareMetres::ZERO,
            lot_pervious_av: SquareMetres::ZERO,
            res_demand: DemandBucket::default(),
            hdres_demand: DemandBucket::default(),
            nonres_demand: KilolitresPerYear::ZERO,
            manage_eia: SquareMetres::new(600.0),
        }
    }

    fn water_tech(block_id: u32, qty: f64) -> WaterTech {
        WaterTech {
            code: TechCode::BF,
            scale: Scale::SubBasin,
            land_use: LandUse::None,
            block_id,
            planning_area: SquareMetres::new(20.0),
            ea_factor: Fraction::new(0.1),
            treated_iao_qty: SquareMetres::new(qty),
            treated_iao_wq: SquareMetres::new(qty),
            recycled_demand_served: KilolitresPerYear::ZERO,
            storage: None,
            design_increment: 1.0,
            unit_count: 1,
        }
    }

    fn block_strategy(block_id: u32, qty: f64, score: f64) -> BlockStrategy {
        BlockStrategy {
            block_id,
            slots: StrategySlots::default(),
            service: ServiceVector {
                qty_treated: SquareMetres::new(qty),
                wq_treated: SquareMetres::new(qty),
                rec_supplied: KilolitresPerYear::ZERO,
            },
            iao: IaoTotals::default(),
            service_bin: 0,
            scores: wsud_core::McaScores {
                technical: score,
                environmental: score,
                economic: score,
                social: score,
                total: score,
            },
        }
    }

    fn registry_with_bf() -> TechRegistry {
        let mut reg = TechRegistry::new();
        reg.register(TechDef {
            code: TechCode::BF,
            can_do_runoff: true,
            can_do_pollution: true,
            can_do_recycle: false,
            permitted_scales: vec![Scale::SubBasin],
            backend: DesignBackendKind::ByCurve,
            storage_integration: StorageIntegration::None,
            min_size: SquareMetres::ZERO,
            max_size: SquareMetres::new(1.0e6),
            depth_param: 0.3,
            source_quality: WaterQualityClass::Stormwater,
        });
        reg
    }

    #[test]
    fn single_block_basin_uses_reduced_iteration_budget() {
        let blocks = vec![bare_block(1)];
        let graph = BasinGraph::build(&blocks, 1).unwrap();
        let subbasin_candidates = HashMap::new();
        let block_strategies = HashMap::new();
        let inputs = BasinInputs {
            graph: &graph,
            blocks: &blocks,
            subbasin_candidates: &subbasin_candidates,
            block_strategies: &block_strategies,
        };
        let registry = registry_with_bf();
        let matrix = McaMatrix::new();
        let mut cfg = PlannerConfig::default();
        cfg.max_mc = 100;
        let finalists = compose_basin(&inputs, &registry, &matrix, &cfg, &AtomicBool::new(false));
        // With no candidates at all every iteration is admissible (zero
        // delivered, zero required by default targets is not guaranteed,
        // but the call must not panic and must respect num_output_strats).
        assert!(finalists.len() <= cfg.num_output_strats);
    }

    #[test]
    fn finalists_never_exceed_num_output_strats() {
        let mut blocks = vec![bare_block(1), bare_block(2)];
        blocks[1].down_id = None;
        blocks[0].down_id = Some(2);
        blocks[0].outlet = false;
        blocks[1].outlet = true;
        let graph = BasinGraph::build(&blocks, 1).unwrap();

        let mut subbasin_candidates = HashMap::new();
        subbasin_candidates.insert(1u32, vec![water_tech(1, 200.0), water_tech(1, 400.0)]);

        let mut block_strategies = HashMap::new();
        let mut binned = BinnedStrategies::new();
        binned.insert(0, vec![block_strategy(2, 100.0, 0.5), block_strategy(2, 50.0, 0.2)]);
        block_strategies.insert(2u32, binned);

        let inputs = BasinInputs {
            graph: &graph,
            blocks: &blocks,
            subbasin_candidates: &subbasin_candidates,
            block_strategies: &block_strategies,
        };
        let registry = registry_with_bf();
        let matrix = McaMatrix::new();
        let mut cfg = PlannerConfig::default();
        cfg.max_mc = 50;
        cfg.num_output_strats = 3;
        let finalists = compose_basin(&inputs, &registry, &matrix, &cfg, &AtomicBool::new(false));
        assert!(finalists.len() <= 3);
    }

    #[test]
    fn pre_cancelled_flag_stops_before_the_first_iteration() {
        let blocks = vec![bare_block(1)];
        let graph = BasinGraph::build(&blocks, 1).unwrap();
        let subbasin_candidates = HashMap::new();
        let block_strategies = HashMap::new();
        let inputs = BasinInputs {
            graph: &graph,
            blocks: &blocks,
            subbasin_candidates: &subbasin_candidates,
            block_strategies: &block_strategies,
        };
        let registry = registry_with_bf();
        let matrix = McaMatrix::new();
        let mut cfg = PlannerConfig::default();
        cfg.max_mc = 100;
        let cancel = AtomicBool::new(true);
        let finalists = compose_basin(&inputs, &registry, &matrix, &cfg, &cancel);
        assert!(finalists.is_empty());
    }

    #[test]
    fn disabling_every_ration_flag_empties_the_basin_via_the_pipeline() {
        let mut blocks = vec![bare_block(1), bare_block(2)];
        blocks[1].down_id = None;
        blocks[0].down_id = Some(2);
        blocks[0].outlet = false;
        blocks[1].outlet = true;
        let graph = BasinGraph::build(&blocks, 1).unwrap();

        let mut subbasin_candidates = HashMap::new();
        subbasin_candidates.insert(1u32, vec![water_tech(1, 200.0)]);
        let mut block_strategies = HashMap::new();
        let mut binned = BinnedStrategies::new();
        binned.insert(0, vec![block_strategy(2, 100.0, 0.5)]);
        block_strategies.insert(2u32, binned);

        let inputs = BasinInputs {
            graph: &graph,
            blocks: &blocks,
            subbasin_candidates: &subbasin_candidates,
            block_strategies: &block_strategies,
        };
        let registry = registry_with_bf();
        let matrix = McaMatrix::new();
        let mut cfg = PlannerConfig::default();
        cfg.ration.runoff = false;
        cfg.ration.pollute = false;
        cfg.ration.harvest = false;
        let finalists = compose_basin(&inputs, &registry, &matrix, &cfg, &AtomicBool::new(false));
        assert!(finalists.is_empty());
    }

    #[test]
    fn sub_basin_candidate_outside_the_design_increment_bracket_is_never_picked() {
        let block_id = 1;
        let mut near = water_tech(block_id, 10.0);
        near.design_increment = 0.5;
        let mut far = water_tech(block_id, 10.0);
        far.design_increment = 1.0;

        let mut subbasin_candidates = HashMap::new();
        subbasin_candidates.insert(block_id, vec![near.clone(), far.clone()]);
        let block_strategies = HashMap::new();
        let blocks: Vec<Block> = Vec::new();
        let graph = BasinGraph::build(&[bare_block(block_id)], 1).unwrap();
        let inputs = BasinInputs {
            graph: &graph,
            blocks: &blocks,
            subbasin_candidates: &subbasin_candidates,
            block_strategies: &block_strategies,
        };

        // max_degree 0.5 with a tight bracket: only `near` (design_increment
        // 0.5) should ever be selected, never `far` (design_increment 1.0).
        let mut rng = rand::rngs::mock::StepRng::new(0, u64::MAX / 4);
        for _ in 0..20 {
            let selection = choose_block_selection(block_id, &inputs, 0.5, 0.1, 4, &mut rng);
            if let Some(tech) = &selection.subbasin_tech {
                assert!((tech.design_increment - 0.5).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn weighted_pick_favours_higher_scoring_strategy_over_many_draws() {
        let high = block_strategy(1, 100.0, 5.0);
        let low = block_strategy(1, 100.0, 0.0);
        let items: Vec<&BlockStrategy> = vec![&high, &low];
        let mut rng = rand::rngs::mock::StepRng::new(0, (u64::MAX / 1000) * 3);
        let mut high_count = 0;
        for _ in 0..20 {
            if let Some(pick) = pick_weighted(&items, &mut rng) {
                if (pick.scores.total - 5.0).abs() < 1e-9 {
                    high_count += 1;
                }
            }
        }
        assert!(high_count > 0);
    }
}
