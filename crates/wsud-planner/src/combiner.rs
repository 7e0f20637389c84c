//! The In-Block Combiner (§4.4): takes one block's mapper candidates and
//! builds every admissible cartesian combination of its seven slots, scores
//! each with the MCA Scorer, bins by delivered service level, and retains the
//! top `combiner_top_n` per bin for the basin composer to sample from later.

use std::collections::HashMap;

use rand::Rng;

use wsud_core::block::Block;
use wsud_core::strategy::{BinnedStrategies, IaoTotals, ServiceVector, StrategySlots};
use wsud_core::tech::TechRegistry;
use wsud_core::units::SquareMetres;
use wsud_core::{BlockStrategy, WaterTech};

use crate::config::PlannerConfig;
use crate::mapper::OpportunityCandidates;
use crate::mca::McaMatrix;

const INCREMENT_TOLERANCE: f64 = 1e-6;

/// Multiplies one lot-scale tech's service/IAO contribution by its land
/// use's unit count (as the mapper recorded it on `WaterTech.unit_count`).
/// The source's tally only multiplies RES/LI/HI/COM this way — the
/// HD-residential (flats) branch is conspicuously absent from its `elif`
/// chain and falls through unscaled. This reimplementation follows that
/// asymmetry faithfully rather than "fixing" it; see DESIGN.md.
fn unit_multiplier(tech: &WaterTech) -> f64 {
    use wsud_core::LandUse;
    match tech.land_use {
        LandUse::Residential | LandUse::LightIndustry | LandUse::HeavyIndustry | LandUse::Commercial => {
            tech.unit_count.max(1) as f64
        }
        // HdResidential and non-lot scales: unscaled, matching the source's
        // fall-through branch.
        _ => 1.0,
    }
}

fn total_service(slots: &StrategySlots) -> ServiceVector {
    let mut total = ServiceVector::default();
    for tech in slots.iter() {
        let m = unit_multiplier(tech);
        total.qty_treated = total.qty_treated + tech.treated_iao_qty * m;
        total.wq_treated = total.wq_treated + tech.treated_iao_wq * m;
        total.rec_supplied = total.rec_supplied + tech.recycled_demand_served * m;
    }
    total
}

fn total_iao(slots: &StrategySlots) -> IaoTotals {
    let mut total = IaoTotals::default();
    for tech in slots.iter() {
        let m = unit_multiplier(tech);
        total.qty = total.qty + tech.treated_iao_qty * m;
        total.wq = total.wq + tech.treated_iao_wq * m;
    }
    total
}

/// `identifyBin` (§4.4): the coarsest `subbas_rigour` increment whose
/// bracket contains the maximum of the three service fractions, falling back
/// to the top increment if none brackets it exactly.
fn identify_bin(service: &ServiceVector, iao: &IaoTotals, block: &Block, rigour: u32) -> u32 {
    let manage_eia = block.manage_eia.value().max(1e-9);
    let total_demand = block.substitutable_demand().value().max(1e-9);

    let qty_level = (service.qty_treated.value() + iao.qty.value()) / manage_eia;
    let wq_level = (service.wq_treated.value() + iao.wq.value()) / manage_eia;
    let rec_level = service.rec_supplied.value() / total_demand;
    let max_level = qty_level.max(wq_level).max(rec_level).clamp(0.0, 1.0);

    let rigour = rigour.max(1);
    let bracket = 1.0 / rigour as f64;
    for i in 0..=rigour {
        let centre = i as f64 / rigour as f64;
        if (max_level - centre).abs() <= bracket / 2.0 {
            return i;
        }
    }
    rigour
}

/// Checks whether all slots in a tuple share the same lot-scale design
/// increment (residential/HDR/LI/HI/COM lot picks must all be sized against
/// the same fraction of their respective land use, since they are committed
/// in a single retrofit pass — a block cannot half-retrofit its residential
/// lots at one increment and its light-industry lots at another within one
/// combination).
fn lot_increments_agree(slots: &[&Option<WaterTech>]) -> bool {
    let mut seen: Option<f64> = None;
    for slot in slots {
        if let Some(tech) = slot {
            match seen {
                None => seen = Some(tech.design_increment),
                Some(v) if (v - tech.design_increment).abs() < INCREMENT_TOLERANCE => {}
                Some(_) => return false,
            }
        }
    }
    true
}

/// Rejects a combination per §4.4's admissibility rules: all-sentinel, lot +
/// street residential treated area exceeding the residential zone's EIA,
/// aggregate quantity/quality service exceeding `Manage_EIA`, or aggregate
/// recycled demand exceeding substitutable demand.
fn is_admissible(slots: &StrategySlots, block: &Block) -> bool {
    if slots.is_all_sentinel() {
        return false;
    }
    if !lot_increments_agree(&[
        &slots.lot_residential,
        &slots.lot_hd_residential,
        &slots.lot_light_industry,
        &slots.lot_heavy_industry,
        &slots.lot_commercial,
    ]) {
        return false;
    }

    let res_zone_eia = block.res_lot_eia + block.street_eia;
    let res_zone_treated: SquareMetres = [&slots.lot_residential, &slots.street]
        .into_iter()
        .filter_map(|s| s.as_ref())
        .map(|t| t.total_treated_iao())
        .sum();
    if res_zone_treated.value() > res_zone_eia.value() + 1e-6 {
        return false;
    }

    let service = total_service(slots);
    if service.qty_treated.value() > block.manage_eia.value() + 1e-6 {
        return false;
    }
    if service.wq_treated.value() > block.manage_eia.value() + 1e-6 {
        return false;
    }
    if service.rec_supplied.value() > block.substitutable_demand().value() + 1e-6 {
        return false;
    }
    true
}

fn with_none<T: Clone>(options: &[T]) -> Vec<Option<T>> {
    let mut out: Vec<Option<T>> = options.iter().cloned().map(Some).collect();
    out.push(None);
    out
}

/// Builds every admissible `BlockStrategy` for `block` from its mapper
/// candidates, scores each, groups by service bin, and retains the top
/// `combiner_top_n` per bin (ties broken by a fair coin).
pub fn combine_block(
    block: &Block,
    candidates: &OpportunityCandidates,
    registry: &TechRegistry,
    matrix: &McaMatrix,
    cfg: &PlannerConfig,
    rng: &mut impl Rng,
) -> BinnedStrategies {
    let res = with_none(&candidates.lot_residential);
    let hdr = with_none(&candidates.lot_hd_residential);
    let li = with_none(&candidates.lot_light_industry);
    let hi = with_none(&candidates.lot_heavy_industry);
    let com = with_none(&candidates.lot_commercial);
    let street = with_none(&candidates.street);
    let neigh = with_none(&candidates.neighbourhood);

    let mut binned: BinnedStrategies = HashMap::new();

    for r in &res {
        for h in &hdr {
            for l in &li {
                for hh in &hi {
                    for c in &com {
                        for s in &street {
                            for n in &neigh {
                                let slots = StrategySlots {
                                    lot_residential: r.clone(),
                                    lot_hd_residential: h.clone(),
                                    lot_light_industry: l.clone(),
                                    lot_heavy_industry: hh.clone(),
                                    lot_commercial: c.clone(),
                                    street: s.clone(),
                                    neighbourhood: n.clone(),
                                };
                                if !is_admissible(&slots, block) {
                                    continue;
                                }

                                let service = total_service(&slots);
                                let iao = total_iao(&slots);
                                let bin = identify_bin(&service, &iao, block, cfg.rigour.subbas);
                                let scores = crate::mca::score_slots(
                                    &slots,
                                    registry,
                                    matrix,
                                    cfg,
                                    iao.qty.value(),
                                    iao.wq.value(),
                                    service.qty_treated.value(),
                                    service.wq_treated.value(),
                                    service.rec_supplied.value(),
                                );

                                let strategy = BlockStrategy {
                                    block_id: block.block_id,
                                    slots,
                                    service,
                                    iao,
                                    service_bin: bin,
                                    scores,
                                };
                                binned.entry(bin).or_default().push(strategy);
                            }
                        }
                    }
                }
            }
        }
    }

    for bucket in binned.values_mut() {
        retain_top_n(bucket, cfg.combiner_top_n, rng);
    }
    tracing::debug!(block_id = block.block_id, bins = binned.len(), "combined block strategies");
    binned
}

/// Keeps the top `n` strategies by score, breaking ties with a fair coin
/// rather than a stable sort (so repeated runs with a fixed seed are still
/// deterministic, but tied candidates are not always resolved in insertion
/// order).
fn retain_top_n(bucket: &mut Vec<BlockStrategy>, n: usize, rng: &mut impl Rng) {
    if bucket.len() <= n {
        return;
    }
    bucket.sort_by(|a, b| {
        b.scores
            .total
            .partial_cmp(&a.scores.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| if rng.gen_bool(0.5) { std::cmp::Ordering::Less } else { std::cmp::Ordering::Greater })
    });
    bucket.truncate(n);
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsud_core::block::DemandBucket;
    use wsud_core::units::{Fraction, KilolitresPerYear};
    use wsud_core::{LandUse, Scale, TechCode};

    fn bare_block() -> Block {
        Block {
            block_id: 1,
            basin_id: 1,
            down_id: None,
            outlet: true,
            active: true,
            in_service: true,
            soil_k: 36.0,
            area: SquareMetres::new(1000.0),
            res_allots: 10,
            res_houses: 10,
            res_flats: 0,
            li_estates: 0,
            hi_estates: 0,
            com_estates: 0,
            res_lot_eia: SquareMetres::new(500.0),
            res_lot_tia: SquareMetres::new(500.0),
            hdres_lot_eia: SquareMetres::ZERO,
            hdres_lot_tia: SquareMetres::ZERO,
            li_eia: SquareMetres::ZERO,
            li_tia: SquareMetres::ZERO,
            hi_eia: SquareMetres::ZERO,
            hi_tia: SquareMetres::ZERO,
            com_eia: SquareMetres::ZERO,
            com_tia: SquareMetres::ZERO,
            street_eia: SquareMetres::new(100.0),
            street_tia: SquareMetres::new(100.0),
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

    fn tech(land_use: LandUse, scale: Scale, qty: f64, increment: f64) -> WaterTech {
        WaterTech {
            code: TechCode::BF,
            scale,
            land_use,
            block_id: 1,
            planning_area: SquareMetres::new(10.0),
            ea_factor: Fraction::new(0.1),
            treated_iao_qty: SquareMetres::new(qty),
            treated_iao_wq: SquareMetres::new(qty),
            recycled_demand_served: KilolitresPerYear::ZERO,
            storage: None,
            design_increment: increment,
            unit_count: 1,
        }
    }

    #[test]
    fn all_sentinel_combination_is_rejected() {
        let block = bare_block();
        let slots = StrategySlots::default();
        assert!(!is_admissible(&slots, &block));
    }

    #[test]
    fn mismatched_lot_increments_are_rejected() {
        let slots = vec![
            &Some(tech(LandUse::Residential, Scale::Lot, 50.0, 1.0)),
            &Some(tech(LandUse::LightIndustry, Scale::Lot, 50.0, 0.5)),
        ];
        assert!(!lot_increments_agree(&slots));
    }

    #[test]
    fn combo_exceeding_manage_eia_is_rejected() {
        let block = bare_block();
        let slots = StrategySlots {
            lot_residential: Some(tech(LandUse::Residential, Scale::Lot, 1000.0, 1.0)),
            ..Default::default()
        };
        assert!(!is_admissible(&slots, &block));
    }

    #[test]
    fn unit_count_scales_residential_but_not_hd_residential() {
        let mut res = tech(LandUse::Residential, Scale::Lot, 10.0, 1.0);
        res.unit_count = 5;
        let mut hdr = tech(LandUse::HdResidential, Scale::Lot, 10.0, 1.0);
        hdr.unit_count = 5;

        let res_total = total_service(&StrategySlots {
            lot_residential: Some(res),
            ..Default::default()
        });
        let hdr_total = total_service(&StrategySlots {
            lot_hd_residential: Some(hdr),
            ..Default::default()
        });
        assert_eq!(res_total.qty_treated.value(), 50.0);
        assert_eq!(hdr_total.qty_treated.value(), 10.0);
    }

    #[test]
    fn identify_bin_falls_in_bracket_around_service_level() {
        let block = bare_block();
        let service = ServiceVector {
            qty_treated: SquareMetres::new(300.0),
            wq_treated: SquareMetres::new(300.0),
            rec_supplied: KilolitresPerYear::ZERO,
        };
        let iao = IaoTotals::default();
        let bin = identify_bin(&service, &iao, &block, 4);
        // 300/600 = 0.5, which lands exactly on bin 2 of 4 (0.5).
        assert_eq!(bin, 2);
    }

    #[test]
    fn combine_block_produces_at_least_one_binned_strategy() {
        let block = bare_block();
        let mut candidates = OpportunityCandidates::default();
        candidates.lot_residential.push(tech(LandUse::Residential, Scale::Lot, 200.0, 1.0));
        let registry = TechRegistry::standard();
        let matrix = McaMatrix::new();
        let cfg = PlannerConfig::default();
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let binned = combine_block(&block, &candidates, &registry, &matrix, &cfg, &mut rng);
        let total: usize = binned.values().map(|v| v.len()).sum();
        assert_eq!(total, 1);
    }
}
