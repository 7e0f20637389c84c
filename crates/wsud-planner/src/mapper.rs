//! The Technology Opportunity Mapper (§4.3): for one block, enumerates every
//! technology/scale/land-use combination the Design Adapter and Storage Sizer
//! can size into the available space, at each scale's configured planning
//! increment. The combiner never sizes anything itself — it only combines
//! what this module already sized.
//!
//! One inner routine, [`size_tech`], is shared by every scale: size the base
//! footprint for whichever physical purposes are in play, then fold in a
//! recycling store per the technology's [`StorageIntegration`] variant. No
//! caller matches on technology code — only on `TechDef` capability flags and
//! `StorageIntegration`, exactly as the registry was built to allow.

use wsud_core::block::Block;
use wsud_core::graph::BasinGraph;
use wsud_core::tech::{AllowedEndUses, StorageIntegration, TechRegistry};
use wsud_core::units::{Fraction, KilolitresPerYear, SquareMetres};
use wsud_core::{LandUse, RecycledStorage, Scale, TechCode, WaterQualityClass, WaterTech};

use wsud_sizing::adapter::{DesignTargets, PurposeFlags};
use wsud_sizing::curves::DesignCurveCache;
use wsud_sizing::storage::{DemandRange, StorageFitMode};

use crate::config::{HydraulicStrategy, PlannerConfig};

/// Per-(scale, land use) "has the retrofit machine already placed a system
/// here" gate. All-true by default; the retrofit machine clears a flag once
/// an existing asset occupies that slot so the mapper does not propose a
/// second system on top of it.
#[derive(Debug, Clone, Copy)]
pub struct ScaleAvailability {
    pub lot_residential: bool,
    pub lot_hd_residential: bool,
    pub lot_light_industry: bool,
    pub lot_heavy_industry: bool,
    pub lot_commercial: bool,
    pub street: bool,
    pub neighbourhood: bool,
    pub subbasin: bool,
}

impl Default for ScaleAvailability {
    fn default() -> Self {
        ScaleAvailability {
            lot_residential: true,
            lot_hd_residential: true,
            lot_light_industry: true,
            lot_heavy_industry: true,
            lot_commercial: true,
            street: true,
            neighbourhood: true,
            subbasin: true,
        }
    }
}

/// Everything the mapper needs that does not vary per block: the registry,
/// the design-curve cache, the climate series, and the active configuration.
pub struct MapperContext<'a> {
    pub registry: &'a TechRegistry,
    pub curves: &'a DesignCurveCache,
    pub rainfall_mm: &'a [f64],
    pub evap_scale_daily: &'a [f64],
    pub config: &'a PlannerConfig,
}

/// One block's candidates at every non-sub-basin scale. Sub-basin candidates
/// are produced separately ([`map_subbasin_opportunities`]) because they
/// depend on the basin graph, not just the block in isolation.
#[derive(Debug, Clone, Default)]
pub struct OpportunityCandidates {
    pub lot_residential: Vec<WaterTech>,
    pub lot_hd_residential: Vec<WaterTech>,
    pub lot_light_industry: Vec<WaterTech>,
    pub lot_heavy_industry: Vec<WaterTech>,
    pub lot_commercial: Vec<WaterTech>,
    pub street: Vec<WaterTech>,
    pub neighbourhood: Vec<WaterTech>,
}

fn design_targets(cfg: &PlannerConfig) -> DesignTargets {
    DesignTargets {
        runoff_pct: cfg.targets.runoff_pct,
        tss_pct: cfg.targets.tss_pct,
        tp_pct: cfg.targets.tp_pct,
        tn_pct: cfg.targets.tn_pct,
    }
}

/// The depth parameter that governs the volume-to-footprint conversion for
/// a tech's recycling store: a Hybrid-A/B tech (§4.3) pairs with a separate,
/// independently-sized auxiliary tank — a closed `RT` tank or an open `PB`
/// pond — whose own `depth_param` determines how deep that tank sits, not
/// the host tech's. Falls back to the host's own `depth_param` if the
/// auxiliary code is not registered.
fn store_depth_param(integration: StorageIntegration, host_depth_param: f64, registry: &TechRegistry) -> f64 {
    let aux_code = match integration {
        StorageIntegration::HybridClosedAux => Some(TechCode::RT),
        StorageIntegration::HybridOpenAux => Some(TechCode::PB),
        StorageIntegration::Integrated | StorageIntegration::None => None,
    };
    aux_code.and_then(|code| registry.get(code)).map(|aux| aux.depth_param).unwrap_or(host_depth_param)
}

/// Rainwater tank (`RT`) and greywater (`GW`) closed stores are only modelled
/// against a household demand bucket — the source system keys their
/// applicability to residential land uses, and this mapper follows that
/// rather than letting every lot land use harvest against the same
/// non-residential demand total (which would multiply-count a block's single
/// `nonres_demand` across LI/HI/COM candidates).
fn recycle_tech_applies(code: TechCode, land_use: LandUse) -> bool {
    match code {
        TechCode::RT | TechCode::GW => matches!(land_use, LandUse::Residential | LandUse::HdResidential),
        _ => true,
    }
}

fn allowed_end_uses_for(class: WaterQualityClass) -> AllowedEndUses {
    match class {
        WaterQualityClass::Potable | WaterQualityClass::NonPotable => AllowedEndUses {
            toilet: true,
            laundry: true,
            irrigation: true,
            kitchen: true,
        },
        WaterQualityClass::Rainwater => AllowedEndUses {
            toilet: true,
            laundry: true,
            irrigation: true,
            kitchen: false,
        },
        WaterQualityClass::Stormwater => AllowedEndUses {
            toilet: false,
            laundry: false,
            irrigation: true,
            kitchen: false,
        },
        WaterQualityClass::Greywater => AllowedEndUses {
            toilet: false,
            laundry: true,
            irrigation: true,
            kitchen: false,
        },
    }
}

/// Sizes a recycling store for `tech` against `harvest_area`/`demand`, using
/// the lot ladder sizer at lot scale and a single-cell grid sizer (rigour 1)
/// at every other scale — the grid sizer's own increment machinery is the
/// combiner/composer's concern, not this per-candidate routine's.
fn size_store(
    scale: Scale,
    harvest_area: SquareMetres,
    demand: KilolitresPerYear,
    ctx: &MapperContext,
) -> Option<wsud_sizing::storage::Store> {
    let cfg = ctx.config;
    let reliability = Fraction::new(cfg.targets.reliability);
    let demand_range = DemandRange {
        min: cfg.demand_range.min,
        max: cfg.demand_range.max,
    };
    let fit_mode = match cfg.storage_fit_mode {
        crate::config::StorageFitModeOption::Bisection => StorageFitMode::Bisection,
        crate::config::StorageFitModeOption::LogLogRegression => StorageFitMode::LogLogRegression,
    };

    match scale {
        Scale::Lot => wsud_sizing::storage::size_lot(
            ctx.rainfall_mm,
            ctx.evap_scale_daily,
            harvest_area,
            demand,
            reliability,
            demand_range,
        ),
        Scale::SubBasin => {
            let table = wsud_sizing::storage::size_subbasin(
                ctx.rainfall_mm,
                ctx.evap_scale_daily,
                harvest_area,
                demand,
                reliability,
                1,
                demand_range,
                fit_mode,
            );
            table.get(1.0, 1.0).map(|cell| cell.store)
        }
        Scale::Street | Scale::Neighbourhood => {
            let table = wsud_sizing::storage::size_neighbourhood(
                ctx.rainfall_mm,
                ctx.evap_scale_daily,
                harvest_area,
                demand,
                reliability,
                1,
                demand_range,
                fit_mode,
            );
            table.get(1.0, 1.0).map(|cell| cell.store)
        }
    }
}

/// The uniform inner sizing routine (§4.3): sizes `tech` for the physical
/// purposes the configuration rations, folds in a recycling store per its
/// `storage_integration`, and rejects the candidate if the combined footprint
/// exceeds `available_space`. Returns `None` if nothing was sized (neither
/// purpose feasible and no store attached) or the footprint does not fit.
#[allow(clippy::too_many_arguments)]
fn size_tech(
    code: TechCode,
    scale: Scale,
    land_use: LandUse,
    block_id: u32,
    impervious_target: SquareMetres,
    increment: f64,
    soil_k: f64,
    available_space: SquareMetres,
    substitutable_demand: KilolitresPerYear,
    unit_count: u32,
    ctx: &MapperContext,
) -> Option<WaterTech> {
    let cfg = ctx.config;
    let def = ctx.registry.get(code)?;
    if !def.permits(scale) {
        return None;
    }

    let scaled_target = impervious_target * increment;
    let purposes = PurposeFlags {
        runoff: cfg.ration.runoff && def.can_do_runoff,
        pollution: cfg.ration.pollute && def.can_do_pollution,
        recycling: false,
    };
    let targets = design_targets(cfg);
    let result = wsud_sizing::design(def, scaled_target, purposes, soil_k, soil_k, &targets, ctx.curves);
    let outcome = result.sized()?;

    let treated_iao_qty = if purposes.runoff { scaled_target } else { SquareMetres::ZERO };
    let treated_iao_wq = if purposes.pollution { scaled_target } else { SquareMetres::ZERO };

    let mut planning_area = outcome.area;
    let mut storage = None;
    let mut recycled_demand_served = KilolitresPerYear::ZERO;

    let wants_recycling =
        cfg.ration.harvest && def.can_do_recycle && def.storage_integration != StorageIntegration::None && recycle_tech_applies(code, land_use);
    if wants_recycling {
        let harvest_area = scaled_target.max(SquareMetres::new(1.0));
        let demand_target = substitutable_demand * increment;
        if let Some(store) = size_store(scale, harvest_area, demand_target, ctx) {
            let depth_param = store_depth_param(def.storage_integration, def.depth_param, ctx.registry);
            let footprint = SquareMetres::new(store.volume.value() / depth_param.max(0.01));
            planning_area = planning_area + footprint;
            recycled_demand_served = store.annual_supply;
            storage = Some(RecycledStorage {
                volume: store.volume,
                harvest_area: store.harvest_area,
                quality_class: def.source_quality,
                allowed_end_uses: allowed_end_uses_for(def.source_quality),
                achieved_reliability: store.achieved_reliability,
                annual_supply: store.annual_supply,
            });
        }
    }

    if !purposes.runoff && !purposes.pollution && storage.is_none() {
        return None;
    }
    if planning_area.value() > available_space.value() {
        return None;
    }

    Some(WaterTech {
        code,
        scale,
        land_use,
        block_id,
        planning_area,
        ea_factor: outcome.ea_factor,
        treated_iao_qty,
        treated_iao_wq,
        recycled_demand_served,
        storage,
        design_increment: increment,
        unit_count,
    })
}

fn lot_increments(cfg: &PlannerConfig, land_use: LandUse) -> Vec<f64> {
    // Residential and HD-residential lot candidates are produced only at a
    // single all-or-none increment: a house or a flat is either fitted with
    // a lot-scale system or not, there is no "half a rainwater tank" option.
    // Light industry, heavy industry and commercial lots are sized at every
    // `lot_rigour` step, since an estate may only partially adopt a system.
    match land_use {
        LandUse::Residential | LandUse::HdResidential => vec![1.0],
        _ => (1..=cfg.rigour.lot.max(1)).map(|i| i as f64 / cfg.rigour.lot.max(1) as f64).collect(),
    }
}

/// The block's unit count for a lot-scale land use — the figure the mapper
/// copies onto `WaterTech.unit_count` for the combiner to multiply by later
/// (§4.3's lot-residential scaling resolution).
fn lot_unit_count(block: &Block, land_use: LandUse) -> u32 {
    match land_use {
        LandUse::Residential => block.res_houses,
        LandUse::HdResidential => block.res_flats,
        LandUse::LightIndustry => block.li_estates,
        LandUse::HeavyIndustry => block.hi_estates,
        LandUse::Commercial => block.com_estates,
        LandUse::None => 1,
    }
}

fn enumerate_lot_land_use(
    block: &Block,
    land_use: LandUse,
    eia: SquareMetres,
    demand: KilolitresPerYear,
    ctx: &MapperContext,
) -> Vec<WaterTech> {
    let mut out = Vec::new();
    if eia.value() <= 0.0 || block.lot_pervious_av.value() <= 0.0 {
        return out;
    }
    let unit_count = lot_unit_count(block, land_use);
    for code in [TechCode::BF, TechCode::IS, TechCode::RT, TechCode::GW] {
        for increment in lot_increments(ctx.config, land_use) {
            if let Some(tech) = size_tech(
                code,
                Scale::Lot,
                land_use,
                block.block_id,
                eia,
                increment,
                block.soil_k,
                block.lot_pervious_av,
                demand,
                unit_count,
                ctx,
            ) {
                out.push(tech);
            }
        }
    }
    out
}

fn enumerate_street(block: &Block, ctx: &MapperContext) -> Vec<WaterTech> {
    let mut out = Vec::new();
    if block.street_eia.value() <= 0.0 || block.street_verge_av.value() <= 0.0 {
        return out;
    }
    let demand = block.res_demand.public_irrigation + block.hdres_demand.public_irrigation;
    let rigour = ctx.config.rigour.street.max(1);
    for code in [TechCode::BF, TechCode::IS, TechCode::SW] {
        for i in 1..=rigour {
            let increment = i as f64 / rigour as f64;
            if let Some(tech) = size_tech(
                code,
                Scale::Street,
                LandUse::Residential,
                block.block_id,
                block.street_eia,
                increment,
                block.soil_k,
                block.street_verge_av,
                demand,
                1,
                ctx,
            ) {
                out.push(tech);
            }
        }
    }
    out
}

fn enumerate_neighbourhood(block: &Block, ctx: &MapperContext) -> Vec<WaterTech> {
    let mut out = Vec::new();
    let available = block.pg_av + block.rsv_av;
    let impervious_target = block.total_eia();
    if impervious_target.value() <= 0.0 || available.value() <= 0.0 {
        return out;
    }
    let demand = block.substitutable_demand();
    let rigour = ctx.config.rigour.neigh.max(1);
    for code in [TechCode::BF, TechCode::IS, TechCode::PB, TechCode::WSUR, TechCode::SW] {
        for i in 1..=rigour {
            let increment = i as f64 / rigour as f64;
            if let Some(tech) = size_tech(
                code,
                Scale::Neighbourhood,
                LandUse::None,
                block.block_id,
                impervious_target,
                increment,
                block.soil_k,
                available,
                demand,
                1,
                ctx,
            ) {
                out.push(tech);
            }
        }
    }
    out
}

/// Enumerates every non-sub-basin-scale candidate for `block`, honouring
/// `availability` (scales the retrofit machine has already occupied) and
/// `strategy_check` (scales turned off for the whole run).
pub fn map_block_opportunities(block: &Block, ctx: &MapperContext, availability: &ScaleAvailability) -> OpportunityCandidates {
    let cfg = ctx.config;
    let mut out = OpportunityCandidates::default();

    if cfg.strategy_check.lot {
        if availability.lot_residential {
            out.lot_residential = enumerate_lot_land_use(
                block,
                LandUse::Residential,
                block.res_lot_eia,
                block.res_demand.non_potable_total(),
                ctx,
            );
        }
        if availability.lot_hd_residential {
            out.lot_hd_residential = enumerate_lot_land_use(
                block,
                LandUse::HdResidential,
                block.hdres_lot_eia,
                block.hdres_demand.non_potable_total(),
                ctx,
            );
        }
        if availability.lot_light_industry {
            out.lot_light_industry =
                enumerate_lot_land_use(block, LandUse::LightIndustry, block.li_eia, block.nonres_demand, ctx);
        }
        if availability.lot_heavy_industry {
            out.lot_heavy_industry =
                enumerate_lot_land_use(block, LandUse::HeavyIndustry, block.hi_eia, block.nonres_demand, ctx);
        }
        if availability.lot_commercial {
            out.lot_commercial =
                enumerate_lot_land_use(block, LandUse::Commercial, block.com_eia, block.nonres_demand, ctx);
        }
    }

    if cfg.strategy_check.street && availability.street {
        out.street = enumerate_street(block, ctx);
    }

    if cfg.strategy_check.neigh && availability.neighbourhood {
        out.neighbourhood = enumerate_neighbourhood(block, ctx);
    }

    tracing::debug!(
        block_id = block.block_id,
        res = out.lot_residential.len(),
        street = out.street.len(),
        neigh = out.neighbourhood.len(),
        "mapped block opportunities"
    );

    out
}

/// Scopes a demand total over a set of blocks by `hs_strategy`: downstream,
/// upstream, or whole-basin.
fn scoped_demand(blocks: &[Block], ids: impl Iterator<Item = u32>) -> KilolitresPerYear {
    let id_set: std::collections::HashSet<u32> = ids.collect();
    blocks
        .iter()
        .filter(|b| id_set.contains(&b.block_id) && b.in_service)
        .map(|b| b.substitutable_demand())
        .sum()
}

/// Enumerates sub-basin-scale candidates sited at `block`: the impervious
/// target is the sum of `manage_eia` over every block upstream of (and
/// including) `block`; the demand total is scoped by `hs_strategy` over
/// downstream, upstream, or the whole basin. Skipped entirely if `block` has
/// no upstream contribution.
pub fn map_subbasin_opportunities(block: &Block, blocks: &[Block], graph: &BasinGraph, ctx: &MapperContext) -> Vec<WaterTech> {
    let cfg = ctx.config;
    if !cfg.strategy_check.subbas {
        return Vec::new();
    }
    let available = block.pg_av + block.rsv_av;
    if available.value() <= 0.0 {
        return Vec::new();
    }

    let ancestors = graph.ancestors_of(block.block_id);
    let impervious_target: SquareMetres = blocks
        .iter()
        .filter(|b| b.in_service && (b.block_id == block.block_id || ancestors.contains(&b.block_id)))
        .map(|b| b.manage_eia)
        .sum();
    if impervious_target.value() <= 0.0 {
        return Vec::new();
    }

    let demand = match cfg.hs_strategy {
        HydraulicStrategy::Uu => {
            scoped_demand(blocks, ancestors.iter().copied().chain(std::iter::once(block.block_id)))
        }
        HydraulicStrategy::Ud => {
            let descendants = graph.descendants_of(block.block_id);
            scoped_demand(blocks, descendants.iter().copied().chain(std::iter::once(block.block_id)))
        }
        HydraulicStrategy::Ua => scoped_demand(blocks, blocks.iter().map(|b| b.block_id)),
    };

    let mut out = Vec::new();
    let rigour = cfg.rigour.subbas.max(1);
    for code in [TechCode::BF, TechCode::IS, TechCode::PB, TechCode::WSUR, TechCode::SW] {
        for i in 1..=rigour {
            let increment = i as f64 / rigour as f64;
            if let Some(tech) = size_tech(
                code,
                Scale::SubBasin,
                LandUse::None,
                block.block_id,
                impervious_target,
                increment,
                block.soil_k,
                available,
                demand,
                1,
                ctx,
            ) {
                out.push(tech);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsud_core::block::DemandBucket;
    use wsud_sizing::curves::{CurveKey, DesignCurve};

    fn bare_block(id: u32) -> Block {
        Block {
            block_id: id,
            basin_id: 1,
            down_id: None,
            outlet: true,
            active: true,
            in_service: true,
            soil_k: 36.0,
            area: SquareMetres::new(2000.0),
            res_allots: 10,
            res_houses: 10,
            res_flats: 0,
            li_estates: 0,
            hi_estates: 0,
            com_estates: 0,
            res_lot_eia: SquareMetres::new(500.0),
            res_lot_tia: SquareMetres::new(600.0),
            hdres_lot_eia: SquareMetres::ZERO,
            hdres_lot_tia: SquareMetres::ZERO,
            li_eia: SquareMetres::ZERO,
            li_tia: SquareMetres::ZERO,
            hi_eia: SquareMetres::ZERO,
            hi_tia: SquareMetres::ZERO,
            com_eia: SquareMetres::ZERO,
            com_tia: SquareMetres::ZERO,
            street_eia: SquareMetres::new(100.0),
            street_tia: SquareMetres::new(120.0),
            pg_av: SquareMetres::new(300.0),
            rsv_av: SquareMetres::new(200.0),
            street_verge_av: SquareMetres::new(80.0),
            lot_pervious_av: SquareMetres::new(400.0),
            res_demand: DemandBucket {
                kitchen: KilolitresPerYear::new(10.0),
                shower: KilolitresPerYear::new(20.0),
                toilet: KilolitresPerYear::new(15.0),
                laundry: KilolitresPerYear::new(10.0),
                indoor_irrigation: KilolitresPerYear::ZERO,
                public_irrigation: KilolitresPerYear::new(5.0),
            },
            hdres_demand: DemandBucket::default(),
            nonres_demand: KilolitresPerYear::ZERO,
            manage_eia: SquareMetres::new(600.0),
        }
    }

    fn ctx_with_curves<'a>(
        registry: &'a TechRegistry,
        curves: &'a DesignCurveCache,
        config: &'a PlannerConfig,
        rainfall: &'a [f64],
        evap: &'a [f64],
    ) -> MapperContext<'a> {
        MapperContext {
            registry,
            curves,
            rainfall_mm: rainfall,
            evap_scale_daily: evap,
            config,
        }
    }

    #[test]
    fn lot_residential_produces_single_increment_candidates() {
        let registry = TechRegistry::standard();
        let mut curves = DesignCurveCache::new();
        let bf = registry.get(TechCode::BF).unwrap();
        curves.insert(
            CurveKey::new(TechCode::BF, bf.depth_param, 36.0),
            DesignCurve::new(vec![(0.0, 0.0), (100.0, 0.2)]),
        );
        let is = registry.get(TechCode::IS).unwrap();
        curves.insert(
            CurveKey::new(TechCode::IS, is.depth_param, 36.0),
            DesignCurve::new(vec![(0.0, 0.0), (100.0, 0.25)]),
        );
        let cfg = PlannerConfig::default();
        let rainfall = vec![5.0; 730];
        let evap = vec![1.0];
        let ctx = ctx_with_curves(&registry, &curves, &cfg, &rainfall, &evap);
        let block = bare_block(1);

        let candidates = enumerate_lot_land_use(&block, LandUse::Residential, block.res_lot_eia, block.res_demand.non_potable_total(), &ctx);
        assert!(candidates.iter().all(|c| (c.design_increment - 1.0).abs() < 1e-9));
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.unit_count == block.res_houses));
    }

    #[test]
    fn lot_li_produces_candidates_at_every_rigour_step() {
        let registry = TechRegistry::standard();
        let mut curves = DesignCurveCache::new();
        let bf = registry.get(TechCode::BF).unwrap();
        curves.insert(
            CurveKey::new(TechCode::BF, bf.depth_param, 36.0),
            DesignCurve::new(vec![(0.0, 0.0), (100.0, 0.1)]),
        );
        let mut cfg = PlannerConfig::default();
        cfg.rigour.lot = 4;
        let rainfall = vec![5.0; 730];
        let evap = vec![1.0];
        let ctx = ctx_with_curves(&registry, &curves, &cfg, &rainfall, &evap);
        let mut block = bare_block(1);
        block.li_eia = SquareMetres::new(300.0);
        block.lot_pervious_av = SquareMetres::new(1000.0);

        let candidates = enumerate_lot_land_use(&block, LandUse::LightIndustry, block.li_eia, block.nonres_demand, &ctx);
        let increments: std::collections::HashSet<i64> =
            candidates.iter().map(|c| (c.design_increment * 4.0).round() as i64).collect();
        assert!(increments.len() > 1, "LI lot candidates should span multiple rigour steps");
    }

    #[test]
    fn neighbourhood_candidates_rejected_when_no_open_space() {
        let registry = TechRegistry::standard();
        let curves = DesignCurveCache::new();
        let cfg = PlannerConfig::default();
        let rainfall = vec![5.0; 10];
        let evap = vec![1.0];
        let ctx = ctx_with_curves(&registry, &curves, &cfg, &rainfall, &evap);
        let mut block = bare_block(1);
        block.pg_av = SquareMetres::ZERO;
        block.rsv_av = SquareMetres::ZERO;

        let candidates = enumerate_neighbourhood(&block, &ctx);
        assert!(candidates.is_empty());
    }

    #[test]
    fn subbasin_opportunities_skipped_without_upstream_impervious_area() {
        let registry = TechRegistry::standard();
        let curves = DesignCurveCache::new();
        let cfg = PlannerConfig::default();
        let rainfall = vec![5.0; 10];
        let evap = vec![1.0];
        let ctx = ctx_with_curves(&registry, &curves, &cfg, &rainfall, &evap);
        let mut block = bare_block(1);
        block.manage_eia = SquareMetres::ZERO;
        let blocks = vec![block.clone()];
        let graph = BasinGraph::build(&blocks, 1).unwrap();

        let candidates = map_subbasin_opportunities(&block, &blocks, &graph, &ctx);
        assert!(candidates.is_empty());
    }
}
