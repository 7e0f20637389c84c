//! The Retrofit Decision Machine (§4.5): for each existing asset, casts two
//! independent votes — age-based and performance-drift-based — and acts on
//! whichever is more severe, subject to the active `retrofit_scenario`.
//!
//! `DoNothing` forces every asset to `Keep`. `Forced` gates each scale behind
//! a force flag: when a scale's flag is *off*, that scale is forced to
//! `Keep` regardless of what the votes computed — the flag does not turn
//! renewal/decommission *on*, it turns the machine's own judgement *off*.
//! This is the opposite of the naive reading of "force" and is grounded
//! directly in the source's `if force_x == 0: decision = Keep` branch; see
//! DESIGN.md.

use wsud_core::tech::TechRegistry;
use wsud_core::units::SquareMetres;
use wsud_core::{Scale, TechCode};

use wsud_sizing::adapter::{DesignTargets, PurposeFlags};
use wsud_sizing::curves::DesignCurveCache;

use crate::config::{PlannerConfig, RenewalAlternative, RetrofitScenario};
use crate::mapper::ScaleAvailability;

/// What the machine decided to do with one existing asset this cycle.
/// `Keep < Renew < Decommission`: the stronger of two votes always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RetrofitDecision {
    Keep,
    Renew,
    Decommission,
}

/// A technology already installed at some scale/land use in a block, as
/// tracked between planning cycles.
#[derive(Debug, Clone, Copy)]
pub struct ExistingAsset {
    pub code: TechCode,
    pub scale: Scale,
    pub age_years: u32,
    pub avg_life_years: u32,
    pub planning_area: SquareMetres,
    /// The impervious area originally treated when this asset was designed —
    /// a renewal redesigns against this same footprint under new targets,
    /// not against whatever area the new design happens to prefer.
    pub originally_treated_iao: SquareMetres,
}

/// The outcome of deciding on one asset: the decision itself, and (for a
/// renewal) the newly sized footprint if one was computed.
#[derive(Debug, Clone, Copy)]
pub struct RetrofitOutcome {
    pub decision: RetrofitDecision,
    pub new_planning_area: Option<SquareMetres>,
    pub new_treated_iao: SquareMetres,
}

/// Computes the impervious area a technology's *current* design curve would
/// treat for a footprint fixed at `asset.planning_area` — the inverse of the
/// forward sizing direction the mapper uses. For a curve-backed technology,
/// `area = ea_factor * impervious_target`, so `impervious_target =
/// area / ea_factor`; `ea_factor` is read off by sizing a unit impervious
/// target against today's targets.
fn current_ea_factor(
    code: TechCode,
    registry: &TechRegistry,
    curves: &DesignCurveCache,
    soil_k: f64,
    cfg: &PlannerConfig,
) -> Option<f64> {
    let def = registry.get(code)?;
    let targets = DesignTargets {
        runoff_pct: cfg.targets.runoff_pct,
        tss_pct: cfg.targets.tss_pct,
        tp_pct: cfg.targets.tp_pct,
        tn_pct: cfg.targets.tn_pct,
    };
    let purposes = PurposeFlags {
        runoff: cfg.ration.runoff && def.can_do_runoff,
        pollution: cfg.ration.pollute && def.can_do_pollution,
        recycling: false,
    };
    let outcome = wsud_sizing::design(def, SquareMetres::new(1.0), purposes, soil_k, soil_k, &targets, curves).sized()?;
    if outcome.ea_factor.value() > 0.0 {
        Some(outcome.ea_factor.value())
    } else {
        None
    }
}

/// Vote 1: age-based. Decommission once an asset outlives `avg_life_years`
/// (if this scale permits decommissioning); renew once it passes half its
/// design life (if this scale permits renewal); otherwise keep.
fn age_vote(asset: &ExistingAsset, allow_renew: bool, allow_decom: bool) -> RetrofitDecision {
    if allow_decom && asset.age_years > asset.avg_life_years {
        RetrofitDecision::Decommission
    } else if allow_renew && asset.age_years * 2 > asset.avg_life_years {
        RetrofitDecision::Renew
    } else {
        RetrofitDecision::Keep
    }
}

/// Vote 2: performance-drift-based. `perf_deficit = (old_imp - new_imp) /
/// old_imp`, the fraction of the asset's originally-treated area its current
/// design curve would no longer credit at today's targets. An asset that
/// originally treated zero area is a degenerate case forced to maximum
/// deficit — it can never satisfy a positive target, so there is nothing the
/// votes can measure a ratio against.
fn drift_vote(
    asset: &ExistingAsset,
    new_imp: SquareMetres,
    cfg: &PlannerConfig,
    allow_renew: bool,
    allow_decom: bool,
) -> RetrofitDecision {
    let old_imp = asset.originally_treated_iao.value();
    let deficit = if old_imp <= 0.0 {
        1.0
    } else {
        ((old_imp - new_imp.value()) / old_imp).max(0.0)
    };
    if allow_decom && deficit >= cfg.drift.decom_thresh {
        RetrofitDecision::Decommission
    } else if allow_renew && deficit >= cfg.drift.renewal_thresh {
        RetrofitDecision::Renew
    } else {
        RetrofitDecision::Keep
    }
}

/// Decides what to do with one existing asset this planning cycle. `force`
/// carries the scale's force flag and decommission-allowed flag, already
/// resolved by the caller from [`crate::config::ForceFlags`] for this scale.
/// `years_since_renewal` is used only under `WithRenewal` to gate on the
/// configured cadence.
pub fn decide(
    asset: &ExistingAsset,
    registry: &TechRegistry,
    curves: &DesignCurveCache,
    soil_k: f64,
    cfg: &PlannerConfig,
    years_since_renewal: u32,
) -> RetrofitOutcome {
    // Lot scale never renews, by policy, in every scenario. It may still be
    // decommissioned.
    let lot_scale = asset.scale == Scale::Lot;

    let new_ea_factor = current_ea_factor(asset.code, registry, curves, soil_k, cfg);
    let new_imp = match new_ea_factor {
        Some(f) => SquareMetres::new(asset.planning_area.value() / f),
        None => SquareMetres::ZERO,
    };

    let raw_decision = match cfg.retrofit_scenario {
        RetrofitScenario::DoNothing => RetrofitDecision::Keep,
        RetrofitScenario::WithRenewal => {
            let cadence = match asset.scale {
                Scale::Lot => cfg.renewal.lot_years,
                Scale::Street => cfg.renewal.street_years,
                Scale::Neighbourhood | Scale::SubBasin => cfg.renewal.neigh_years,
            };
            if cadence > 0 && years_since_renewal % cadence != 0 {
                RetrofitDecision::Keep
            } else {
                let allow_renew = !lot_scale;
                let age = age_vote(asset, allow_renew, true);
                let drift = drift_vote(asset, new_imp, cfg, allow_renew, true);
                age.max(drift)
            }
        }
        RetrofitScenario::Forced => {
            let (force_on, decom_allowed) = match asset.scale {
                Scale::Lot => (cfg.force_flags.force_lot, cfg.force_flags.lot_decom),
                Scale::Street => (cfg.force_flags.force_street, cfg.force_flags.street_decom),
                Scale::Neighbourhood => (cfg.force_flags.force_neigh, cfg.force_flags.neigh_decom),
                Scale::SubBasin => (cfg.force_flags.force_subbas, cfg.force_flags.subbas_decom),
            };
            if !force_on {
                RetrofitDecision::Keep
            } else {
                let allow_renew = !lot_scale;
                let age = age_vote(asset, allow_renew, decom_allowed);
                let drift = drift_vote(asset, new_imp, cfg, allow_renew, decom_allowed);
                age.max(drift)
            }
        }
    };

    // Lot-scale renewal is never honoured even if the votes computed it;
    // downgrade to Keep (decommission still stands).
    let decision = if lot_scale && raw_decision == RetrofitDecision::Renew {
        RetrofitDecision::Keep
    } else {
        raw_decision
    };

    let new_planning_area = if decision == RetrofitDecision::Renew {
        redesign(asset, new_imp, registry, curves, soil_k, cfg)
    } else {
        None
    };

    tracing::debug!(code = ?asset.code, scale = ?asset.scale, ?decision, "retrofit decision");

    RetrofitOutcome {
        decision,
        new_planning_area,
        new_treated_iao: new_imp,
    }
}

/// `redesignSystem`: sizes the asset's technology against its *original*
/// treated impervious area, under today's targets, returning the new
/// planning area if one could be sized.
fn redesign(
    asset: &ExistingAsset,
    _new_imp: SquareMetres,
    registry: &TechRegistry,
    curves: &DesignCurveCache,
    soil_k: f64,
    cfg: &PlannerConfig,
) -> Option<SquareMetres> {
    let def = registry.get(asset.code)?;
    let targets = DesignTargets {
        runoff_pct: cfg.targets.runoff_pct,
        tss_pct: cfg.targets.tss_pct,
        tp_pct: cfg.targets.tp_pct,
        tn_pct: cfg.targets.tn_pct,
    };
    let purposes = PurposeFlags {
        runoff: cfg.ration.runoff && def.can_do_runoff,
        pollution: cfg.ration.pollute && def.can_do_pollution,
        recycling: false,
    };
    wsud_sizing::design(
        def,
        asset.originally_treated_iao,
        purposes,
        soil_k,
        soil_k,
        &targets,
        curves,
    )
    .sized()
    .map(|o| o.area)
}

/// Resolves a renewal that does not fit available space: per
/// `renewal_alternative`, either keep the old design or decommission it.
pub fn renewal_fallback(new_area: SquareMetres, available_space: SquareMetres, cfg: &PlannerConfig) -> Option<RetrofitDecision> {
    if new_area.value() <= available_space.value() {
        None
    } else {
        Some(match cfg.renewal_alternative {
            RenewalAlternative::Keep => RetrofitDecision::Keep,
            RenewalAlternative::Decommission => RetrofitDecision::Decommission,
        })
    }
}

/// Applies a retrofit decision's side effects: clears the mapper's
/// availability flag for the scale/land-use this asset occupies (so the
/// mapper does not propose a fresh system on top of a kept asset), and
/// subtracts the asset's treated area from the block's manageable impervious
/// budget so downstream sizing does not double-count it.
pub fn clear_availability(scale: Scale, land_use: wsud_core::LandUse, availability: &mut ScaleAvailability) {
    use wsud_core::LandUse;
    match (scale, land_use) {
        (Scale::Lot, LandUse::Residential) => availability.lot_residential = false,
        (Scale::Lot, LandUse::HdResidential) => availability.lot_hd_residential = false,
        (Scale::Lot, LandUse::LightIndustry) => availability.lot_light_industry = false,
        (Scale::Lot, LandUse::HeavyIndustry) => availability.lot_heavy_industry = false,
        (Scale::Lot, LandUse::Commercial) => availability.lot_commercial = false,
        (Scale::Street, _) => availability.street = false,
        (Scale::Neighbourhood, _) => availability.neighbourhood = false,
        (Scale::SubBasin, _) => availability.subbasin = false,
        _ => {}
    }
}

/// Models building-stock turnover for lot-residential assets: even though
/// lot scale is never renewed, the population of houses still actually
/// served by an ageing system shrinks by `renewal_lot_perc` per elapsed
/// renewal cycle (demolition, subdivision, reconnection to mains). Returns
/// the attrited unit count.
pub fn building_stock_attrition(original_unit_count: u32, elapsed_cycles: u32, lot_perc: f64) -> u32 {
    let retained = (original_unit_count as f64) * (1.0 - lot_perc).max(0.0).powi(elapsed_cycles as i32);
    retained.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(scale: Scale, age: u32, life: u32) -> ExistingAsset {
        ExistingAsset {
            code: TechCode::BF,
            scale,
            age_years: age,
            avg_life_years: life,
            planning_area: SquareMetres::new(50.0),
            originally_treated_iao: SquareMetres::new(500.0),
        }
    }

    #[test]
    fn age_vote_keeps_young_assets() {
        assert_eq!(age_vote(&asset(Scale::Lot, 2, 20), true, true), RetrofitDecision::Keep);
    }

    #[test]
    fn age_vote_renews_past_half_life() {
        assert_eq!(age_vote(&asset(Scale::Street, 11, 20), true, true), RetrofitDecision::Renew);
    }

    #[test]
    fn age_vote_decommissions_past_full_life() {
        assert_eq!(age_vote(&asset(Scale::Street, 21, 20), true, true), RetrofitDecision::Decommission);
    }

    #[test]
    fn drift_vote_forces_max_deficit_when_nothing_was_ever_treated() {
        let mut a = asset(Scale::Street, 5, 20);
        a.originally_treated_iao = SquareMetres::ZERO;
        let cfg = PlannerConfig::default();
        let decision = drift_vote(&a, SquareMetres::ZERO, &cfg, true, true);
        assert_eq!(decision, RetrofitDecision::Decommission);
    }

    #[test]
    fn do_nothing_scenario_always_keeps() {
        let registry = TechRegistry::standard();
        let curves = DesignCurveCache::new();
        let mut cfg = PlannerConfig::default();
        cfg.retrofit_scenario = RetrofitScenario::DoNothing;
        let a = asset(Scale::Street, 50, 20);
        let outcome = decide(&a, &registry, &curves, 36.0, &cfg, 0);
        assert_eq!(outcome.decision, RetrofitDecision::Keep);
    }

    #[test]
    fn scenario_3_forced_scenario_with_flag_off_always_keeps() {
        let registry = TechRegistry::standard();
        let curves = DesignCurveCache::new();
        let mut cfg = PlannerConfig::default();
        cfg.retrofit_scenario = RetrofitScenario::Forced;
        cfg.force_flags.force_street = false;
        let a = asset(Scale::Street, 100, 10);
        let outcome = decide(&a, &registry, &curves, 36.0, &cfg, 0);
        assert_eq!(outcome.decision, RetrofitDecision::Keep, "force flag off must keep regardless of age");
    }

    #[test]
    fn scenario_3_forced_scenario_with_flag_on_decommissions_ancient_asset() {
        let registry = TechRegistry::standard();
        let curves = DesignCurveCache::new();
        let mut cfg = PlannerConfig::default();
        cfg.retrofit_scenario = RetrofitScenario::Forced;
        cfg.force_flags.force_street = true;
        cfg.force_flags.street_decom = true;
        let a = asset(Scale::Street, 100, 10);
        let outcome = decide(&a, &registry, &curves, 36.0, &cfg, 0);
        assert_eq!(outcome.decision, RetrofitDecision::Decommission);
    }

    #[test]
    fn lot_scale_renewal_is_always_downgraded_to_keep() {
        let registry = TechRegistry::standard();
        let curves = DesignCurveCache::new();
        let mut cfg = PlannerConfig::default();
        cfg.retrofit_scenario = RetrofitScenario::Forced;
        cfg.force_flags.force_lot = true;
        cfg.force_flags.lot_decom = false;
        let a = asset(Scale::Lot, 11, 20);
        let outcome = decide(&a, &registry, &curves, 36.0, &cfg, 0);
        assert_eq!(outcome.decision, RetrofitDecision::Keep);
    }

    #[test]
    fn building_stock_attrition_shrinks_compounding_per_cycle() {
        let retained = building_stock_attrition(100, 2, 0.05);
        assert!(retained < 100);
        assert!(retained > 85);
    }
}
