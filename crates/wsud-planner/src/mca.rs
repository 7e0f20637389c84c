//! The MCA Scorer (§4.7): turns a combination of technologies into a single
//! ranking score, shared by the in-block combiner and the basin composer so
//! neither re-derives scoring rules of its own.
//!
//! Three steps: in-group aggregation per criterion group (weighted by scale
//! preference and purpose priority), a cross-group weighted sum, and an
//! optional over-service penalty applied only at basin level, where the
//! required service vector is known.

use std::collections::HashMap;

use wsud_core::strategy::StrategySlots;
use wsud_core::tech::TechRegistry;
use wsud_core::{McaScores, ServicePValues, TechCode, WaterTech};

use crate::config::{PenaltyStrategy, PlannerConfig};

/// One technology's per-criterion-group MCA score, already collapsed to a
/// single value per group (the column-wise mean of that group's raw metrics)
/// — the collapsing itself is the loader's job (`wsud-io::mca_matrix`), not
/// this module's.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupScores {
    pub technical: f64,
    pub environmental: f64,
    pub economic: f64,
    pub social: f64,
}

/// The parsed MCA input: one [`GroupScores`] per technology code.
pub type McaMatrix = HashMap<TechCode, GroupScores>;

/// Weight contributed by one tech to its strategy's in-group aggregation:
/// scale preference times the average purpose-priority weight of the
/// purposes this specific technology actually serves.
fn tech_weight(tech: &WaterTech, registry: &TechRegistry, cfg: &PlannerConfig) -> f64 {
    let scale_w = match tech.scale {
        wsud_core::Scale::Lot => cfg.scale_priority.lot,
        wsud_core::Scale::Street => cfg.scale_priority.street,
        wsud_core::Scale::Neighbourhood => cfg.scale_priority.neigh,
        wsud_core::Scale::SubBasin => cfg.scale_priority.subbas,
    };

    let Some(def) = registry.get(tech.code) else {
        return scale_w;
    };
    let mut purpose_sum = 0.0;
    let mut purpose_n = 0u32;
    if def.can_do_runoff {
        purpose_sum += cfg.purpose_priority.runoff;
        purpose_n += 1;
    }
    if def.can_do_pollution {
        purpose_sum += cfg.purpose_priority.water_quality;
        purpose_n += 1;
    }
    if def.can_do_recycle {
        purpose_sum += cfg.purpose_priority.recycling;
        purpose_n += 1;
    }
    let purpose_avg = if purpose_n > 0 {
        purpose_sum / purpose_n as f64
    } else {
        0.0
    };
    scale_w * purpose_avg
}

/// Weighted in-group mean of one criterion group across `techs`, each
/// weighted by [`tech_weight`]. Returns 0 if the combination is empty or
/// every included tech is missing from `matrix` (never reached in practice:
/// a `WaterTech` is only ever produced for a registered technology).
fn weighted_group_mean<'a>(
    techs: impl Iterator<Item = &'a WaterTech> + Clone,
    registry: &TechRegistry,
    matrix: &McaMatrix,
    cfg: &PlannerConfig,
    pick: impl Fn(&GroupScores) -> f64,
) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for tech in techs {
        let Some(scores) = matrix.get(&tech.code) else {
            continue;
        };
        let w = tech_weight(tech, registry, cfg);
        weighted_sum += w * pick(scores);
        weight_total += w;
    }
    if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    }
}

/// Inflates a raw cross-group total by the fraction of a combination's
/// treated area that carries an IAO credit, scaled by `iao_influence`.
fn iao_inflate(raw_total: f64, service: (f64, f64, f64), iao: (f64, f64), cfg: &PlannerConfig) -> f64 {
    let (qty, wq, _rec) = service;
    let (iao_qty, iao_wq) = iao;
    let served = qty + wq;
    if served <= 0.0 {
        return raw_total;
    }
    let iao_ratio = ((iao_qty + iao_wq) / served).clamp(0.0, 1.0);
    raw_total * (1.0 + cfg.iao_influence * iao_ratio)
}

/// Scores an arbitrary set of technologies (a `BlockStrategy`'s filled slots,
/// or a single sub-basin `WaterTech` treated as a one-element combination).
/// No penalty is applied here — the composer applies the over-service
/// penalty once, against the whole basin's delivered service.
fn score_techs<'a>(
    techs: impl Iterator<Item = &'a WaterTech> + Clone,
    registry: &TechRegistry,
    matrix: &McaMatrix,
    cfg: &PlannerConfig,
    iao: (f64, f64),
    service: (f64, f64, f64),
) -> McaScores {
    let technical = weighted_group_mean(techs.clone(), registry, matrix, cfg, |g| g.technical);
    let environmental = weighted_group_mean(techs.clone(), registry, matrix, cfg, |g| g.environmental);
    let economic = weighted_group_mean(techs.clone(), registry, matrix, cfg, |g| g.economic);
    let social = weighted_group_mean(techs, registry, matrix, cfg, |g| g.social);

    let raw_total = cfg.mca_weights.w_tech * technical
        + cfg.mca_weights.w_env * environmental
        + cfg.mca_weights.w_ecn * economic
        + cfg.mca_weights.w_soc * social;
    let total = iao_inflate(raw_total, service, iao, cfg);

    McaScores {
        technical,
        environmental,
        economic,
        social,
        total,
    }
}

/// Scores a `BlockStrategy`'s filled slots.
pub fn score_slots(
    slots: &StrategySlots,
    registry: &TechRegistry,
    matrix: &McaMatrix,
    cfg: &PlannerConfig,
    iao_qty: f64,
    iao_wq: f64,
    qty_treated: f64,
    wq_treated: f64,
    rec_supplied: f64,
) -> McaScores {
    score_techs(
        slots.iter(),
        registry,
        matrix,
        cfg,
        (iao_qty, iao_wq),
        (qty_treated, wq_treated, rec_supplied),
    )
}

/// Scores a single sub-basin-scale `WaterTech`, treated as a one-element
/// combination — the composer's sub-basin site pick has no `BlockStrategy`
/// of its own to carry a cached score.
pub fn score_single_tech(tech: &WaterTech, registry: &TechRegistry, matrix: &McaMatrix, cfg: &PlannerConfig) -> McaScores {
    let iao_qty = tech.treated_iao_qty.value();
    let iao_wq = tech.treated_iao_wq.value();
    score_techs(
        std::iter::once(tech),
        registry,
        matrix,
        cfg,
        (iao_qty, iao_wq),
        (iao_qty, iao_wq, tech.recycled_demand_served.value()),
    )
}

/// Applies the configured over-service penalty (§4.7 step 4) to a basin
/// strategy's raw MCA total, given the service actually `provided` against
/// what was `required`. Over-service counts only on dimensions whose penalty
/// toggle is enabled.
///
/// The source's Linear penalty hardcodes its coefficient to `1.0` rather than
/// reading the user-configurable `a`/`b` pair (those are only read by the
/// Power penalty) — see DESIGN.md. This reimplementation follows that
/// asymmetry: Linear always uses `1.0`, Power reads `penalty_coeff`.
pub fn apply_penalty(raw_total: f64, provided: &ServicePValues, required: &ServicePValues, cfg: &PlannerConfig) -> f64 {
    let mut over = Vec::with_capacity(3);
    if cfg.penalty_toggles.qty {
        over.push((provided.runoff.value() - required.runoff.value()).max(0.0));
    }
    if cfg.penalty_toggles.wq {
        over.push((provided.water_quality.value() - required.water_quality.value()).max(0.0));
    }
    if cfg.penalty_toggles.rec {
        over.push((provided.recycling.value() - required.recycling.value()).max(0.0));
    }
    let over_service: f64 = over.iter().sum();

    match cfg.score_strat {
        PenaltyStrategy::NoPenalty => raw_total,
        PenaltyStrategy::Linear => (raw_total * (1.0 - over_service)).max(0.0),
        PenaltyStrategy::Power => (raw_total - cfg.penalty_coeff.a * over_service.powf(cfg.penalty_coeff.b)).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsud_core::units::{Fraction, SquareMetres};
    use wsud_core::tech::{DesignBackendKind, StorageIntegration, WaterQualityClass};
    use wsud_core::{LandUse, Scale, TechDef};

    fn registry_with_bf() -> TechRegistry {
        let mut reg = TechRegistry::new();
        reg.register(TechDef {
            code: TechCode::BF,
            can_do_runoff: true,
            can_do_pollution: true,
            can_do_recycle: false,
            permitted_scales: vec![Scale::Neighbourhood],
            backend: DesignBackendKind::ByCurve,
            storage_integration: StorageIntegration::None,
            min_size: SquareMetres::ZERO,
            max_size: SquareMetres::new(1.0e6),
            depth_param: 0.3,
            source_quality: WaterQualityClass::Stormwater,
        });
        reg
    }

    fn bf_tech(block_id: u32) -> WaterTech {
        WaterTech {
            code: TechCode::BF,
            scale: Scale::Neighbourhood,
            land_use: LandUse::None,
            block_id,
            planning_area: SquareMetres::new(50.0),
            ea_factor: Fraction::new(0.1),
            treated_iao_qty: SquareMetres::new(100.0),
            treated_iao_wq: SquareMetres::new(100.0),
            recycled_demand_served: Default::default(),
            storage: None,
            design_increment: 1.0,
            unit_count: 1,
        }
    }

    #[test]
    fn scenario_4_power_penalty_ranks_below_equal_raw_score() {
        let cfg_no_penalty = PlannerConfig {
            score_strat: PenaltyStrategy::NoPenalty,
            ..Default::default()
        };
        let cfg_power = PlannerConfig {
            score_strat: PenaltyStrategy::Power,
            ..Default::default()
        };
        let provided = ServicePValues {
            runoff: Fraction::new(0.95),
            water_quality: Fraction::new(0.95),
            recycling: Fraction::new(0.95),
        };
        let required = ServicePValues {
            runoff: Fraction::new(0.8),
            water_quality: Fraction::new(0.8),
            recycling: Fraction::new(0.8),
        };
        let a = apply_penalty(0.8, &provided, &required, &cfg_no_penalty);
        let b = apply_penalty(0.8, &provided, &required, &cfg_power);
        assert!(b < a, "over-serviced strategy must be penalised below the unpenalised score");
    }

    #[test]
    fn linear_penalty_never_goes_negative() {
        let cfg = PlannerConfig {
            score_strat: PenaltyStrategy::Linear,
            ..Default::default()
        };
        let provided = ServicePValues {
            runoff: Fraction::new(1.0),
            water_quality: Fraction::new(1.0),
            recycling: Fraction::new(1.0),
        };
        let required = ServicePValues::default();
        let score = apply_penalty(0.5, &provided, &required, &cfg);
        assert!(score >= 0.0);
    }

    #[test]
    fn score_single_tech_uses_scale_and_purpose_weighting() {
        let reg = registry_with_bf();
        let mut matrix = McaMatrix::new();
        matrix.insert(
            TechCode::BF,
            GroupScores {
                technical: 0.8,
                environmental: 0.6,
                economic: 0.5,
                social: 0.7,
            },
        );
        let cfg = PlannerConfig::default();
        let tech = bf_tech(1);
        let scores = score_single_tech(&tech, &reg, &matrix, &cfg);
        assert!((scores.technical - 0.8).abs() < 1e-9);
        assert!(scores.total > 0.0);
    }
}
