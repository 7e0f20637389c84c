//! `BlockStrategy` and `BasinStrategy`: the combinatorial and basin-level
//! output records assembled by the in-block combiner and the basin
//! Monte-Carlo composer respectively.

use std::collections::HashMap;

use crate::tech::WaterTech;
use crate::units::{Fraction, KilolitresPerYear, SquareMetres};

/// The seven slots a `BlockStrategy` may fill: one per lot land use, one
/// street slot, one neighbourhood slot. `None` is the "no-tech" sentinel.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StrategySlots {
    pub lot_residential: Option<WaterTech>,
    pub lot_hd_residential: Option<WaterTech>,
    pub lot_light_industry: Option<WaterTech>,
    pub lot_heavy_industry: Option<WaterTech>,
    pub lot_commercial: Option<WaterTech>,
    pub street: Option<WaterTech>,
    pub neighbourhood: Option<WaterTech>,
}

impl StrategySlots {
    pub fn iter(&self) -> impl Iterator<Item = &WaterTech> {
        [
            &self.lot_residential,
            &self.lot_hd_residential,
            &self.lot_light_industry,
            &self.lot_heavy_industry,
            &self.lot_commercial,
            &self.street,
            &self.neighbourhood,
        ]
        .into_iter()
        .filter_map(|slot| slot.as_ref())
    }

    pub fn is_all_sentinel(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Aggregate service delivered by a `BlockStrategy`, before any basin-level
/// accounting.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ServiceVector {
    pub qty_treated: SquareMetres,
    pub wq_treated: SquareMetres,
    pub rec_supplied: KilolitresPerYear,
}

impl ServiceVector {
    pub fn combined(a: ServiceVector, b: ServiceVector) -> ServiceVector {
        ServiceVector {
            qty_treated: a.qty_treated + b.qty_treated,
            wq_treated: a.wq_treated + b.wq_treated,
            rec_supplied: a.rec_supplied + b.rec_supplied,
        }
    }
}

/// Impervious-area-offset totals credited toward upstream treatment.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct IaoTotals {
    pub qty: SquareMetres,
    pub wq: SquareMetres,
}

/// Per-criterion-group + total MCA scores, cached on a `BlockStrategy` so
/// the composer need not re-score during sampling.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct McaScores {
    pub technical: f64,
    pub environmental: f64,
    pub economic: f64,
    pub social: f64,
    pub total: f64,
}

/// A chosen combination of technologies for a single block, scored and
/// binned by service level.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockStrategy {
    pub block_id: u32,
    pub slots: StrategySlots,
    pub service: ServiceVector,
    pub iao: IaoTotals,
    /// Coarsest `subbas_incr` bin containing this strategy's maximum
    /// service fraction.
    pub service_bin: u32,
    pub scores: McaScores,
}

impl BlockStrategy {
    pub fn is_empty(&self) -> bool {
        self.slots.is_all_sentinel()
    }
}

/// A choice made at one block within a basin-wide strategy: either a
/// sub-basin site selection, an in-block `BlockStrategy` selection, or
/// neither (block contributes nothing this iteration).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BasinBlockSelection {
    pub block_id: u32,
    pub subbasin_tech: Option<WaterTech>,
    pub block_strategy: Option<BlockStrategy>,
}

/// Service P-values: fraction of basin-level requirement delivered, per
/// objective.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ServicePValues {
    pub runoff: Fraction,
    pub water_quality: Fraction,
    pub recycling: Fraction,
}

/// A complete, scored basin-wide candidate strategy produced by one
/// Monte-Carlo iteration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BasinStrategy {
    pub basin_id: u32,
    pub selections: Vec<BasinBlockSelection>,
    pub service: ServicePValues,
    pub mca_score: f64,
}

impl BasinStrategy {
    pub fn selection_for(&self, block_id: u32) -> Option<&BasinBlockSelection> {
        self.selections.iter().find(|s| s.block_id == block_id)
    }

    /// `f = Σ(provided - required)` across enabled objectives, the
    /// admission filter for an emitted strategy (§4.6 step 5).
    pub fn objective_function(&self, required: &ServicePValues, enabled: (bool, bool, bool)) -> f64 {
        let mut f = 0.0;
        if enabled.0 {
            f += self.service.runoff.value() - required.runoff.value();
        }
        if enabled.1 {
            f += self.service.water_quality.value() - required.water_quality.value();
        }
        if enabled.2 {
            f += self.service.recycling.value() - required.recycling.value();
        }
        f
    }
}

/// Groups strategies by their service-level bin, as produced by the
/// in-block combiner for one block.
pub type BinnedStrategies = HashMap<u32, Vec<BlockStrategy>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slots_report_all_sentinel() {
        let slots = StrategySlots::default();
        assert!(slots.is_all_sentinel());
    }

    #[test]
    fn objective_function_only_sums_enabled_dimensions() {
        let strategy = BasinStrategy {
            basin_id: 1,
            selections: vec![],
            service: ServicePValues {
                runoff: Fraction::new(0.9),
                water_quality: Fraction::new(0.5),
                recycling: Fraction::new(0.2),
            },
            mca_score: 0.0,
        };
        let required = ServicePValues {
            runoff: Fraction::new(0.8),
            water_quality: Fraction::new(0.8),
            recycling: Fraction::new(0.8),
        };
        let f = strategy.objective_function(&required, (true, false, false));
        assert!((f - 0.1).abs() < 1e-9);
    }
}
