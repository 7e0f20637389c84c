//! The planner's configuration option set, implemented as one flat
//! `serde`-derived struct with a `Default` matching the documented defaults —
//! "load once, pass a reference everywhere", with exactly one active
//! configuration per run rather than a set of scenarios to expand.

use serde::{Deserialize, Serialize};

/// Per-scale planning increment count: discretises `[0,1]` into `n` equal
/// steps `{0, 1/n, 2/n, ..., 1}`.
pub type Rigour = u32;

/// `hs_strategy`: which blocks' demand scopes a sub-basin harvesting site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydraulicStrategy {
    /// `ud` — downstream blocks only.
    Ud,
    /// `uu` — upstream blocks only.
    Uu,
    /// `ua` — the whole basin.
    Ua,
}

/// `retrofit_scenario`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrofitScenario {
    #[serde(rename = "N")]
    DoNothing,
    #[serde(rename = "R")]
    WithRenewal,
    #[serde(rename = "F")]
    Forced,
}

/// `renewal_alternative`: fallback when a renewal redesign does not fit in
/// available space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenewalAlternative {
    #[serde(rename = "K")]
    Keep,
    #[serde(rename = "D")]
    Decommission,
}

/// `score_strat`: the MCA penalty function (§4.7 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyStrategy {
    /// No penalty.
    #[serde(rename = "SNP")]
    NoPenalty,
    /// Linear penalty: `score *= (1 - sum(over-service))`, clipped.
    #[serde(rename = "SLP")]
    Linear,
    /// Power penalty: `score -= a * sum(over-service)^b`, clipped.
    #[serde(rename = "SPP")]
    Power,
}

/// `ranktype`: how the composer's admissible-iteration pool is filtered
/// before emitting finalists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMode {
    /// Keep the top `topranklimit` by score.
    Rank,
    /// Keep the top `(1 - conf_int)` fraction by score.
    ConfidenceInterval,
}

/// `pickingmethod`: how finalists are drawn from the admissible pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PickingMethod {
    /// Deterministic: the top `num_output_strats` by score.
    Top,
    /// CDF-weighted sampling without replacement.
    Rnd,
}

/// Which of the two neighbourhood/sub-basin storage-sizing strategies to
/// use — `[SUPPLEMENT]`, not named in the option table but required to
/// exercise both sizing paths in `wsud-sizing::storage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFitModeOption {
    Bisection,
    LogLogRegression,
}

/// Objective rationale toggles: `ration_{runoff,pollute,harvest}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RationConfig {
    pub runoff: bool,
    pub pollute: bool,
    pub harvest: bool,
}

impl Default for RationConfig {
    fn default() -> Self {
        RationConfig {
            runoff: true,
            pollute: true,
            harvest: true,
        }
    }
}

/// Per-objective design targets, percent units for runoff/TSS/TP/TN,
/// fraction for reliability. `targets_{runoff,TSS,TP,TN,reliability}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TargetsConfig {
    pub runoff_pct: f64,
    pub tss_pct: f64,
    pub tp_pct: f64,
    pub tn_pct: f64,
    pub reliability: f64,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        TargetsConfig {
            runoff_pct: 80.0,
            tss_pct: 80.0,
            tp_pct: 45.0,
            tn_pct: 45.0,
            reliability: 0.8,
        }
    }
}

/// Basin-level required service fractions. `service_{swmQty,swmWQ,rec}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceTargets {
    pub swm_qty: f64,
    pub swm_wq: f64,
    pub rec: f64,
}

impl Default for ServiceTargets {
    fn default() -> Self {
        ServiceTargets {
            swm_qty: 0.8,
            swm_wq: 0.8,
            rec: 0.3,
        }
    }
}

/// Per-scale "is this scale in play" toggle. `strategy_{lot,street,neigh,subbas}_check`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaleChecks {
    pub lot: bool,
    pub street: bool,
    pub neigh: bool,
    pub subbas: bool,
}

impl Default for ScaleChecks {
    fn default() -> Self {
        ScaleChecks {
            lot: true,
            street: true,
            neigh: true,
            subbas: true,
        }
    }
}

/// Per-scale planning increments. `{lot,street,neigh,subbas}_rigour`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RigourConfig {
    pub lot: Rigour,
    pub street: Rigour,
    pub neigh: Rigour,
    pub subbas: Rigour,
}

impl Default for RigourConfig {
    fn default() -> Self {
        RigourConfig {
            lot: 1,
            street: 4,
            neigh: 4,
            subbas: 4,
        }
    }
}

/// Renewal cadence in years per scale, plus lot attrition rate.
/// `renewal_{lot,street,neigh}_years`, `renewal_lot_perc`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenewalCadence {
    pub lot_years: u32,
    pub street_years: u32,
    pub neigh_years: u32,
    pub lot_perc: f64,
}

impl Default for RenewalCadence {
    fn default() -> Self {
        RenewalCadence {
            lot_years: 20,
            street_years: 25,
            neigh_years: 25,
            lot_perc: 0.05,
        }
    }
}

/// Performance-drift thresholds (fraction, not percent, despite the usual
/// "%" framing — stored as `[0,1]` fractions for direct comparison against
/// computed drift ratios).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriftThresholds {
    pub decom_thresh: f64,
    pub renewal_thresh: f64,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        DriftThresholds {
            decom_thresh: 0.40,
            renewal_thresh: 0.20,
        }
    }
}

/// Per-scale force-renew/force-decommission override flags used under
/// `RetrofitScenario::Forced`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ForceFlags {
    pub force_lot: bool,
    pub force_street: bool,
    pub force_neigh: bool,
    pub force_subbas: bool,
    pub lot_decom: bool,
    pub street_decom: bool,
    pub neigh_decom: bool,
    pub subbas_decom: bool,
}

/// Penalty-function coefficients for `PenaltyStrategy::Power`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PenaltyCoefficients {
    pub a: f64,
    pub b: f64,
}

impl Default for PenaltyCoefficients {
    fn default() -> Self {
        PenaltyCoefficients { a: 1.0, b: 1.0 }
    }
}

/// Per-dimension toggle for whether over-service is penalised on that
/// dimension ("Over-service counts only ... dimensions whose penalty toggle
/// is on").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PenaltyToggles {
    pub qty: bool,
    pub wq: bool,
    pub rec: bool,
}

impl Default for PenaltyToggles {
    fn default() -> Self {
        PenaltyToggles {
            qty: true,
            wq: true,
            rec: true,
        }
    }
}

/// Cross-group MCA weights `{w_tech, w_env, w_ecn, w_soc}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct McaWeights {
    pub w_tech: f64,
    pub w_env: f64,
    pub w_ecn: f64,
    pub w_soc: f64,
}

impl Default for McaWeights {
    fn default() -> Self {
        McaWeights {
            w_tech: 0.25,
            w_env: 0.25,
            w_ecn: 0.25,
            w_soc: 0.25,
        }
    }
}

/// Per-scale preference weights used to aggregate in-group MCA scores
/// across a strategy's techs, rescaled to sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalePriority {
    pub lot: f64,
    pub street: f64,
    pub neigh: f64,
    pub subbas: f64,
}

impl Default for ScalePriority {
    fn default() -> Self {
        ScalePriority {
            lot: 0.25,
            street: 0.25,
            neigh: 0.25,
            subbas: 0.25,
        }
    }
}

/// Per-purpose preference weights, rescaled to sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PurposePriority {
    pub runoff: f64,
    pub water_quality: f64,
    pub recycling: f64,
}

impl Default for PurposePriority {
    fn default() -> Self {
        PurposePriority {
            runoff: 0.34,
            water_quality: 0.33,
            recycling: 0.33,
        }
    }
}

/// `rec_demrange_{min,max}`: the fraction-of-mean-annual-inflow window a
/// harvesting demand must land in for the Storage Sizer to accept it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DemandRangeConfig {
    pub min: f64,
    pub max: f64,
}

impl Default for DemandRangeConfig {
    fn default() -> Self {
        DemandRangeConfig { min: 0.05, max: 1.0 }
    }
}

/// The complete option set a planner run is configured with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub ration: RationConfig,
    pub targets: TargetsConfig,
    pub service: ServiceTargets,
    pub strategy_check: ScaleChecks,
    pub rigour: RigourConfig,
    pub hs_strategy: HydraulicStrategy,
    pub retrofit_scenario: RetrofitScenario,
    pub renewal: RenewalCadence,
    pub drift: DriftThresholds,
    pub force_flags: ForceFlags,
    pub renewal_alternative: RenewalAlternative,
    pub score_strat: PenaltyStrategy,
    pub penalty_coeff: PenaltyCoefficients,
    pub penalty_toggles: PenaltyToggles,
    pub mca_weights: McaWeights,
    pub scale_priority: ScalePriority,
    pub purpose_priority: PurposePriority,
    pub iao_influence: f64,
    pub demand_range: DemandRangeConfig,
    pub storage_fit_mode: StorageFitModeOption,
    pub ranktype: RankMode,
    pub topranklimit: usize,
    pub conf_int: f64,
    pub pickingmethod: PickingMethod,
    pub service_redundancy: f64,
    /// Monte-Carlo iteration budget per basin (reduced 10x for single-block
    /// basins per §4.6 step 3).
    pub max_mc: usize,
    /// Number of finalist `BasinStrategy` records emitted per basin.
    pub num_output_strats: usize,
    /// Top-N `BlockStrategy` records retained per service bin by the
    /// combiner (§4.4, default 10).
    pub combiner_top_n: usize,
    /// Global seed mixed with basin id to produce each basin's RNG (§9).
    pub seed: u64,
}

impl Default for HydraulicStrategy {
    fn default() -> Self {
        HydraulicStrategy::Ud
    }
}

impl Default for RetrofitScenario {
    fn default() -> Self {
        RetrofitScenario::DoNothing
    }
}

impl Default for RenewalAlternative {
    fn default() -> Self {
        RenewalAlternative::Keep
    }
}

impl Default for PenaltyStrategy {
    fn default() -> Self {
        PenaltyStrategy::NoPenalty
    }
}

impl Default for RankMode {
    fn default() -> Self {
        RankMode::Rank
    }
}

impl Default for PickingMethod {
    fn default() -> Self {
        PickingMethod::Top
    }
}

impl Default for StorageFitModeOption {
    fn default() -> Self {
        StorageFitModeOption::Bisection
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            ration: RationConfig::default(),
            targets: TargetsConfig::default(),
            service: ServiceTargets::default(),
            strategy_check: ScaleChecks::default(),
            rigour: RigourConfig::default(),
            hs_strategy: HydraulicStrategy::default(),
            retrofit_scenario: RetrofitScenario::default(),
            renewal: RenewalCadence::default(),
            drift: DriftThresholds::default(),
            force_flags: ForceFlags::default(),
            renewal_alternative: RenewalAlternative::default(),
            score_strat: PenaltyStrategy::default(),
            penalty_coeff: PenaltyCoefficients::default(),
            penalty_toggles: PenaltyToggles::default(),
            mca_weights: McaWeights::default(),
            scale_priority: ScalePriority::default(),
            purpose_priority: PurposePriority::default(),
            iao_influence: 0.5,
            demand_range: DemandRangeConfig::default(),
            storage_fit_mode: StorageFitModeOption::default(),
            ranktype: RankMode::default(),
            topranklimit: 20,
            conf_int: 0.1,
            pickingmethod: PickingMethod::default(),
            service_redundancy: 0.05,
            max_mc: 2000,
            num_output_strats: 5,
            combiner_top_n: 10,
            seed: 42,
        }
    }
}

impl PlannerConfig {
    /// All three objectives disabled — the round-trip property from §8:
    /// the planner must then return an empty strategy list for every basin.
    pub fn all_objectives_disabled(&self) -> bool {
        !self.ration.runoff && !self.ration.pollute && !self.ration.harvest
    }

    pub fn objective_enabled_tuple(&self) -> (bool, bool, bool) {
        (self.ration.runoff, self.ration.pollute, self.ration.harvest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_every_objective() {
        let cfg = PlannerConfig::default();
        assert!(!cfg.all_objectives_disabled());
    }

    #[test]
    fn disabling_every_ration_flag_is_detected() {
        let mut cfg = PlannerConfig::default();
        cfg.ration.runoff = false;
        cfg.ration.pollute = false;
        cfg.ration.harvest = false;
        assert!(cfg.all_objectives_disabled());
    }

    #[test]
    fn retrofit_scenario_codes_roundtrip_through_json() {
        let json = serde_json::to_string(&RetrofitScenario::Forced).unwrap();
        assert_eq!(json, "\"F\"");
        let parsed: RetrofitScenario = serde_json::from_str("\"R\"").unwrap();
        assert!(matches!(parsed, RetrofitScenario::WithRenewal));
    }
}
