//! The catchment `Block` record and the reduction helper that replaces the
//! source system's string-keyed, partially-implemented attribute rollups.
//!
//! Blocks are a fixed, fully typed record (see the "dynamic attribute bags"
//! design note) rather than a name-indexed bag: every field a downstream
//! component needs is present on the struct, and `Manage_EIA` is computed
//! once during preprocessing instead of being patched in place.

use crate::units::{Fraction, KilolitresPerYear, SquareMetres};

/// Per-land-use household water demand, broken down by end use.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct DemandBucket {
    pub kitchen: KilolitresPerYear,
    pub shower: KilolitresPerYear,
    pub toilet: KilolitresPerYear,
    pub laundry: KilolitresPerYear,
    pub indoor_irrigation: KilolitresPerYear,
    pub public_irrigation: KilolitresPerYear,
}

impl DemandBucket {
    pub fn total(&self) -> KilolitresPerYear {
        self.kitchen
            + self.shower
            + self.toilet
            + self.laundry
            + self.indoor_irrigation
            + self.public_irrigation
    }

    /// Demand servable by a source no more restrictive than non-potable
    /// (kitchen demand requires a potable-grade source and is excluded).
    pub fn non_potable_total(&self) -> KilolitresPerYear {
        self.shower + self.toilet + self.laundry + self.indoor_irrigation + self.public_irrigation
    }
}

/// A single catchment block: a stable unit of the drainage network.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub block_id: u32,
    pub basin_id: u32,
    /// Neighbouring block the outflow drains to; `None` is the `-1`
    /// catchment-outlet sentinel.
    pub down_id: Option<u32>,
    pub outlet: bool,
    /// Whether this block participates in the simulation at all.
    pub active: bool,
    /// Whether this block's own attributes are visible to upstream
    /// aggregation queries (`retrieve_attribute_from_ids`); distinct from
    /// `active`.
    pub in_service: bool,

    pub soil_k: f64,
    pub area: SquareMetres,

    pub res_allots: u32,
    pub res_houses: u32,
    pub res_flats: u32,
    pub li_estates: u32,
    pub hi_estates: u32,
    pub com_estates: u32,

    pub res_lot_eia: SquareMetres,
    pub res_lot_tia: SquareMetres,
    pub hdres_lot_eia: SquareMetres,
    pub hdres_lot_tia: SquareMetres,
    pub li_eia: SquareMetres,
    pub li_tia: SquareMetres,
    pub hi_eia: SquareMetres,
    pub hi_tia: SquareMetres,
    pub com_eia: SquareMetres,
    pub com_tia: SquareMetres,
    pub street_eia: SquareMetres,
    pub street_tia: SquareMetres,

    /// Park open space.
    pub pg_av: SquareMetres,
    /// Reserve open space.
    pub rsv_av: SquareMetres,
    pub street_verge_av: SquareMetres,
    pub lot_pervious_av: SquareMetres,

    pub res_demand: DemandBucket,
    pub hdres_demand: DemandBucket,
    pub nonres_demand: KilolitresPerYear,

    /// The subset of this block's effective impervious area the planner is
    /// asked to manage given the active land-use scope. Computed once
    /// during preprocessing; never re-derived from `active`.
    pub manage_eia: SquareMetres,
}

impl Block {
    /// Total effective impervious area across every land use in this block.
    pub fn total_eia(&self) -> SquareMetres {
        self.res_lot_eia
            + self.hdres_lot_eia
            + self.li_eia
            + self.hi_eia
            + self.com_eia
            + self.street_eia
    }

    /// Demand substitutable by harvesting, across residential + HD-res +
    /// non-residential end uses.
    pub fn substitutable_demand(&self) -> KilolitresPerYear {
        self.res_demand.non_potable_total() + self.hdres_demand.non_potable_total() + self.nonres_demand
    }

    /// Recomputes `manage_eia` from the land uses currently in scope.
    /// `scope` selects which land-use EIA contributes; an empty scope
    /// yields zero (nothing to manage).
    pub fn recompute_manage_eia(&mut self, scope: &LandUseScope) {
        let mut total = SquareMetres::ZERO;
        if scope.residential {
            total = total + self.res_lot_eia + self.street_eia;
        }
        if scope.hd_residential {
            total = total + self.hdres_lot_eia;
        }
        if scope.light_industry {
            total = total + self.li_eia;
        }
        if scope.heavy_industry {
            total = total + self.hi_eia;
        }
        if scope.commercial {
            total = total + self.com_eia;
        }
        self.manage_eia = total;
    }
}

/// Which land-use categories are in scope for `Manage_EIA` computation.
#[derive(Debug, Clone, Copy)]
pub struct LandUseScope {
    pub residential: bool,
    pub hd_residential: bool,
    pub light_industry: bool,
    pub heavy_industry: bool,
    pub commercial: bool,
}

impl Default for LandUseScope {
    fn default() -> Self {
        LandUseScope {
            residential: true,
            hd_residential: true,
            light_industry: true,
            heavy_industry: true,
            commercial: true,
        }
    }
}

/// The five reduction modes over a set of per-block attribute values.
/// The source system declared all five but only implemented `Sum` and
/// `List`; all five are implemented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrReduction {
    Sum,
    Average,
    Max,
    Min,
    MinNotZero,
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrReductionResult {
    Scalar(f64),
    List(Vec<f64>),
}

impl AttrReductionResult {
    pub fn scalar(&self) -> f64 {
        match self {
            AttrReductionResult::Scalar(v) => *v,
            AttrReductionResult::List(v) => v.iter().sum(),
        }
    }
}

/// Looks up `ids` in `blocks`, applies `accessor` to each in-service block,
/// and reduces the resulting values according to `reduction`.
///
/// Blocks not found, or with `in_service == false`, are skipped entirely
/// (mirroring the `Status` exclusion in the upstream aggregation queries
/// this replaces).
pub fn retrieve_attribute_from_ids(
    blocks: &[Block],
    ids: &[u32],
    reduction: AttrReduction,
    accessor: impl Fn(&Block) -> f64,
) -> AttrReductionResult {
    let datavector: Vec<f64> = ids
        .iter()
        .filter_map(|id| blocks.iter().find(|b| b.block_id == *id && b.in_service))
        .map(|b| accessor(b))
        .collect();

    match reduction {
        AttrReduction::Sum => AttrReductionResult::Scalar(datavector.iter().sum()),
        AttrReduction::Average => {
            if datavector.is_empty() {
                AttrReductionResult::Scalar(0.0)
            } else {
                AttrReductionResult::Scalar(datavector.iter().sum::<f64>() / datavector.len() as f64)
            }
        }
        AttrReduction::Max => AttrReductionResult::Scalar(
            datavector.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        )
        .normalize_empty(&datavector),
        AttrReduction::Min => {
            AttrReductionResult::Scalar(datavector.iter().cloned().fold(f64::INFINITY, f64::min))
                .normalize_empty(&datavector)
        }
        AttrReduction::MinNotZero => {
            let v = datavector
                .iter()
                .cloned()
                .filter(|x| *x != 0.0)
                .fold(f64::INFINITY, f64::min);
            let v = if v.is_finite() { v } else { 0.0 };
            AttrReductionResult::Scalar(v)
        }
        AttrReduction::List => AttrReductionResult::List(datavector),
    }
}

impl AttrReductionResult {
    fn normalize_empty(self, source: &[f64]) -> Self {
        if source.is_empty() {
            AttrReductionResult::Scalar(0.0)
        } else {
            self
        }
    }
}

/// Fraction of a quantity served, with the numerical-edge rule that a
/// zero-demand dimension is vacuously fully served (quotient defined as 1).
pub fn service_fraction(served: f64, required: f64) -> Fraction {
    if required <= 0.0 {
        Fraction::ONE
    } else {
        Fraction::new(served / required).clamped()
    }
}
