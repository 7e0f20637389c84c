//! The Storage Sizer (spec §4.2): three entry points — lot, neighbourhood,
//! sub-basin — each computing the recycling-store volume needed to meet a
//! target reliability from a rainfall/evaporation series and a demand
//! bucket. All three share one daily mass-balance core; the lot sizer walks
//! a fixed tank ladder, the grid sizers bisect (or, under
//! `storage_fit_mode`, apply a closed-form regression) over a
//! harvest-area/supply-fraction grid.

use wsud_core::units::{Fraction, Kilolitres, KilolitresPerYear, SquareMetres};

/// Assumed fraction of incident rainfall that becomes harvestable runoff
/// from a roof or paved catchment.
const RUNOFF_COEFFICIENT: f64 = 0.85;

/// The fixed ladder of lot-scale tank sizes the lot sizer walks, smallest
/// first.
pub const LOT_TANK_LADDER_KL: &[f64] = &[0.5, 1.0, 2.0, 3.0, 5.0, 7.5, 10.0, 15.0, 20.0, 30.0, 50.0];

/// A sized recycling store: the Storage Sizer's sole product.
#[derive(Debug, Clone, Copy)]
pub struct Store {
    pub volume: Kilolitres,
    pub harvest_area: SquareMetres,
    pub achieved_reliability: Fraction,
    pub annual_supply: KilolitresPerYear,
}

/// Demand must fall within `[min, max]` as a fraction of mean annual inflow,
/// or sizing is infeasible (§4.2 "Infeasibility rules").
#[derive(Debug, Clone, Copy)]
pub struct DemandRange {
    pub min: f64,
    pub max: f64,
}

/// Which of the two neighbourhood/sub-basin sizing strategies to use for a
/// grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFitMode {
    /// Bisect tank volume against the daily mass-balance simulation until
    /// reliability matches the target within tolerance.
    Bisection,
    /// A closed-form log-log regression fit for the target region, used in
    /// place of repeated bisection when `storage_fit_mode` requests it.
    LogLogRegression,
}

fn mean_annual_inflow_kl(rainfall_mm: &[f64], harvest_area: SquareMetres) -> f64 {
    if rainfall_mm.is_empty() {
        return 0.0;
    }
    let total_mm: f64 = rainfall_mm.iter().sum();
    let years = rainfall_mm.len() as f64 / 365.25;
    if years <= 0.0 {
        return 0.0;
    }
    (total_mm / 1000.0) * harvest_area.value() * RUNOFF_COEFFICIENT / years
}

/// Runs a daily mass-balance: inflow accrues from rainfall (scaled by the
/// daily evaporation series, cycled if shorter than the rainfall record),
/// capped at `tank_kl`; demand draws down the tank, unmet demand is simply
/// foregone (no backup supply modelled). Returns the achieved reliability
/// (fraction of days fully served) and the resulting mean annual supply.
fn simulate_mass_balance(
    rainfall_mm: &[f64],
    evap_scale_daily: &[f64],
    harvest_area: SquareMetres,
    demand: KilolitresPerYear,
    tank_kl: f64,
) -> (Fraction, KilolitresPerYear) {
    let n = rainfall_mm.len();
    if n == 0 || tank_kl <= 0.0 {
        return (Fraction::ZERO, KilolitresPerYear::ZERO);
    }
    let daily_demand = demand.value() / 365.25;
    let mut volume = 0.0_f64;
    let mut days_met = 0usize;
    let mut total_supplied = 0.0_f64;

    for (i, &rain) in rainfall_mm.iter().enumerate() {
        let evap_factor = if evap_scale_daily.is_empty() {
            1.0
        } else {
            evap_scale_daily[i % evap_scale_daily.len()]
        };
        let inflow_kl = (rain / 1000.0) * harvest_area.value() * RUNOFF_COEFFICIENT * evap_factor;
        volume = (volume + inflow_kl).min(tank_kl);
        let draw = daily_demand.min(volume);
        volume -= draw;
        total_supplied += draw;
        if draw >= daily_demand - 1e-9 {
            days_met += 1;
        }
    }

    let reliability = Fraction::new(days_met as f64 / n as f64);
    let years = n as f64 / 365.25;
    let annual_supply = KilolitresPerYear::new(total_supplied / years.max(1e-9));
    (reliability, annual_supply)
}

/// Checks the uniform infeasibility rule: no demand, or demand outside
/// `[dmin, dmax]` of mean annual inflow.
fn demand_in_range(demand: KilolitresPerYear, mean_inflow_kl: f64, range: DemandRange) -> bool {
    if demand.value() <= 0.0 || mean_inflow_kl <= 0.0 {
        return false;
    }
    let fraction = demand.value() / mean_inflow_kl;
    fraction >= range.min && fraction <= range.max
}

/// Lot-scale sizer: walks [`LOT_TANK_LADDER_KL`] and returns the smallest
/// tank whose simulated reliability meets `reliability_target`.
pub fn size_lot(
    rainfall_mm: &[f64],
    evap_scale_daily: &[f64],
    harvest_area: SquareMetres,
    demand: KilolitresPerYear,
    reliability_target: Fraction,
    demand_range: DemandRange,
) -> Option<Store> {
    let mean_inflow = mean_annual_inflow_kl(rainfall_mm, harvest_area);
    if !demand_in_range(demand, mean_inflow, demand_range) {
        return None;
    }

    for &tank_kl in LOT_TANK_LADDER_KL {
        let (reliability, annual_supply) =
            simulate_mass_balance(rainfall_mm, evap_scale_daily, harvest_area, demand, tank_kl);
        if reliability.value() >= reliability_target.value() {
            return Some(Store {
                volume: Kilolitres::new(tank_kl),
                harvest_area,
                achieved_reliability: reliability,
                annual_supply,
            });
        }
    }
    None
}

/// Bisects tank volume against the mass-balance simulation until reliability
/// matches `target` within `tolerance`, or returns `None` if even the search
/// ceiling cannot meet it.
fn bisect_tank(
    rainfall_mm: &[f64],
    evap_scale_daily: &[f64],
    harvest_area: SquareMetres,
    demand: KilolitresPerYear,
    target: Fraction,
    tolerance: f64,
) -> Option<(Kilolitres, Fraction, KilolitresPerYear)> {
    let ceiling = (demand.value().max(1.0)) * 2.0;
    let (rel_at_ceiling, supply_at_ceiling) =
        simulate_mass_balance(rainfall_mm, evap_scale_daily, harvest_area, demand, ceiling);
    if rel_at_ceiling.value() + tolerance < target.value() {
        return None;
    }

    let mut lo = 0.0_f64;
    let mut hi = ceiling;
    let mut best = (Kilolitres::new(hi), rel_at_ceiling, supply_at_ceiling);
    for _ in 0..40 {
        let mid = (lo + hi) / 2.0;
        let (reliability, supply) = simulate_mass_balance(rainfall_mm, evap_scale_daily, harvest_area, demand, mid);
        if reliability.value() + tolerance >= target.value() {
            hi = mid;
            best = (Kilolitres::new(mid), reliability, supply);
        } else {
            lo = mid;
        }
    }
    Some(best)
}

/// Closed-form log-log regression fit for the target region, used instead
/// of bisection when `StorageFitMode::LogLogRegression` is selected.
/// Coefficients are a synthetic fit (no ported constants from any external
/// source), tuned only so volume increases with demand and with reliability
/// target, matching the qualitative shape bisection produces.
fn regression_tank_size(demand: KilolitresPerYear, reliability_target: Fraction) -> Kilolitres {
    const A: f64 = 0.15;
    const B: f64 = 0.9;
    const C: f64 = 0.3;
    let r = reliability_target.value().clamp(0.01, 0.99);
    let logit_r = (r / (1.0 - r)).ln();
    let log_v = A + B * demand.value().max(0.01).ln() + C * logit_r;
    Kilolitres::new(log_v.exp())
}

/// One cell of a neighbourhood/sub-basin grid table: a (harvest-area,
/// supply-fraction) increment pair and its sized store.
#[derive(Debug, Clone, Copy)]
pub struct StorageCell {
    pub harvest_increment: f64,
    pub supply_increment: f64,
    pub store: Store,
}

/// The full grid produced by [`size_grid`], keyed by increment index pair.
#[derive(Debug, Clone, Default)]
pub struct GridStorageTable {
    pub rigour: u32,
    pub cells: Vec<StorageCell>,
}

impl GridStorageTable {
    pub fn get(&self, harvest_increment: f64, supply_increment: f64) -> Option<&StorageCell> {
        const EPS: f64 = 1e-6;
        self.cells.iter().find(|c| {
            (c.harvest_increment - harvest_increment).abs() < EPS && (c.supply_increment - supply_increment).abs() < EPS
        })
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Shared grid sizer used by both `size_neighbourhood` and `size_subbasin`:
/// for every (harvest%, supply%) pair on a uniform `rigour+1`-step grid in
/// `[0,1]`, sizes a tank against `harvest_area_total * harvest%` and
/// `demand_total * supply%`.
fn size_grid(
    rainfall_mm: &[f64],
    evap_scale_daily: &[f64],
    harvest_area_total: SquareMetres,
    demand_total: KilolitresPerYear,
    reliability_target: Fraction,
    rigour: u32,
    demand_range: DemandRange,
    fit_mode: StorageFitMode,
    tolerance: f64,
) -> GridStorageTable {
    let mut cells = Vec::new();
    if rigour == 0 {
        return GridStorageTable { rigour, cells };
    }

    for h in 1..=rigour {
        let harvest_increment = h as f64 / rigour as f64;
        let harvest_area = SquareMetres::new(harvest_area_total.value() * harvest_increment);
        let mean_inflow = mean_annual_inflow_kl(rainfall_mm, harvest_area);

        for s in 1..=rigour {
            let supply_increment = s as f64 / rigour as f64;
            let target_demand = KilolitresPerYear::new(demand_total.value() * supply_increment);
            if !demand_in_range(target_demand, mean_inflow, demand_range) {
                continue;
            }

            let store = match fit_mode {
                StorageFitMode::Bisection => {
                    match bisect_tank(
                        rainfall_mm,
                        evap_scale_daily,
                        harvest_area,
                        target_demand,
                        reliability_target,
                        tolerance,
                    ) {
                        Some((volume, achieved_reliability, annual_supply)) => Store {
                            volume,
                            harvest_area,
                            achieved_reliability,
                            annual_supply,
                        },
                        None => continue,
                    }
                }
                StorageFitMode::LogLogRegression => {
                    let volume = regression_tank_size(target_demand, reliability_target);
                    Store {
                        volume,
                        harvest_area,
                        achieved_reliability: reliability_target,
                        annual_supply: target_demand,
                    }
                }
            };

            cells.push(StorageCell {
                harvest_increment,
                supply_increment,
                store,
            });
        }
    }

    GridStorageTable { rigour, cells }
}

/// Neighbourhood-scale sizer: `demand_total` is the combined open-space
/// catchment's substitutable demand, `harvest_area_total` its combined
/// harvestable impervious area.
#[allow(clippy::too_many_arguments)]
pub fn size_neighbourhood(
    rainfall_mm: &[f64],
    evap_scale_daily: &[f64],
    harvest_area_total: SquareMetres,
    demand_total: KilolitresPerYear,
    reliability_target: Fraction,
    rigour: u32,
    demand_range: DemandRange,
    fit_mode: StorageFitMode,
) -> GridStorageTable {
    size_grid(
        rainfall_mm,
        evap_scale_daily,
        harvest_area_total,
        demand_total,
        reliability_target,
        rigour,
        demand_range,
        fit_mode,
        0.02,
    )
}

/// Sub-basin-scale sizer: identical mechanics to [`size_neighbourhood`];
/// `demand_total` is scoped by the caller's `hs_strategy` (downstream,
/// upstream, or whole-basin demand), and `harvest_area_total` is the summed
/// impervious area of the upstream blocks the site drains.
#[allow(clippy::too_many_arguments)]
pub fn size_subbasin(
    rainfall_mm: &[f64],
    evap_scale_daily: &[f64],
    harvest_area_total: SquareMetres,
    demand_total: KilolitresPerYear,
    reliability_target: Fraction,
    rigour: u32,
    demand_range: DemandRange,
    fit_mode: StorageFitMode,
) -> GridStorageTable {
    size_grid(
        rainfall_mm,
        evap_scale_daily,
        harvest_area_total,
        demand_total,
        reliability_target,
        rigour,
        demand_range,
        fit_mode,
        0.02,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_rainfall(days: usize, mm_per_day: f64) -> Vec<f64> {
        vec![mm_per_day; days]
    }

    #[test]
    fn lot_sizer_picks_smallest_tank_meeting_reliability() {
        let rainfall = flat_rainfall(730, 5.0);
        let evap = vec![1.0];
        let demand = KilolitresPerYear::new(50.0);
        let store = size_lot(
            &rainfall,
            &evap,
            SquareMetres::new(100.0),
            demand,
            Fraction::new(0.8),
            DemandRange { min: 0.05, max: 0.95 },
        );
        let store = store.expect("ample rainfall should size a tank");
        assert!(store.volume.value() > 0.0);
        assert!(store.achieved_reliability.value() >= 0.8);
    }

    #[test]
    fn lot_sizer_infeasible_when_demand_outside_range() {
        let rainfall = flat_rainfall(365, 2.0);
        let evap = vec![1.0];
        // demand is a vastly larger multiple of mean inflow than demand_range allows.
        let demand = KilolitresPerYear::new(1.0);
        let store = size_lot(
            &rainfall,
            &evap,
            SquareMetres::new(10.0),
            demand,
            Fraction::new(0.95),
            DemandRange { min: 0.10, max: 1.00 },
        );
        assert!(store.is_none());
    }

    #[test]
    fn lot_sizer_infeasible_with_no_demand() {
        let rainfall = flat_rainfall(365, 5.0);
        let store = size_lot(
            &rainfall,
            &[1.0],
            SquareMetres::new(100.0),
            KilolitresPerYear::ZERO,
            Fraction::new(0.5),
            DemandRange { min: 0.0, max: 1.0 },
        );
        assert!(store.is_none());
    }

    #[test]
    fn grid_sizer_produces_increasing_volume_with_supply_fraction() {
        let rainfall = flat_rainfall(1095, 6.0);
        let table = size_neighbourhood(
            &rainfall,
            &[1.0],
            SquareMetres::new(5000.0),
            KilolitresPerYear::new(2000.0),
            Fraction::new(0.7),
            4,
            DemandRange { min: 0.01, max: 1.0 },
            StorageFitMode::Bisection,
        );
        assert!(!table.is_empty());
        let low = table.get(1.0, 0.25).map(|c| c.store.volume.value());
        let high = table.get(1.0, 1.0).map(|c| c.store.volume.value());
        if let (Some(low), Some(high)) = (low, high) {
            assert!(high >= low, "larger supply target should not need a smaller tank");
        }
    }

    #[test]
    fn regression_fit_mode_scales_with_target_reliability() {
        let low = regression_tank_size(KilolitresPerYear::new(100.0), Fraction::new(0.5));
        let high = regression_tank_size(KilolitresPerYear::new(100.0), Fraction::new(0.95));
        assert!(high.value() > low.value());
    }
}
