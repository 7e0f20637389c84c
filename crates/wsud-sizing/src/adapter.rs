//! The Design Adapter (spec §4.1): a uniform façade over three sizing
//! strategies — curve-based, equation-based, and simulation-based — selected
//! by the [`DesignBackendKind`] a [`TechDef`] declares. Callers never match
//! on technology code; they call [`design`] and get back a sized footprint
//! or [`DesignResult::Infeasible`].

use wsud_core::units::{Fraction, SquareMetres};
use wsud_core::{DesignBackendKind, TechDef};

use crate::curves::{CurveKey, DesignCurveCache};

/// Which physical purpose a sizing call is being made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignPurpose {
    Runoff,
    Pollution,
}

/// Three-bit purpose selector, matching §4.1's `purpose_flags`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurposeFlags {
    pub runoff: bool,
    pub pollution: bool,
    pub recycling: bool,
}

/// Target service levels a design must achieve, per objective. Quality
/// targets collapse to a single index (the maximum of TSS/TP/TN) because the
/// design-curve matrices are keyed by one service-level value per purpose —
/// see DESIGN.md for why this single-index reading was chosen over a
/// three-dimensional curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignTargets {
    pub runoff_pct: f64,
    pub tss_pct: f64,
    pub tp_pct: f64,
    pub tn_pct: f64,
}

impl DesignTargets {
    pub fn water_quality_pct(&self) -> f64 {
        self.tss_pct.max(self.tp_pct).max(self.tn_pct)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DesignOutcome {
    pub area: SquareMetres,
    pub ea_factor: Fraction,
}

#[derive(Debug, Clone, Copy)]
pub enum DesignResult {
    Sized(DesignOutcome),
    Infeasible,
}

impl DesignResult {
    pub fn sized(self) -> Option<DesignOutcome> {
        match self {
            DesignResult::Sized(outcome) => Some(outcome),
            DesignResult::Infeasible => None,
        }
    }
}

/// One sizing backend. Curve/equation/simulation variants all speak this
/// interface; `design` never branches on technology code, only on
/// `tech.backend`.
trait SizingBackend {
    /// Size for one purpose. `None` means the backend has nothing to offer
    /// for this purpose (caller treats this as infeasible for a *requested*
    /// purpose — callers must already have checked `can_do_*` before asking).
    fn size_for(
        &self,
        tech: &TechDef,
        purpose: DesignPurpose,
        impervious_target: SquareMetres,
        soil_k: f64,
        system_k: f64,
        target_pct: f64,
    ) -> Option<DesignOutcome>;
}

/// Curve-based backend: BF, IS, PB, WSUR, SW. Looks up the design curve for
/// `(tech, depth_param, min(soil_k, system_k))` and interpolates the target
/// service percentage to a surface fraction of the contributing impervious
/// area.
struct CurveBackend<'a> {
    curves: &'a DesignCurveCache,
}

impl<'a> SizingBackend for CurveBackend<'a> {
    fn size_for(
        &self,
        tech: &TechDef,
        _purpose: DesignPurpose,
        impervious_target: SquareMetres,
        soil_k: f64,
        system_k: f64,
        target_pct: f64,
    ) -> Option<DesignOutcome> {
        let governing_infiltration = soil_k.min(system_k);
        let key = CurveKey::new(tech.code, tech.depth_param, governing_infiltration);
        let curve = self.curves.get(&key)?;
        let surface_fraction = curve.interpolate(target_pct);
        if !surface_fraction.is_finite() {
            return None;
        }
        let area = SquareMetres::new(surface_fraction * impervious_target.value());
        Some(DesignOutcome {
            area,
            ea_factor: Fraction::new(surface_fraction).clamped(),
        })
    }
}

/// Equation-based backend: RT, GW closed stores. These technologies are
/// recycling-only (`can_do_runoff == can_do_pollution == false`); their
/// footprint comes from the Storage Sizer's volume via the depth parameter,
/// not from a runoff/pollution curve. `design` never reaches this backend
/// for a runoff/pollution purpose because the mapper only invokes `design`
/// when the technology supports the requested purpose.
struct EquationBackend;

impl SizingBackend for EquationBackend {
    fn size_for(
        &self,
        _tech: &TechDef,
        _purpose: DesignPurpose,
        _impervious_target: SquareMetres,
        _soil_k: f64,
        _system_k: f64,
        _target_pct: f64,
    ) -> Option<DesignOutcome> {
        None
    }
}

/// Simulation-based backend: a short closed-form stand-in for an external
/// storage-behaviour simulation collaborator. No standard technology uses
/// it today (the registry
/// assigns `BySimulation` to none of BF/IS/PB/RT/WSUR/SW/GW), but the
/// dispatch path is exercised by unit tests against a synthetic `TechDef` so
/// a future technology can opt in without adapter changes.
struct SimulationBackend;

impl SizingBackend for SimulationBackend {
    fn size_for(
        &self,
        tech: &TechDef,
        _purpose: DesignPurpose,
        impervious_target: SquareMetres,
        soil_k: f64,
        system_k: f64,
        target_pct: f64,
    ) -> Option<DesignOutcome> {
        let governing_infiltration = soil_k.min(system_k).max(0.01);
        // Asymptotic capture-efficiency curve: surface_fraction rises toward
        // 1 as target_pct -> 100 and falls as infiltration capacity rises.
        let normalised_target = (target_pct / 100.0).clamp(0.0, 1.0);
        let surface_fraction =
            (normalised_target / (normalised_target + tech.depth_param.max(0.01))) / governing_infiltration.sqrt();
        if !surface_fraction.is_finite() || surface_fraction <= 0.0 {
            return None;
        }
        let area = SquareMetres::new(surface_fraction * impervious_target.value());
        Some(DesignOutcome {
            area,
            ea_factor: Fraction::new(surface_fraction).clamped(),
        })
    }
}

fn backend_for<'a>(kind: DesignBackendKind, curves: &'a DesignCurveCache) -> Box<dyn SizingBackend + 'a> {
    match kind {
        DesignBackendKind::ByCurve => Box::new(CurveBackend { curves }),
        DesignBackendKind::ByEquation => Box::new(EquationBackend),
        DesignBackendKind::BySimulation => Box::new(SimulationBackend),
    }
}

/// The Design Adapter's one operation (§4.1). Sizes `tech` against
/// `impervious_target`, invoking the runoff and/or pollution purposes the
/// caller requests (intersected with what `tech` actually supports). The
/// returned area is the maximum over invoked purposes; its `ea_factor`
/// follows whichever purpose produced that maximum. Requesting a purpose
/// `tech` does not support is silently skipped, not penalised — recycling is
/// handled entirely by the Storage Sizer and is never sized here.
pub fn design(
    tech: &TechDef,
    impervious_target: SquareMetres,
    purposes: PurposeFlags,
    soil_k: f64,
    system_k: f64,
    targets: &DesignTargets,
    curves: &DesignCurveCache,
) -> DesignResult {
    let backend = backend_for(tech.backend, curves);
    let mut best: Option<DesignOutcome> = None;
    let mut attempted = false;

    if purposes.runoff && tech.can_do_runoff {
        attempted = true;
        match backend.size_for(
            tech,
            DesignPurpose::Runoff,
            impervious_target,
            soil_k,
            system_k,
            targets.runoff_pct,
        ) {
            Some(outcome) => best = Some(take_larger(best, outcome)),
            None => return DesignResult::Infeasible,
        }
    }

    if purposes.pollution && tech.can_do_pollution {
        attempted = true;
        match backend.size_for(
            tech,
            DesignPurpose::Pollution,
            impervious_target,
            soil_k,
            system_k,
            targets.water_quality_pct(),
        ) {
            Some(outcome) => best = Some(take_larger(best, outcome)),
            None => return DesignResult::Infeasible,
        }
    }

    let outcome = best.unwrap_or(DesignOutcome {
        area: SquareMetres::ZERO,
        ea_factor: Fraction::ZERO,
    });

    if attempted && (outcome.area.value() < tech.min_size.value() || outcome.area.value() > tech.max_size.value()) {
        return DesignResult::Infeasible;
    }

    DesignResult::Sized(outcome)
}

fn take_larger(current: Option<DesignOutcome>, candidate: DesignOutcome) -> DesignOutcome {
    match current {
        Some(existing) if existing.area.value() >= candidate.area.value() => existing,
        _ => candidate,
    }
}
