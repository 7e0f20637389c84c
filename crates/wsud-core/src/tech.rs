//! Technology definitions, the capability registry, and the sized
//! `WaterTech`/`RecycledStorage` value types.
//!
//! The source system keys technology behaviour off string-composed lookups
//! (concatenating a type code with a purpose suffix to find a flag). This
//! module replaces that with a registry of [`TechDef`] records carrying
//! explicit capability flags, mirroring the data-driven backend registry the
//! sizing adapter uses for its three sizing strategies.

use std::collections::HashMap;
use std::fmt;

use crate::units::{Fraction, Kilolitres, KilolitresPerYear, SquareMetres};

/// Spatial scale a `WaterTech` (or candidate) applies at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Scale {
    Lot,
    Street,
    Neighbourhood,
    SubBasin,
}

impl Scale {
    pub fn tag(self) -> char {
        match self {
            Scale::Lot => 'L',
            Scale::Street => 'S',
            Scale::Neighbourhood => 'N',
            Scale::SubBasin => 'B',
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Land use a lot-scale (or street-scale) candidate is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LandUse {
    Residential,
    HdResidential,
    LightIndustry,
    HeavyIndustry,
    Commercial,
    /// Non-lot scales (neighbourhood, sub-basin) are not land-use scoped.
    None,
}

/// Water-quality class of a harvested source, and by extension of the end
/// uses a `RecycledStorage` is permitted to serve. Ordered `Potable <
/// NonPotable < Rainwater < Stormwater < Greywater`: a source of class *c*
/// may serve any end use whose required class is `<= c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum WaterQualityClass {
    Potable,
    NonPotable,
    Rainwater,
    Stormwater,
    Greywater,
}

/// The ~21 known technology type codes; only a subset is fully designed by
/// this engine (the rest are recognised so MCA/registry input data need not
/// be pre-filtered, but have no registered `TechDef`).
///
/// `Deserialize` is hand-written rather than derived: the `Other(&'static
/// str)` variant cannot derive `Deserialize` (a derived impl would need
/// `&'static str: Deserialize<'de>` for an arbitrary deserializer lifetime
/// `'de`, which serde does not provide — only `&'de str` borrows that way).
/// Serializing is unaffected, so `Serialize` is still derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TechCode {
    /// Biofilter.
    BF,
    /// Infiltration system.
    IS,
    /// Pond (open storage, treatment).
    PB,
    /// Rainwater tank.
    RT,
    /// Constructed wetland, sub-surface ("wetland sub-urban reservoir").
    WSUR,
    /// Swale.
    SW,
    /// Greywater treatment/storage.
    GW,
    /// Any other recognised-but-undesigned code (kept so MCA files listing
    /// technologies outside this engine's scope do not fail validation).
    Other(&'static str),
}

impl fmt::Display for TechCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TechCode::BF => write!(f, "BF"),
            TechCode::IS => write!(f, "IS"),
            TechCode::PB => write!(f, "PB"),
            TechCode::RT => write!(f, "RT"),
            TechCode::WSUR => write!(f, "WSUR"),
            TechCode::SW => write!(f, "SW"),
            TechCode::GW => write!(f, "GW"),
            TechCode::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for TechCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "BF" => TechCode::BF,
            "IS" => TechCode::IS,
            "PB" => TechCode::PB,
            "RT" => TechCode::RT,
            "WSUR" => TechCode::WSUR,
            "SW" => TechCode::SW,
            "GW" => TechCode::GW,
            _ => TechCode::Other(Box::leak(s.to_ascii_uppercase().into_boxed_str())),
        })
    }
}

impl<'de> serde::Deserialize<'de> for TechCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(s.parse().expect("TechCode::from_str is infallible"))
    }
}

/// How the Design Adapter sizes a given technology — see `wsud-sizing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignBackendKind {
    ByCurve,
    ByEquation,
    BySimulation,
}

/// How a technology integrates a paired `RecycledStorage`, per §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageIntegration {
    /// No recycling support.
    None,
    /// Storage depth adds directly to the treatment system's own footprint.
    Integrated,
    /// Paired with a separate closed (`RT`-typed) auxiliary tank.
    HybridClosedAux,
    /// Paired with a separate open-pond (`PB`-typed) store.
    HybridOpenAux,
}

/// Capability-flag registry entry for one technology type — replaces the
/// source's string-composed "<code>_Ration" style lookups.
#[derive(Debug, Clone)]
pub struct TechDef {
    pub code: TechCode,
    pub can_do_runoff: bool,
    pub can_do_pollution: bool,
    pub can_do_recycle: bool,
    pub permitted_scales: Vec<Scale>,
    pub backend: DesignBackendKind,
    pub storage_integration: StorageIntegration,
    pub min_size: SquareMetres,
    pub max_size: SquareMetres,
    /// Design-curve depth parameter (extended-detention depth, filter
    /// depth, …); unused by equation/simulation-backed technologies.
    pub depth_param: f64,
    pub source_quality: WaterQualityClass,
}

impl TechDef {
    pub fn permits(&self, scale: Scale) -> bool {
        self.permitted_scales.contains(&scale)
    }
}

/// Registry of known, fully designed technologies. Built once at planner
/// startup and shared read-only across basins.
#[derive(Debug, Clone, Default)]
pub struct TechRegistry {
    entries: HashMap<TechCode, TechDef>,
}

impl TechRegistry {
    pub fn new() -> Self {
        TechRegistry::default()
    }

    pub fn register(&mut self, def: TechDef) {
        self.entries.insert(def.code, def);
    }

    pub fn get(&self, code: TechCode) -> Option<&TechDef> {
        self.entries.get(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TechDef> {
        self.entries.values()
    }

    /// The standard registry: BF, IS, PB, RT, WSUR, SW, GW with their
    /// capability flags, permitted scales, and backend assignments.
    pub fn standard() -> Self {
        let mut reg = TechRegistry::new();
        reg.register(
            TechDef {
                code: TechCode::BF,
                can_do_runoff: true,
                can_do_pollution: true,
                can_do_recycle: false,
                permitted_scales: vec![Scale::Lot, Scale::Street, Scale::Neighbourhood, Scale::SubBasin],
                backend: DesignBackendKind::ByCurve,
                storage_integration: StorageIntegration::HybridClosedAux,
                min_size: SquareMetres::new(1.0),
                max_size: SquareMetres::new(1.0e7),
                depth_param: 0.3,
                source_quality: WaterQualityClass::Stormwater,
            },
        );
        reg.register(
            TechDef {
                code: TechCode::IS,
                can_do_runoff: true,
                can_do_pollution: true,
                can_do_recycle: false,
                permitted_scales: vec![Scale::Lot, Scale::Street, Scale::Neighbourhood, Scale::SubBasin],
                backend: DesignBackendKind::ByCurve,
                storage_integration: StorageIntegration::None,
                min_size: SquareMetres::new(1.0),
                max_size: SquareMetres::new(1.0e7),
                depth_param: 0.5,
                source_quality: WaterQualityClass::Stormwater,
            },
        );
        reg.register(
            TechDef {
                code: TechCode::PB,
                can_do_runoff: true,
                can_do_pollution: true,
                can_do_recycle: true,
                permitted_scales: vec![Scale::Neighbourhood, Scale::SubBasin],
                backend: DesignBackendKind::ByCurve,
                storage_integration: StorageIntegration::Integrated,
                min_size: SquareMetres::new(5.0),
                max_size: SquareMetres::new(1.0e7),
                depth_param: 1.2,
                source_quality: WaterQualityClass::Stormwater,
            },
        );
        reg.register(
            TechDef {
                code: TechCode::RT,
                can_do_runoff: false,
                can_do_pollution: false,
                can_do_recycle: true,
                permitted_scales: vec![Scale::Lot],
                backend: DesignBackendKind::ByEquation,
                storage_integration: StorageIntegration::Integrated,
                min_size: SquareMetres::new(0.1),
                max_size: SquareMetres::new(50.0),
                depth_param: 1.5,
                source_quality: WaterQualityClass::Rainwater,
            },
        );
        reg.register(
            TechDef {
                code: TechCode::WSUR,
                can_do_runoff: true,
                can_do_pollution: true,
                can_do_recycle: true,
                permitted_scales: vec![Scale::Neighbourhood, Scale::SubBasin],
                backend: DesignBackendKind::ByCurve,
                storage_integration: StorageIntegration::Integrated,
                min_size: SquareMetres::new(10.0),
                max_size: SquareMetres::new(1.0e7),
                depth_param: 0.6,
                source_quality: WaterQualityClass::Stormwater,
            },
        );
        reg.register(
            TechDef {
                code: TechCode::SW,
                can_do_runoff: true,
                can_do_pollution: true,
                can_do_recycle: true,
                permitted_scales: vec![Scale::Street, Scale::Neighbourhood, Scale::SubBasin],
                backend: DesignBackendKind::ByCurve,
                storage_integration: StorageIntegration::HybridOpenAux,
                min_size: SquareMetres::new(1.0),
                max_size: SquareMetres::new(1.0e7),
                depth_param: 0.2,
                source_quality: WaterQualityClass::Stormwater,
            },
        );
        reg.register(
            TechDef {
                code: TechCode::GW,
                can_do_runoff: false,
                can_do_pollution: false,
                can_do_recycle: true,
                permitted_scales: vec![Scale::Lot],
                backend: DesignBackendKind::ByEquation,
                storage_integration: StorageIntegration::Integrated,
                min_size: SquareMetres::new(0.1),
                max_size: SquareMetres::new(20.0),
                depth_param: 1.0,
                source_quality: WaterQualityClass::Greywater,
            },
        );
        reg
    }
}

/// A sized recycling store embedded in (or paired with) a `WaterTech`.
/// Value type: created only by the Storage Sizer.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RecycledStorage {
    pub volume: Kilolitres,
    pub harvest_area: SquareMetres,
    pub quality_class: WaterQualityClass,
    pub allowed_end_uses: AllowedEndUses,
    pub achieved_reliability: Fraction,
    pub annual_supply: KilolitresPerYear,
}

/// Which end-use categories a store's water quality permits serving.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct AllowedEndUses {
    pub toilet: bool,
    pub laundry: bool,
    pub irrigation: bool,
    pub kitchen: bool,
}

/// A single sized technology instance. Created only by the Technology
/// Opportunity Mapper.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WaterTech {
    pub code: TechCode,
    pub scale: Scale,
    pub land_use: LandUse,
    pub block_id: u32,
    pub planning_area: SquareMetres,
    pub ea_factor: Fraction,
    /// Treated impervious area credited toward the runoff/quantity target.
    pub treated_iao_qty: SquareMetres,
    /// Treated impervious area credited toward the pollutant/quality target.
    pub treated_iao_wq: SquareMetres,
    pub recycled_demand_served: KilolitresPerYear,
    pub storage: Option<RecycledStorage>,
    /// The design increment (fraction in `[0,1]`) this candidate was sized
    /// against.
    pub design_increment: f64,
    /// Number of physical units this single `WaterTech` instance represents
    /// (e.g. houses in a residential land use); the per-unit design is
    /// sized once and scaled by the combiner, never multiplied in here.
    pub unit_count: u32,
}

impl WaterTech {
    pub fn total_treated_iao(&self) -> SquareMetres {
        self.treated_iao_qty.max(self.treated_iao_wq)
    }
}
