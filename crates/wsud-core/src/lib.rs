//! Data model, units, error handling, and graph utilities shared by every
//! other crate in the water-sensitive urban drainage planner workspace.
//!
//! This crate is pure: no file I/O, no randomness, no parallelism. It
//! defines what a block, a technology, and a strategy *are*, and the small
//! set of structural utilities (unit-safe arithmetic, a basin topology,
//! attribute-reduction helpers) every other crate builds on.
//!
//! Quick tour:
//! - [`units`] — newtype wrappers (`SquareMetres`, `Kilolitres`, …) so a
//!   square metre and a kilolitre can never be added by accident.
//! - [`block`] — the [`block::Block`] record and
//!   [`block::retrieve_attribute_from_ids`], the typed replacement for the
//!   source system's partially-implemented attribute rollups.
//! - [`tech`] — [`tech::WaterTech`], [`tech::RecycledStorage`], and the
//!   capability-flag [`tech::TechRegistry`].
//! - [`strategy`] — [`strategy::BlockStrategy`] and
//!   [`strategy::BasinStrategy`], the per-block and per-basin outputs.
//! - [`graph`] — [`graph::BasinGraph`], a precomputed upstream-first
//!   topological order and ancestor-set index over a basin's blocks.
//! - [`error`] / [`diagnostics`] — the unified error type and the
//!   non-fatal issue collector.

pub mod block;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod strategy;
pub mod tech;
pub mod units;

pub use block::{AttrReduction, AttrReductionResult, Block, DemandBucket, LandUseScope};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{PlannerError, PlannerResult};
pub use graph::BasinGraph;
pub use strategy::{BasinStrategy, BlockStrategy, BinnedStrategies, McaScores, ServicePValues, ServiceVector};
pub use tech::{DesignBackendKind, LandUse, RecycledStorage, Scale, TechCode, TechDef, TechRegistry, WaterTech};
