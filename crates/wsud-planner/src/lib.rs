//! The drainage planner core (§4): the Opportunity Mapper, In-Block
//! Combiner, Retrofit Decision Machine, Basin Monte-Carlo Composer, and MCA
//! Scorer, plus the [`config::PlannerConfig`] every one of them reads from.
//!
//! This crate knows about blocks, basins, and technologies; it calls into
//! `wsud-sizing` for footprint sizing but never duplicates that arithmetic.
//! Nothing here touches the filesystem — loading a config file or a block
//! table is `wsud-io`'s job.

pub mod basin;
pub mod combiner;
pub mod config;
pub mod mapper;
pub mod mca;
pub mod retrofit;

pub use basin::{compose_basin, BasinInputs};
pub use combiner::combine_block;
pub use config::PlannerConfig;
pub use mapper::{map_block_opportunities, map_subbasin_opportunities, MapperContext, OpportunityCandidates, ScaleAvailability};
pub use mca::{score_single_tech, score_slots, GroupScores, McaMatrix};
pub use retrofit::{
    building_stock_attrition, clear_availability, decide, renewal_fallback, ExistingAsset, RetrofitDecision,
    RetrofitOutcome,
};
