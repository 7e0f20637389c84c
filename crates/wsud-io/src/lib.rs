//! File-format boundary for the drainage planner: every loader that turns
//! an external file into a `wsud-core`/`wsud-sizing`/`wsud-planner` type.
//!
//! Nothing in `wsud-core`, `wsud-sizing`, or `wsud-planner` touches the
//! filesystem; this crate is where that boundary lives, matching the
//! teacher's own separation between a pure core and its `*-io` crate.

pub mod block_table;
pub mod climate;
pub mod config;
pub mod curves_io;
pub mod mca_matrix;

pub use block_table::load_block_table;
pub use climate::{load_evaporation_series, load_rainfall_series, EvaporationSeries, RainfallSeries};
pub use config::load_planner_config;
pub use curves_io::{load_curve_cache, CurveManifestEntry};
pub use mca_matrix::load_mca_matrix;
