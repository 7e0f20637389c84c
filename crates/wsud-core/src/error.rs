//! Unified error type for the planner engine.
//!
//! Every crate in the workspace returns [`PlannerResult`]; infeasibility and
//! policy skips are never represented here (see `diagnostics` and the
//! sizer/mapper return types) because they are expected outcomes, not
//! failures.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("sizing backend error: {0}")]
    Sizing(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("basin graph error: {0}")]
    Basin(String),

    #[error("{0}")]
    Other(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;

impl From<anyhow::Error> for PlannerError {
    fn from(err: anyhow::Error) -> Self {
        PlannerError::Other(err.to_string())
    }
}

impl From<String> for PlannerError {
    fn from(s: String) -> Self {
        PlannerError::Other(s)
    }
}

impl From<&str> for PlannerError {
    fn from(s: &str) -> Self {
        PlannerError::Other(s.to_string())
    }
}
