//! The run manifest: one JSON record of what a `plan` invocation did, keyed
//! by basin rather than by scenario job.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wsud_planner::PlannerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasinRunRecord {
    pub basin_id: u32,
    pub status: String,
    pub error: Option<String>,
    pub strategy_count: usize,
    pub duration_ms: u128,
    pub output: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub config: PlannerConfig,
    pub seed: u64,
    pub num_basins: usize,
    pub success: usize,
    pub failure: usize,
    pub basins: Vec<BasinRunRecord>,
}

pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating run manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest to JSON")?;
    fs::write(path, json).with_context(|| format!("writing run manifest '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trips_through_json() {
        let manifest = RunManifest {
            created_at: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc),
            config: PlannerConfig::default(),
            seed: 42,
            num_basins: 1,
            success: 1,
            failure: 0,
            basins: vec![BasinRunRecord {
                basin_id: 1,
                status: "ok".to_string(),
                error: None,
                strategy_count: 5,
                duration_ms: 120,
                output: "basin-1.json".to_string(),
            }],
        };
        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_run_manifest(tmp.path(), &manifest).unwrap();
        let text = fs::read_to_string(tmp.path()).unwrap();
        let parsed: RunManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.seed, 42);
        assert_eq!(parsed.basins[0].basin_id, 1);
    }
}
