//! Run-configuration loader: a dual YAML/JSON probe applied to
//! [`wsud_planner::PlannerConfig`].

use std::path::Path;

use anyhow::{Context, Result};
use wsud_planner::PlannerConfig;

/// Loads a [`PlannerConfig`] from `path`. The extension selects the format
/// when it is unambiguous (`.yaml`/`.yml` or `.json`); anything else is
/// tried as YAML first, then JSON, since YAML is a superset of JSON for the
/// values this config actually uses.
pub fn load_planner_config(path: &Path) -> Result<PlannerConfig> {
    let data = std::fs::read_to_string(path).with_context(|| format!("reading planner config '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing planner config yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing planner config json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing planner config"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"seed": 7, "max_mc": 500}"#).unwrap();
        let cfg = load_planner_config(&path).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.max_mc, 500);
    }

    #[test]
    fn loads_yaml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        std::fs::write(&path, "seed: 11\ncombiner_top_n: 3\n").unwrap();
        let cfg = load_planner_config(&path).unwrap();
        assert_eq!(cfg.seed, 11);
        assert_eq!(cfg.combiner_top_n, 3);
    }

    #[test]
    fn extensionless_file_falls_back_through_yaml_then_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.conf");
        std::fs::write(&path, r#"{"seed": 3}"#).unwrap();
        let cfg = load_planner_config(&path).unwrap();
        assert_eq!(cfg.seed, 3);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.yaml");
        std::fs::write(&path, "seed: 99\n").unwrap();
        let cfg = load_planner_config(&path).unwrap();
        assert_eq!(cfg.seed, 99);
        assert_eq!(cfg.max_mc, PlannerConfig::default().max_mc);
    }
}
