//! Design-curve loader (spec §6 "Design curve tables"): a small manifest
//! enumerating one curve-table file per (technology, depth parameter,
//! infiltration rate) triple, since that triple cannot be recovered
//! reliably from a bare filename. Each table itself is the same whitespace
//! "text matrix" format `wsud_sizing::curves::DesignCurveCache` already
//! knows how to parse — this loader only resolves paths and populates keys.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use wsud_core::{PlannerError, PlannerResult, TechCode};
use wsud_sizing::curves::{CurveKey, DesignCurveCache};

/// One row of a curve manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct CurveManifestEntry {
    pub tech: String,
    pub depth_param: f64,
    pub infiltration_rate: f64,
    /// Path to the curve-table text file, relative to the manifest's own
    /// directory unless absolute.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct CurveManifest {
    curves: Vec<CurveManifestEntry>,
}

fn parse_manifest(path: &Path, text: &str) -> PlannerResult<CurveManifest> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(text).map_err(|e| PlannerError::Parse(format!("curve manifest yaml: {e}")))
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(text).map_err(|e| PlannerError::Parse(format!("curve manifest json: {e}")))
        }
        _ => serde_yaml::from_str(text)
            .or_else(|_| serde_json::from_str(text))
            .map_err(|e| PlannerError::Parse(format!("curve manifest: {e}"))),
    }
}

/// Loads a curve manifest from `manifest_path` and builds a
/// [`DesignCurveCache`] from the tables it lists. Relative `path` entries
/// resolve against the manifest's own parent directory.
pub fn load_curve_cache(manifest_path: &Path) -> PlannerResult<DesignCurveCache> {
    let text = std::fs::read_to_string(manifest_path)?;
    let manifest = parse_manifest(manifest_path, &text)?;
    let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

    let mut cache = DesignCurveCache::new();
    for entry in &manifest.curves {
        let tech = TechCode::from_str(&entry.tech).expect("TechCode::from_str is infallible");
        let table_path = if entry.path.is_absolute() {
            entry.path.clone()
        } else {
            base_dir.join(&entry.path)
        };
        let table_text = std::fs::read_to_string(&table_path).map_err(|e| {
            PlannerError::Io(std::io::Error::new(
                e.kind(),
                format!("reading curve table '{}': {e}", table_path.display()),
            ))
        })?;
        let curve = DesignCurveCache::parse_curve_text(&table_text);
        let key = CurveKey::new(tech, entry.depth_param, entry.infiltration_rate);
        cache.insert(key, curve);
    }
    tracing::info!(count = manifest.curves.len(), path = %manifest_path.display(), "loaded design curve manifest");
    Ok(cache)
}
