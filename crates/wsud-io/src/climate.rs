//! Climate series loader (spec §6 "Climate inputs"): rainfall at its native
//! sub-daily timestep and an evaporation daily scaling series, each "one
//! value per line" with blank lines and `#`-prefixed comments ignored.

use std::path::Path;

use wsud_core::{PlannerError, PlannerResult};

/// A parsed rainfall series: one intensity value (mm/h) per native timestep,
/// plus the timestep itself so callers can convert to an annual or
/// event-duration total without re-reading the file.
#[derive(Debug, Clone)]
pub struct RainfallSeries {
    pub timestep_minutes: u32,
    pub intensities_mmh: Vec<f64>,
}

impl RainfallSeries {
    pub fn mean_intensity_mmh(&self) -> f64 {
        if self.intensities_mmh.is_empty() {
            0.0
        } else {
            self.intensities_mmh.iter().sum::<f64>() / self.intensities_mmh.len() as f64
        }
    }
}

/// A parsed daily evaporation scaling series (dimensionless factor applied
/// by the storage sizer's mass balance, per day of the simulated record).
#[derive(Debug, Clone)]
pub struct EvaporationSeries {
    pub daily_scale: Vec<f64>,
}

impl EvaporationSeries {
    pub fn mean_scale(&self) -> f64 {
        if self.daily_scale.is_empty() {
            1.0
        } else {
            self.daily_scale.iter().sum::<f64>() / self.daily_scale.len() as f64
        }
    }
}

fn parse_value_lines(text: &str) -> PlannerResult<Vec<f64>> {
    let mut values = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: f64 = line.parse().map_err(|_| {
            PlannerError::Parse(format!("climate series line {} is not a number: '{line}'", i + 1))
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Loads a rainfall series at `timestep_minutes` resolution from `path`.
pub fn load_rainfall_series(path: &Path, timestep_minutes: u32) -> PlannerResult<RainfallSeries> {
    let text = std::fs::read_to_string(path)?;
    let intensities_mmh = parse_value_lines(&text)?;
    tracing::debug!(count = intensities_mmh.len(), timestep_minutes, "loaded rainfall series");
    Ok(RainfallSeries {
        timestep_minutes,
        intensities_mmh,
    })
}

/// Loads a daily evaporation scaling series from `path`.
pub fn load_evaporation_series(path: &Path) -> PlannerResult<EvaporationSeries> {
    let text = std::fs::read_to_string(path)?;
    let daily_scale = parse_value_lines(&text)?;
    tracing::debug!(count = daily_scale.len(), "loaded evaporation series");
    Ok(EvaporationSeries { daily_scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{contents}").unwrap();
        f
    }

    #[test]
    fn parses_rainfall_ignoring_comments_and_blanks() {
        let f = write_tmp("# mm/h at 6-min timestep\n0.0\n\n2.5\n5.0\n");
        let series = load_rainfall_series(f.path(), 6).unwrap();
        assert_eq!(series.intensities_mmh, vec![0.0, 2.5, 5.0]);
        assert_eq!(series.timestep_minutes, 6);
        assert!((series.mean_intensity_mmh() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn parses_evaporation_daily_scale() {
        let f = write_tmp("0.8\n0.9\n1.0\n");
        let series = load_evaporation_series(f.path()).unwrap();
        assert_eq!(series.daily_scale.len(), 3);
    }

    #[test]
    fn rejects_non_numeric_line() {
        let f = write_tmp("1.0\nnot-a-number\n");
        let err = load_rainfall_series(f.path(), 1).unwrap_err();
        assert!(matches!(err, PlannerError::Parse(_)));
    }
}
