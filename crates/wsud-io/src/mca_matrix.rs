//! MCA scoring matrix loader (spec §6 "MCA scoring matrix"): a CSV whose
//! first row is headers prefixed by a criterion-group token (`Te…`, `En…`,
//! `Ec…`, `So…`, any case), and whose subsequent rows are a technology
//! abbreviation followed by its raw per-criterion scores. Each row's score
//! columns are averaged within their group before being handed to the
//! planner — the planner's [`wsud_planner::mca::GroupScores`] already holds
//! one value per group, not a raw per-criterion vector.

use std::path::Path;
use std::str::FromStr;

use wsud_core::{PlannerError, PlannerResult, TechCode};
use wsud_planner::mca::{GroupScores, McaMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Technical,
    Environmental,
    Economic,
    Social,
}

fn classify_header(header: &str) -> Option<Group> {
    let h = header.trim();
    let prefix: String = h.chars().take(2).collect::<String>().to_ascii_lowercase();
    match prefix.as_str() {
        "te" => Some(Group::Technical),
        "en" => Some(Group::Environmental),
        "ec" => Some(Group::Economic),
        "so" => Some(Group::Social),
        _ => None,
    }
}

#[derive(Default)]
struct GroupAccum {
    sum: f64,
    count: u32,
}

impl GroupAccum {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Loads an MCA scoring matrix CSV from `path`.
///
/// The declared header count and a data row's actual field count are
/// allowed to disagree (malformed exports commonly drop a trailing column);
/// only as many score columns as both the header and the row actually carry
/// are read, matching the "auto-detects column counts" interface rule.
pub fn load_mca_matrix(path: &Path) -> PlannerResult<McaMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PlannerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

    let mut records = reader.records();
    let header = records
        .next()
        .ok_or_else(|| PlannerError::Validation("MCA matrix file is empty".to_string()))?
        .map_err(|e| PlannerError::Parse(format!("MCA matrix header row: {e}")))?;

    let groups: Vec<Option<Group>> = header.iter().skip(1).map(classify_header).collect();

    let mut matrix = McaMatrix::new();
    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| PlannerError::Parse(format!("MCA matrix row {}: {e}", line + 2)))?;
        let mut fields = record.iter();
        let tech_str = fields
            .next()
            .ok_or_else(|| PlannerError::Validation(format!("MCA matrix row {} has no technology column", line + 2)))?;
        let tech = TechCode::from_str(tech_str).expect("TechCode::from_str is infallible");

        let mut accum: [GroupAccum; 4] = Default::default();
        for (value_str, group) in fields.zip(groups.iter()) {
            let Some(group) = group else { continue };
            let value: f64 = value_str.parse().map_err(|_| {
                PlannerError::Parse(format!(
                    "MCA matrix row {} column value '{value_str}' is not a number",
                    line + 2
                ))
            })?;
            let idx = match group {
                Group::Technical => 0,
                Group::Environmental => 1,
                Group::Economic => 2,
                Group::Social => 3,
            };
            accum[idx].push(value);
        }

        matrix.insert(
            tech,
            GroupScores {
                technical: accum[0].mean(),
                environmental: accum[1].mean(),
                economic: accum[2].mean(),
                social: accum[3].mean(),
            },
        );
    }

    tracing::info!(count = matrix.len(), path = %path.display(), "loaded MCA scoring matrix");
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{contents}").unwrap();
        f
    }

    #[test]
    fn averages_columns_within_each_group() {
        let csv = "tech,Te1,Te2,En1,Ec1,So1,So2\nBF,0.6,0.8,0.5,0.4,0.7,0.9\n";
        let file = write_tmp(csv);
        let matrix = load_mca_matrix(file.path()).unwrap();
        let bf = matrix.get(&TechCode::BF).unwrap();
        assert!((bf.technical - 0.7).abs() < 1e-9);
        assert!((bf.environmental - 0.5).abs() < 1e-9);
        assert!((bf.economic - 0.4).abs() < 1e-9);
        assert!((bf.social - 0.8).abs() < 1e-9);
    }

    #[test]
    fn header_prefix_matching_is_case_insensitive() {
        let csv = "tech,te1,EN1,eC1,SO1\nIS,1.0,2.0,3.0,4.0\n";
        let file = write_tmp(csv);
        let matrix = load_mca_matrix(file.path()).unwrap();
        let is = matrix.get(&TechCode::IS).unwrap();
        assert_eq!(is.technical, 1.0);
        assert_eq!(is.environmental, 2.0);
    }

    #[test]
    fn short_data_row_is_tolerated_not_rejected() {
        let csv = "tech,Te1,Te2,En1\nPB,0.5,0.6\n";
        let file = write_tmp(csv);
        let matrix = load_mca_matrix(file.path()).unwrap();
        let pb = matrix.get(&TechCode::PB).unwrap();
        assert!((pb.technical - 0.55).abs() < 1e-9);
        assert_eq!(pb.environmental, 0.0);
    }

    #[test]
    fn unrecognised_prefix_column_is_ignored() {
        let csv = "tech,Te1,Notes\nSW,0.9,ignored\n";
        let file = write_tmp(csv);
        let matrix = load_mca_matrix(file.path()).unwrap();
        assert_eq!(matrix.get(&TechCode::SW).unwrap().technical, 0.9);
    }
}
