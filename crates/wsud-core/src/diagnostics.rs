//! Non-fatal issue collection, separate from [`crate::error::PlannerError`].
//!
//! Loaders accumulate [`DiagnosticIssue`]s (missing-but-defaultable columns,
//! blocks skipped by policy, technologies infeasible on a given block)
//! instead of aborting, and the caller decides whether any accumulated
//! `Error`-severity issue should stop the run.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    pub block_id: Option<String>,
}

impl DiagnosticIssue {
    pub fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        DiagnosticIssue {
            severity: Severity::Warning,
            category: category.into(),
            message: message.into(),
            block_id: None,
        }
    }

    pub fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        DiagnosticIssue {
            severity: Severity::Error,
            category: category.into(),
            message: message.into(),
            block_id: None,
        }
    }

    pub fn with_block(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }
}

impl fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}:{}] {}", self.severity, self.category, self.message)?;
        if let Some(block_id) = &self.block_id {
            write!(f, " (block {block_id})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Diagnostics {
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.add(DiagnosticIssue::warning(category, message));
    }

    pub fn add_error(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.add(DiagnosticIssue::error(category, message));
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Warning).count()
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Error).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity() {
        let mut d = Diagnostics::new();
        d.add_warning("block", "missing optional column, defaulting to 0.0");
        d.add_error("block", "area is negative");
        assert_eq!(d.warning_count(), 1);
        assert_eq!(d.error_count(), 1);
        assert!(d.has_errors());
    }

    #[test]
    fn display_includes_block_id() {
        let issue = DiagnosticIssue::warning("mapper", "no feasible technologies").with_block("BLK-12");
        assert_eq!(issue.to_string(), "[Warning:mapper] no feasible technologies (block BLK-12)");
    }

    #[test]
    fn extend_merges_issue_lists() {
        let mut d1 = Diagnostics::new();
        d1.add_warning("a", "one");
        let mut d2 = Diagnostics::new();
        d2.add_warning("b", "two");
        d1.extend(d2);
        assert_eq!(d1.issues.len(), 2);
    }
}
