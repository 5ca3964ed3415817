// Row-level validation taxonomy
// A validation failure excludes one row with a recorded reason; it
// never aborts the run. Only structural problems (missing columns,
// unreadable files) are fatal, and those are raised as anyhow errors
// at the load boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// REASONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationReason {
    /// `fv` / `fv_next` outside the fixed discrete grid
    LabelOffGrid,
    /// A categorical cell outside its enumerated value set
    UnknownCategorical,
    /// Second or later row for an already-seen primary key
    DuplicatePrimaryKey,
    /// `report_year` outside the configured closed interval
    ReportYearOutOfRange,
    /// Unparseable date cell
    BadDate,
    /// Unparseable numeric cell in a required slot
    BadNumeric,
    /// Required cell empty
    MissingRequired,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::LabelOffGrid => "label_off_grid",
            ValidationReason::UnknownCategorical => "unknown_categorical",
            ValidationReason::DuplicatePrimaryKey => "duplicate_primary_key",
            ValidationReason::ReportYearOutOfRange => "report_year_out_of_range",
            ValidationReason::BadDate => "bad_date",
            ValidationReason::BadNumeric => "bad_numeric",
            ValidationReason::MissingRequired => "missing_required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Row excluded from the canonical population
    Critical,
    /// Row kept, value degraded to empty/None
    Warning,
}

// ============================================================================
// ISSUE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Which table the row came from
    pub table: String,
    /// Row locator, e.g. "mlbam_id=660271 report_year=2023" or "line=14"
    pub row_ref: String,
    pub field: String,
    pub reason: ValidationReason,
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    pub fn critical(
        table: &str,
        row_ref: String,
        field: &str,
        reason: ValidationReason,
        message: String,
    ) -> Self {
        ValidationIssue {
            table: table.to_string(),
            row_ref,
            field: field.to_string(),
            reason,
            severity: Severity::Critical,
            message,
        }
    }

    pub fn warning(
        table: &str,
        row_ref: String,
        field: &str,
        reason: ValidationReason,
        message: String,
    ) -> Self {
        ValidationIssue {
            table: table.to_string(),
            row_ref,
            field: field.to_string(),
            reason,
            severity: Severity::Warning,
            message,
        }
    }
}

// ============================================================================
// TABLE MANIFEST
// ============================================================================

/// Per-table load summary: every excluded row is counted here, so a
/// shrinking table is always visible in the run report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableManifest {
    pub table: String,
    pub input_rows: usize,
    pub kept_rows: usize,
    pub excluded_rows: usize,
    pub issues_by_reason: BTreeMap<String, usize>,
}

impl TableManifest {
    pub fn new(table: &str) -> Self {
        TableManifest {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, issue: &ValidationIssue) {
        *self
            .issues_by_reason
            .entry(issue.reason.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} in, {} kept, {} excluded",
            self.table, self.input_rows, self.kept_rows, self.excluded_rows
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_counts_by_reason() {
        let mut manifest = TableManifest::new("player_season");
        let issue = ValidationIssue::critical(
            "player_season",
            "mlbam_id=1 report_year=2023".to_string(),
            "fv",
            ValidationReason::LabelOffGrid,
            "fv=44 not on grid".to_string(),
        );
        manifest.record(&issue);
        manifest.record(&issue);

        assert_eq!(manifest.issues_by_reason.get("label_off_grid"), Some(&2));
    }

    #[test]
    fn test_manifest_summary_line() {
        let mut manifest = TableManifest::new("player_season_stats");
        manifest.input_rows = 10;
        manifest.kept_rows = 9;
        manifest.excluded_rows = 1;

        assert_eq!(
            manifest.summary(),
            "player_season_stats: 10 in, 9 kept, 1 excluded"
        );
    }
}
