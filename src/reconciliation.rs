// Run reconciliation report
// Every run ends with counts per outcome tag across all three
// subsystems, so silent data loss is always observable.

use crate::training::BuildOutput;
use crate::validation::TableManifest;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,

    /// Per-table load manifests (kept/excluded row counts)
    pub table_manifests: Vec<TableManifest>,

    /// Identity resolution outcomes, by tag
    pub identity_outcomes: BTreeMap<String, usize>,

    /// Supervised example counts, per report year
    pub eligible_examples: BTreeMap<i32, usize>,
    /// Excluded (label-less) counts, per report year and reason
    pub excluded_examples: BTreeMap<i32, BTreeMap<String, usize>>,

    /// Neighborhood fallback levels, per report year and label
    pub neighborhood_fallbacks: BTreeMap<i32, BTreeMap<String, usize>>,
}

impl RunReport {
    pub fn new() -> RunReport {
        RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            table_manifests: Vec::new(),
            identity_outcomes: BTreeMap::new(),
            eligible_examples: BTreeMap::new(),
            excluded_examples: BTreeMap::new(),
            neighborhood_fallbacks: BTreeMap::new(),
        }
    }

    pub fn record_table(&mut self, manifest: TableManifest) {
        self.table_manifests.push(manifest);
    }

    pub fn record_identity_outcomes(&mut self, tally: BTreeMap<String, usize>) {
        for (tag, count) in tally {
            *self.identity_outcomes.entry(tag).or_insert(0) += count;
        }
    }

    pub fn record_build(&mut self, report_year: i32, output: &BuildOutput) {
        self.eligible_examples
            .insert(report_year, output.eligible_count());
        let by_reason = self.excluded_examples.entry(report_year).or_default();
        for excluded in &output.excluded {
            *by_reason
                .entry(excluded.reason.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    pub fn record_neighborhoods(&mut self, report_year: i32, tally: BTreeMap<String, usize>) {
        self.neighborhood_fallbacks.insert(report_year, tally);
    }

    pub fn matched_identities(&self) -> usize {
        self.identity_outcomes
            .iter()
            .filter(|(tag, _)| tag.starts_with("matched_"))
            .map(|(_, n)| n)
            .sum()
    }

    /// Human-readable section-per-line rendering.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("run {} at {}", self.run_id, self.generated_at));

        for manifest in &self.table_manifests {
            lines.push(format!("  table {}", manifest.summary()));
        }

        let ambiguous = self
            .identity_outcomes
            .get("ambiguous_multiple_candidates")
            .copied()
            .unwrap_or(0);
        let unmatched = self
            .identity_outcomes
            .get("unmatched_no_candidate")
            .copied()
            .unwrap_or(0);
        lines.push(format!(
            "  identities: {} matched, {} ambiguous, {} unmatched",
            self.matched_identities(),
            ambiguous,
            unmatched
        ));

        for (year, eligible) in &self.eligible_examples {
            let excluded: usize = self
                .excluded_examples
                .get(year)
                .map(|m| m.values().sum())
                .unwrap_or(0);
            lines.push(format!(
                "  examples {}: {} eligible, {} excluded",
                year, eligible, excluded
            ));
        }

        for (year, tally) in &self.neighborhood_fallbacks {
            let parts: Vec<String> = tally
                .iter()
                .map(|(label, count)| format!("{}={}", label, count))
                .collect();
            lines.push(format!("  neighborhoods {}: {}", year, parts.join(" ")));
        }

        lines.join("\n")
    }

    /// Flatten to (key, value) rows, the manifest interchange shape.
    pub fn to_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("run_id".to_string(), self.run_id.clone()),
            ("generated_at_utc".to_string(), self.generated_at.to_rfc3339()),
        ];
        for manifest in &self.table_manifests {
            rows.push((
                format!("table.{}.kept", manifest.table),
                manifest.kept_rows.to_string(),
            ));
            rows.push((
                format!("table.{}.excluded", manifest.table),
                manifest.excluded_rows.to_string(),
            ));
        }
        for (tag, count) in &self.identity_outcomes {
            rows.push((format!("identity.{}", tag), count.to_string()));
        }
        for (year, count) in &self.eligible_examples {
            rows.push((format!("examples.{}.eligible", year), count.to_string()));
        }
        for (year, by_reason) in &self.excluded_examples {
            for (reason, count) in by_reason {
                rows.push((format!("examples.{}.{}", year, reason), count.to_string()));
            }
        }
        for (year, tally) in &self.neighborhood_fallbacks {
            for (label, count) in tally {
                rows.push((format!("neighborhoods.{}.{}", year, label), count.to_string()));
            }
        }
        rows
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MANIFEST WRITER
// ============================================================================

pub fn write_manifest<W: Write>(writer: W, report: &RunReport) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["key", "value"])?;
    for (key, value) in report.to_rows() {
        csv_writer.write_record([key.as_str(), value.as_str()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_manifest_file(path: &Path, report: &RunReport) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating manifest {}", path.display()))?;
    write_manifest(file, report)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_counts_roll_up() {
        let mut report = RunReport::new();
        let mut tally = BTreeMap::new();
        tally.insert("matched_exact_name_dob".to_string(), 10);
        tally.insert("matched_lastname_dob".to_string(), 3);
        tally.insert("ambiguous_multiple_candidates".to_string(), 2);
        tally.insert("unmatched_no_candidate".to_string(), 1);
        report.record_identity_outcomes(tally);

        assert_eq!(report.matched_identities(), 13);
        let summary = report.summary();
        assert!(summary.contains("13 matched, 2 ambiguous, 1 unmatched"));
    }

    #[test]
    fn test_neighborhood_section() {
        let mut report = RunReport::new();
        let mut tally = BTreeMap::new();
        tally.insert("nominal".to_string(), 40);
        tally.insert("age_widened(1)".to_string(), 5);
        tally.insert("no_neighbors".to_string(), 1);
        report.record_neighborhoods(2023, tally);

        let summary = report.summary();
        assert!(summary.contains("neighborhoods 2023"));
        assert!(summary.contains("age_widened(1)=5"));

        let rows = report.to_rows();
        assert!(rows
            .iter()
            .any(|(k, v)| k == "neighborhoods.2023.nominal" && v == "40"));
    }

    #[test]
    fn test_manifest_rows_and_csv() {
        let mut report = RunReport::new();
        report.eligible_examples.insert(2022, 120);

        let mut out = Vec::new();
        write_manifest(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("key,value"));
        assert!(text.contains("examples.2022.eligible,120"));
    }
}
