// Temporal example construction
// One supervised example per (player, N) where a snapshot exists at N
// and a labeled snapshot exists at N+1. The feature side sees nothing
// from season N onward: stats are hard-filtered to season_year <= N-1.

use crate::domain::FutureValue;
use crate::store::{CanonicalTables, PlayerId, PlayerSeason, PlayerSeasonStats};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// DERIVED VALUES
// ============================================================================

/// Feature snapshot as of report year N: the PlayerSeason row at
/// exactly N plus every stats row at or before the as-of cutoff
/// (end of season N-1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub season: PlayerSeason,
    pub stats: Vec<PlayerSeasonStats>,
}

/// One eligible supervised example: features as of N, label = FV at N+1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingExample {
    pub player_id: PlayerId,
    pub report_year: i32,
    pub features: FeatureSnapshot,
    pub label: FutureValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExclusionReason {
    /// No PlayerSeason row at N+1 (terminal season)
    NoNextSnapshot,
    /// A row exists at N+1 but carries no valuation label
    NextSnapshotUnlabeled,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::NoNextSnapshot => "no_next_snapshot",
            ExclusionReason::NextSnapshotUnlabeled => "next_snapshot_unlabeled",
        }
    }
}

/// A (player, N) pair kept out of the supervised set. The feature
/// snapshot is retained for representation-learning use; nothing is
/// silently dropped from the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedExample {
    pub player_id: PlayerId,
    pub report_year: i32,
    pub reason: ExclusionReason,
    pub features: FeatureSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildOutput {
    pub examples: Vec<TrainingExample>,
    pub excluded: Vec<ExcludedExample>,
}

impl BuildOutput {
    pub fn eligible_count(&self) -> usize {
        self.examples.len()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct TemporalExampleBuilder<'a> {
    tables: &'a CanonicalTables,
}

impl<'a> TemporalExampleBuilder<'a> {
    pub fn new(tables: &'a CanonicalTables) -> Self {
        TemporalExampleBuilder { tables }
    }

    /// Build the supervised set for report year N. Pure given the
    /// canonical tables and N; output order is ascending player id.
    pub fn build(&self, report_year: i32) -> Result<BuildOutput> {
        if !self.tables.years.contains(report_year) {
            bail!(
                "report year {} outside configured interval {}..={}",
                report_year,
                self.tables.years.min,
                self.tables.years.max
            );
        }

        let mut output = BuildOutput::default();

        for season in self.tables.snapshot_population(report_year) {
            let features = self.assemble_features(season, report_year);

            // Eligibility: labeled snapshot at N+1 supplies the label
            match self.tables.season(season.player_id, report_year + 1) {
                Some(next) => match next.fv {
                    Some(label) => output.examples.push(TrainingExample {
                        player_id: season.player_id,
                        report_year,
                        features,
                        label,
                    }),
                    None => output.excluded.push(ExcludedExample {
                        player_id: season.player_id,
                        report_year,
                        reason: ExclusionReason::NextSnapshotUnlabeled,
                        features,
                    }),
                },
                None => output.excluded.push(ExcludedExample {
                    player_id: season.player_id,
                    report_year,
                    reason: ExclusionReason::NoNextSnapshot,
                    features,
                }),
            }
        }

        Ok(output)
    }

    /// Snapshot fields at exactly N; stats strictly before season N.
    /// The season_year filter is the leakage guard and stays a hard
    /// filter regardless of what the input table contains.
    fn assemble_features(&self, season: &PlayerSeason, report_year: i32) -> FeatureSnapshot {
        let stats: Vec<PlayerSeasonStats> = self
            .tables
            .stats_for(season.player_id)
            .iter()
            .filter(|s| s.season_year <= report_year - 1)
            .cloned()
            .collect();

        FeatureSnapshot {
            season: season.clone(),
            stats,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
