// Similarity neighborhoods for evaluation diagnostics
// Hard stratum = (role, assigned_level, age_bin); soft distance ranks
// inside the stratum. When a stratum is too sparse the age bin widens
// one step at a time; role and level are never relaxed. Output is
// diagnostic only and never feeds training.

use crate::domain::{Level, Role};
use crate::store::{check_required_columns, CanonicalTables, PlayerId, PlayerSeason};
use crate::validation::{TableManifest, ValidationIssue, ValidationReason};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// DISTANCE METRIC (injected)
// ============================================================================

/// Soft ranking metric over externally standardized feature vectors.
/// The engine never computes or standardizes vectors itself.
pub trait DistanceMetric {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;
}

pub struct EuclideanDistance;

impl DistanceMetric for EuclideanDistance {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len(), "vector dimensions disagree");
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

/// Feature vectors per (player, report year), supplied by the
/// out-of-scope vectorization stage.
pub type FeatureVectors = BTreeMap<(PlayerId, i32), Vec<f64>>;

pub const VECTORS_TABLE: &str = "feature_vectors";
const VECTORS_REQUIRED: [&str; 2] = ["mlbam_id", "report_year"];

/// Outcome of loading the vector table: keyed vectors plus the full
/// issue trail, same shape as the canonical-table loads.
#[derive(Debug, Clone)]
pub struct FeatureVectorLoad {
    pub vectors: FeatureVectors,
    pub issues: Vec<ValidationIssue>,
    pub manifest: TableManifest,
}

impl FeatureVectorLoad {
    fn exclude(&mut self, issue: ValidationIssue) {
        self.manifest.record(&issue);
        self.manifest.excluded_rows += 1;
        self.issues.push(issue);
    }
}

/// Load externally-computed standardized vectors from CSV: `mlbam_id`,
/// `report_year`, then one column per vector dimension, in header
/// order. A row with an unusable key or a non-numeric vector cell is
/// excluded whole, never zero-filled; the csv reader already rejects
/// ragged rows, so every kept vector has the header's width.
pub fn load_feature_vectors<R: std::io::Read>(reader: R) -> Result<FeatureVectorLoad> {
    use anyhow::Context;

    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("reading feature vector header")?
        .clone();
    check_required_columns(VECTORS_TABLE, &headers, &VECTORS_REQUIRED)?;

    let mut load = FeatureVectorLoad {
        vectors: FeatureVectors::new(),
        issues: Vec::new(),
        manifest: TableManifest::new(VECTORS_TABLE),
    };

    'rows: for (i, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: record {}", VECTORS_TABLE, i + 1))?;
        let line_ref = format!("line={}", i + 2);

        let mut player = None;
        let mut year = None;
        let mut values = Vec::new();
        for (name, cell) in headers.iter().zip(record.iter()) {
            match name.trim() {
                "mlbam_id" => player = PlayerId::parse(cell),
                "report_year" => year = cell.trim().parse::<i32>().ok(),
                dim => match cell.trim().parse::<f64>() {
                    Ok(v) => values.push(v),
                    Err(_) => {
                        load.exclude(ValidationIssue::critical(
                            VECTORS_TABLE,
                            line_ref.clone(),
                            dim,
                            ValidationReason::BadNumeric,
                            format!("unusable vector cell {:?} in {}", cell, dim),
                        ));
                        continue 'rows;
                    }
                },
            }
        }

        let (player, year) = match (player, year) {
            (Some(p), Some(y)) => (p, y),
            _ => {
                load.exclude(ValidationIssue::critical(
                    VECTORS_TABLE,
                    line_ref,
                    "mlbam_id,report_year",
                    ValidationReason::MissingRequired,
                    "unusable vector key".to_string(),
                ));
                continue;
            }
        };

        if load.vectors.contains_key(&(player, year)) {
            load.exclude(ValidationIssue::critical(
                VECTORS_TABLE,
                line_ref,
                "mlbam_id,report_year",
                ValidationReason::DuplicatePrimaryKey,
                format!("duplicate vector for mlbam_id={} report_year={}", player, year),
            ));
            continue;
        }

        load.vectors.insert((player, year), values);
        load.manifest.kept_rows += 1;
    }

    load.manifest.input_rows = load.manifest.kept_rows + load.manifest.excluded_rows;
    Ok(load)
}

pub fn load_feature_vectors_file(path: &std::path::Path) -> Result<FeatureVectorLoad> {
    use anyhow::Context;
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening feature vectors {}", path.display()))?;
    load_feature_vectors(file)
}

// ============================================================================
// AGE BINNING
// ============================================================================

/// Configured discretization of raw age into integer bins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeBinning {
    pub origin: f64,
    pub width: f64,
}

impl AgeBinning {
    pub fn new(origin: f64, width: f64) -> AgeBinning {
        AgeBinning { origin, width }
    }

    pub fn bin(&self, age: f64) -> i32 {
        ((age - self.origin) / self.width).floor() as i32
    }
}

impl Default for AgeBinning {
    fn default() -> Self {
        // One-year bins anchored at age 16, the bottom of the signing pool
        AgeBinning::new(16.0, 1.0)
    }
}

// ============================================================================
// CONFIG / OUTCOME TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodConfig {
    /// Neighbors returned per player
    pub k: usize,
    /// Minimum candidate pool before fallback triggers
    pub min_pool: usize,
    /// Maximum age-bin widening steps before degrading
    pub max_age_widen: u32,
    pub age_binning: AgeBinning,
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        NeighborhoodConfig {
            k: 10,
            min_pool: 5,
            max_age_widen: 3,
            age_binning: AgeBinning::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackLevel {
    /// Nominal hard stratum satisfied the minimum
    Nominal,
    /// Age bin widened by this many steps
    AgeWidened(u32),
    /// Age dropped as a hard constraint; role and level only
    DegradedRoleLevelOnly,
    /// Even the degraded pool was empty
    NoNeighbors,
}

impl FallbackLevel {
    pub fn label(&self) -> String {
        match self {
            FallbackLevel::Nominal => "nominal".to_string(),
            FallbackLevel::AgeWidened(steps) => format!("age_widened({})", steps),
            FallbackLevel::DegradedRoleLevelOnly => "degraded_role_level_only".to_string(),
            FallbackLevel::NoNeighbors => "no_neighbors".to_string(),
        }
    }
}

/// The stratum actually used, which may be wider than the nominal one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StratumUsed {
    pub role: Role,
    pub assigned_level: Level,
    /// Center age bin; None once age was dropped as a hard constraint
    pub age_bin: Option<i32>,
    /// Widening steps applied around the center bin
    pub age_widen_steps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neighbor {
    pub player_id: PlayerId,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityNeighborhood {
    pub player_id: PlayerId,
    pub report_year: i32,
    pub neighbors: Vec<Neighbor>,
    pub stratum: StratumUsed,
    pub fallback: FallbackLevel,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct SimilarityNeighborhoodEngine<'a> {
    tables: &'a CanonicalTables,
    vectors: &'a FeatureVectors,
    metric: &'a dyn DistanceMetric,
    pub config: NeighborhoodConfig,
}

impl<'a> SimilarityNeighborhoodEngine<'a> {
    pub fn new(
        tables: &'a CanonicalTables,
        vectors: &'a FeatureVectors,
        metric: &'a dyn DistanceMetric,
        config: NeighborhoodConfig,
    ) -> Self {
        SimilarityNeighborhoodEngine {
            tables,
            vectors,
            metric,
            config,
        }
    }

    /// Neighborhood for one (player, N). Deterministic given the
    /// stratum definition, metric, and fallback policy in effect.
    pub fn neighbors(&self, player: PlayerId, report_year: i32) -> Result<SimilarityNeighborhood> {
        let season = match self.tables.season(player, report_year) {
            Some(s) => s,
            None => bail!("no snapshot for player {} in {}", player, report_year),
        };
        Ok(self.neighbors_for_season(season, &self.tables.snapshot_population(report_year)))
    }

    /// Neighborhoods for the whole snapshot population of one report
    /// year, ascending by player id, plus fallback-level counts for the
    /// run report. This batch path shares the population scan across
    /// players; results are pure values, so recomputing is always safe.
    pub fn neighbors_for_year(
        &self,
        report_year: i32,
    ) -> (Vec<SimilarityNeighborhood>, BTreeMap<String, usize>) {
        let population = self.tables.snapshot_population(report_year);
        let mut neighborhoods = Vec::with_capacity(population.len());
        let mut tally: BTreeMap<String, usize> = BTreeMap::new();

        for season in &population {
            let neighborhood = self.neighbors_for_season(season, &population);
            *tally.entry(neighborhood.fallback.label()).or_insert(0) += 1;
            neighborhoods.push(neighborhood);
        }

        (neighborhoods, tally)
    }

    fn neighbors_for_season(
        &self,
        season: &PlayerSeason,
        population: &[&PlayerSeason],
    ) -> SimilarityNeighborhood {
        let report_year = season.report_year;
        let own_bin = season.age.map(|age| self.config.age_binning.bin(age));
        let own_vector = self.vectors.get(&(season.player_id, report_year));

        // Candidates must share role and level, be a different player,
        // and be rankable (a vector exists for them).
        let base_pool: Vec<&PlayerSeason> = population
            .iter()
            .copied()
            .filter(|c| {
                c.player_id != season.player_id
                    && c.role == season.role
                    && c.assigned_level == season.assigned_level
                    && self.vectors.contains_key(&(c.player_id, report_year))
            })
            .collect();

        // Age-constrained search, widening one step at a time.
        // Skipped entirely when the player has no usable age or vector.
        if let (Some(center), Some(vector)) = (own_bin, own_vector) {
            for widen in 0..=self.config.max_age_widen {
                let pool: Vec<&PlayerSeason> = base_pool
                    .iter()
                    .copied()
                    .filter(|c| match c.age {
                        Some(age) => {
                            (self.config.age_binning.bin(age) - center).unsigned_abs() <= widen
                        }
                        None => false,
                    })
                    .collect();

                if pool.len() >= self.config.min_pool {
                    let fallback = if widen == 0 {
                        FallbackLevel::Nominal
                    } else {
                        FallbackLevel::AgeWidened(widen)
                    };
                    return SimilarityNeighborhood {
                        player_id: season.player_id,
                        report_year,
                        neighbors: self.rank(vector, &pool, report_year),
                        stratum: StratumUsed {
                            role: season.role,
                            assigned_level: season.assigned_level,
                            age_bin: Some(center),
                            age_widen_steps: widen,
                        },
                        fallback,
                    };
                }
            }
        }

        // Degraded: age removed as a hard constraint, role and level
        // kept. Age still influences ranking through the soft distance.
        if let Some(vector) = own_vector {
            if !base_pool.is_empty() {
                return SimilarityNeighborhood {
                    player_id: season.player_id,
                    report_year,
                    neighbors: self.rank(vector, &base_pool, report_year),
                    stratum: StratumUsed {
                        role: season.role,
                        assigned_level: season.assigned_level,
                        age_bin: None,
                        age_widen_steps: 0,
                    },
                    fallback: FallbackLevel::DegradedRoleLevelOnly,
                };
            }
        }

        // Truly unique stratum (or unrankable player): flagged, not failed
        SimilarityNeighborhood {
            player_id: season.player_id,
            report_year,
            neighbors: Vec::new(),
            stratum: StratumUsed {
                role: season.role,
                assigned_level: season.assigned_level,
                age_bin: own_bin,
                age_widen_steps: 0,
            },
            fallback: FallbackLevel::NoNeighbors,
        }
    }

    /// Rank a pool by ascending distance; ties break by ascending
    /// canonical id for determinism. Returns the top-k.
    fn rank(&self, own_vector: &[f64], pool: &[&PlayerSeason], report_year: i32) -> Vec<Neighbor> {
        let mut ranked: Vec<Neighbor> = pool
            .iter()
            .filter_map(|c| {
                self.vectors
                    .get(&(c.player_id, report_year))
                    .map(|v| Neighbor {
                        player_id: c.player_id,
                        distance: self.metric.distance(own_vector, v),
                    })
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.player_id.cmp(&b.player_id))
        });
        ranked.truncate(self.config.k);
        ranked
    }
}

// ============================================================================
// TESTS
// ============================================================================
