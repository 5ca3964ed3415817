// Canonical table store boundary
// Row structs for the versioned input tables plus CSV loaders.
// Structural problems (missing columns, unreadable file) are fatal;
// everything row-level is a recorded ValidationIssue and the row is
// excluded or degraded, never the run.

use crate::domain::{FutureValue, Handedness, Level, Position, Role};
use crate::validation::{TableManifest, ValidationIssue, ValidationReason};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;
use std::path::Path;

// ============================================================================
// PLAYER ID
// ============================================================================

/// Canonical cross-source player id (MLBAM). Ordering is numeric, which
/// is what every deterministic tie-break in the pipeline sorts by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PlayerId {
    pub fn parse(s: &str) -> Option<PlayerId> {
        s.trim().parse().ok().map(PlayerId)
    }
}

// ============================================================================
// REPORT YEAR RANGE
// ============================================================================

/// Configured closed interval for valid report years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportYearRange {
    pub min: i32,
    pub max: i32,
}

impl ReportYearRange {
    pub fn new(min: i32, max: i32) -> Result<ReportYearRange> {
        if min > max {
            bail!("report year range inverted: {}..={}", min, max);
        }
        Ok(ReportYearRange { min, max })
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }
}

// ============================================================================
// ROW TYPES
// ============================================================================

/// One row of `mlbam_people_spine`: the canonical reference population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpineRow {
    pub mlbam_id: PlayerId,
    pub name_first: String,
    pub name_last: String,
    pub birth_date: Option<NaiveDate>,
    pub bats: Option<Handedness>,
    pub throws: Option<Handedness>,
    pub height_in: Option<f64>,
    pub weight_lb: Option<f64>,
    pub primary_position: Option<Position>,
    /// Organizations this id has been observed with, pipe-joined on disk
    pub org_abbrevs_seen: Vec<String>,
    /// Seasons this id has been observed in, pipe-joined on disk
    pub seasons_seen: Vec<i32>,
}

/// One source-specific identity awaiting resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceIdentity {
    /// Native source key, or a stable synthetic `no_fgid_*` fallback
    pub identity_key: String,
    pub fgid: String,
    pub player_name: String,
    pub birth_date: Option<NaiveDate>,
}

/// One row of `player_season`: snapshot per (player, report year).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeason {
    pub player_id: PlayerId,
    pub report_year: i32,
    pub role: Role,
    pub position: Position,
    /// Level designation as of the end of season N-1. Consumed as given;
    /// the pipeline never recomputes it.
    pub assigned_level: Level,
    pub fv: Option<FutureValue>,
    pub birth_date: Option<NaiveDate>,
    /// Age at the report snapshot, as published
    pub age: Option<f64>,
    pub height_in: Option<f64>,
    pub weight_lb: Option<f64>,
    pub bats: Option<Handedness>,
    pub throws: Option<Handedness>,
    pub signing_year: Option<i32>,
    pub signing_bonus: Option<f64>,
    pub eta_year: Option<i32>,
    /// Ordinal scouting grades (20-80 scale), keyed by tool name.
    /// BTreeMap so serialized output is byte-stable.
    pub tool_grades: BTreeMap<String, f64>,
    /// Free-text scouting narrative
    pub report_text: String,
}

/// One row of `player_season_stats`. Split rows across levels are kept
/// split; they are never combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeasonStats {
    pub player_id: PlayerId,
    pub season_year: i32,
    pub level_played: Level,
    pub org: String,
    pub stat_values: BTreeMap<String, f64>,
}

// ============================================================================
// LOAD RESULT
// ============================================================================

/// Outcome of loading one table: kept rows plus the full issue trail.
#[derive(Debug, Clone)]
pub struct TableLoad<T> {
    pub rows: Vec<T>,
    pub issues: Vec<ValidationIssue>,
    pub manifest: TableManifest,
}

impl<T> TableLoad<T> {
    fn new(table: &str) -> Self {
        TableLoad {
            rows: Vec::new(),
            issues: Vec::new(),
            manifest: TableManifest::new(table),
        }
    }

    fn exclude(&mut self, issue: ValidationIssue) {
        self.manifest.record(&issue);
        self.manifest.excluded_rows += 1;
        self.issues.push(issue);
    }

    fn warn(&mut self, issue: ValidationIssue) {
        self.manifest.record(&issue);
        self.issues.push(issue);
    }

    fn finish(&mut self) {
        self.manifest.input_rows = self.manifest.kept_rows + self.manifest.excluded_rows;
    }
}

// ============================================================================
// HEADER / CELL HELPERS
// ============================================================================

pub(crate) fn check_required_columns(
    table: &str,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<()> {
    let present: BTreeSet<&str> = headers.iter().map(|h| h.trim()).collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    if !missing.is_empty() {
        bail!("{}: missing required columns: {:?}", table, missing);
    }
    Ok(())
}

fn cell<'a>(record: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    record.get(key).map(|s| s.as_str()).unwrap_or("")
}

fn record_map(headers: &csv::StringRecord, record: &csv::StringRecord) -> BTreeMap<String, String> {
    headers
        .iter()
        .zip(record.iter())
        .map(|(h, v)| (h.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn parse_date_cell(s: &str) -> std::result::Result<Option<NaiveDate>, ()> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    // Tolerate a trailing time component on an otherwise ISO date
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ())
}

fn parse_f64_cell(s: &str) -> std::result::Result<Option<f64>, ()> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse().map(Some).map_err(|_| ())
}

fn parse_i32_cell(s: &str) -> std::result::Result<Option<i32>, ()> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse().map(Some).map_err(|_| ())
}

fn split_pipe(s: &str) -> Vec<String> {
    s.split('|')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

// Tool-grade columns carried as the ordinal scouting trait map.
const TOOL_COLUMNS: [&str; 11] = [
    "hit",
    "game_power",
    "raw_power",
    "speed",
    "field",
    "throw",
    "fastball",
    "slider",
    "curveball",
    "changeup",
    "command",
];

// ============================================================================
// MLBAM PEOPLE SPINE
// ============================================================================

pub const SPINE_TABLE: &str = "mlbam_people_spine";
const SPINE_REQUIRED: [&str; 3] = ["mlbam_id", "name_first", "name_last"];

pub fn load_spine<R: Read>(reader: R) -> Result<TableLoad<SpineRow>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("reading spine header")?.clone();
    check_required_columns(SPINE_TABLE, &headers, &SPINE_REQUIRED)?;

    let mut load = TableLoad::new(SPINE_TABLE);

    for (i, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: record {}", SPINE_TABLE, i + 1))?;
        let row = record_map(&headers, &record);
        let row_ref = format!("line={}", i + 2);

        let mlbam_id = match PlayerId::parse(cell(&row, "mlbam_id")) {
            Some(id) => id,
            None => {
                load.exclude(ValidationIssue::critical(
                    SPINE_TABLE,
                    row_ref,
                    "mlbam_id",
                    ValidationReason::MissingRequired,
                    format!("unusable mlbam_id {:?}", cell(&row, "mlbam_id")),
                ));
                continue;
            }
        };

        let birth_date = match parse_date_cell(cell(&row, "birth_date")) {
            Ok(d) => d,
            Err(()) => {
                load.warn(ValidationIssue::warning(
                    SPINE_TABLE,
                    row_ref.clone(),
                    "birth_date",
                    ValidationReason::BadDate,
                    format!("unparseable birth_date {:?}", cell(&row, "birth_date")),
                ));
                None
            }
        };

        load.rows.push(SpineRow {
            mlbam_id,
            name_first: cell(&row, "name_first").to_string(),
            name_last: cell(&row, "name_last").to_string(),
            birth_date,
            bats: Handedness::parse(cell(&row, "bats")),
            throws: Handedness::parse(cell(&row, "throws")),
            height_in: parse_f64_cell(cell(&row, "height_in")).unwrap_or(None),
            weight_lb: parse_f64_cell(cell(&row, "weight_lb")).unwrap_or(None),
            primary_position: Position::parse(cell(&row, "primary_position")),
            org_abbrevs_seen: split_pipe(cell(&row, "org_abbrevs_seen")),
            seasons_seen: split_pipe(cell(&row, "seasons_seen"))
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
        });
        load.manifest.kept_rows += 1;
    }

    load.finish();
    Ok(load)
}

pub fn load_spine_file(path: &Path) -> Result<TableLoad<SpineRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening spine table {}", path.display()))?;
    load_spine(file)
}

// ============================================================================
// SOURCE IDENTITIES
// ============================================================================

pub const IDENTITIES_TABLE: &str = "source_identities";
const IDENTITIES_REQUIRED: [&str; 2] = ["identity_key", "player_name"];

pub fn load_identities<R: Read>(reader: R) -> Result<TableLoad<SourceIdentity>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("reading identities header")?
        .clone();
    check_required_columns(IDENTITIES_TABLE, &headers, &IDENTITIES_REQUIRED)?;

    let mut load = TableLoad::new(IDENTITIES_TABLE);
    let mut seen_keys: BTreeSet<String> = BTreeSet::new();

    for (i, record) in csv_reader.records().enumerate() {
        let record =
            record.with_context(|| format!("{}: record {}", IDENTITIES_TABLE, i + 1))?;
        let row = record_map(&headers, &record);
        let row_ref = format!("line={}", i + 2);

        let player_name = cell(&row, "player_name").to_string();
        let mut identity_key = cell(&row, "identity_key").to_string();
        if identity_key.is_empty() {
            // Id-less rows still need a stable key for tracking
            identity_key =
                crate::names::stable_fallback_key(&player_name, cell(&row, "player_url"));
        }

        if !seen_keys.insert(identity_key.clone()) {
            load.exclude(ValidationIssue::critical(
                IDENTITIES_TABLE,
                row_ref,
                "identity_key",
                ValidationReason::DuplicatePrimaryKey,
                format!("identity_key {} already seen", identity_key),
            ));
            continue;
        }

        let birth_date = match parse_date_cell(cell(&row, "birth_date")) {
            Ok(d) => d,
            Err(()) => {
                load.warn(ValidationIssue::warning(
                    IDENTITIES_TABLE,
                    row_ref.clone(),
                    "birth_date",
                    ValidationReason::BadDate,
                    format!("unparseable birth_date {:?}", cell(&row, "birth_date")),
                ));
                None
            }
        };

        load.rows.push(SourceIdentity {
            identity_key,
            fgid: cell(&row, "fgid").to_string(),
            player_name,
            birth_date,
        });
        load.manifest.kept_rows += 1;
    }

    load.finish();
    Ok(load)
}

pub fn load_identities_file(path: &Path) -> Result<TableLoad<SourceIdentity>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening identities table {}", path.display()))?;
    load_identities(file)
}

// ============================================================================
// PLAYER SEASON
// ============================================================================

pub const PLAYER_SEASON_TABLE: &str = "player_season";
const PLAYER_SEASON_REQUIRED: [&str; 5] =
    ["mlbam_id", "report_year", "role", "position", "assigned_level"];

pub fn load_player_seasons<R: Read>(
    reader: R,
    years: &ReportYearRange,
) -> Result<TableLoad<PlayerSeason>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("reading player_season header")?
        .clone();
    check_required_columns(PLAYER_SEASON_TABLE, &headers, &PLAYER_SEASON_REQUIRED)?;

    let mut load = TableLoad::new(PLAYER_SEASON_TABLE);
    let mut seen_pk: BTreeSet<(PlayerId, i32)> = BTreeSet::new();

    for (i, record) in csv_reader.records().enumerate() {
        let record =
            record.with_context(|| format!("{}: record {}", PLAYER_SEASON_TABLE, i + 1))?;
        let row = record_map(&headers, &record);
        let line_ref = format!("line={}", i + 2);

        let player_id = match PlayerId::parse(cell(&row, "mlbam_id")) {
            Some(id) => id,
            None => {
                load.exclude(ValidationIssue::critical(
                    PLAYER_SEASON_TABLE,
                    line_ref,
                    "mlbam_id",
                    ValidationReason::MissingRequired,
                    format!("unusable mlbam_id {:?}", cell(&row, "mlbam_id")),
                ));
                continue;
            }
        };
        let report_year = match parse_i32_cell(cell(&row, "report_year")) {
            Ok(Some(y)) => y,
            _ => {
                load.exclude(ValidationIssue::critical(
                    PLAYER_SEASON_TABLE,
                    line_ref,
                    "report_year",
                    ValidationReason::BadNumeric,
                    format!("unusable report_year {:?}", cell(&row, "report_year")),
                ));
                continue;
            }
        };
        let row_ref = format!("mlbam_id={} report_year={}", player_id, report_year);

        if !years.contains(report_year) {
            load.exclude(ValidationIssue::critical(
                PLAYER_SEASON_TABLE,
                row_ref,
                "report_year",
                ValidationReason::ReportYearOutOfRange,
                format!(
                    "report_year {} outside {}..={}",
                    report_year, years.min, years.max
                ),
            ));
            continue;
        }

        // PK uniqueness: first occurrence wins, later collisions excluded
        if !seen_pk.insert((player_id, report_year)) {
            load.exclude(ValidationIssue::critical(
                PLAYER_SEASON_TABLE,
                row_ref,
                "mlbam_id,report_year",
                ValidationReason::DuplicatePrimaryKey,
                "duplicate (mlbam_id, report_year)".to_string(),
            ));
            continue;
        }

        let role = match Role::parse(cell(&row, "role")) {
            Some(r) => r,
            None => {
                load.exclude(ValidationIssue::critical(
                    PLAYER_SEASON_TABLE,
                    row_ref,
                    "role",
                    ValidationReason::UnknownCategorical,
                    format!("unknown role {:?}", cell(&row, "role")),
                ));
                continue;
            }
        };
        let position = match Position::parse(cell(&row, "position")) {
            Some(p) => p,
            None => {
                load.exclude(ValidationIssue::critical(
                    PLAYER_SEASON_TABLE,
                    row_ref,
                    "position",
                    ValidationReason::UnknownCategorical,
                    format!("unknown position {:?}", cell(&row, "position")),
                ));
                continue;
            }
        };
        let assigned_level = match Level::parse(cell(&row, "assigned_level")) {
            Some(l) => l,
            None => {
                load.exclude(ValidationIssue::critical(
                    PLAYER_SEASON_TABLE,
                    row_ref,
                    "assigned_level",
                    ValidationReason::UnknownCategorical,
                    format!("unknown assigned_level {:?}", cell(&row, "assigned_level")),
                ));
                continue;
            }
        };

        // FV is nullable, but a present off-grid value excludes the row
        let fv_raw = cell(&row, "fv");
        let fv = if fv_raw.is_empty() {
            None
        } else {
            match FutureValue::parse(fv_raw) {
                Some(fv) => Some(fv),
                None => {
                    load.exclude(ValidationIssue::critical(
                        PLAYER_SEASON_TABLE,
                        row_ref,
                        "fv",
                        ValidationReason::LabelOffGrid,
                        format!("fv {:?} not on the fixed grid", fv_raw),
                    ));
                    continue;
                }
            }
        };

        let birth_date = match parse_date_cell(cell(&row, "birth_date")) {
            Ok(d) => d,
            Err(()) => {
                load.warn(ValidationIssue::warning(
                    PLAYER_SEASON_TABLE,
                    row_ref.clone(),
                    "birth_date",
                    ValidationReason::BadDate,
                    format!("unparseable birth_date {:?}", cell(&row, "birth_date")),
                ));
                None
            }
        };

        let mut tool_grades = BTreeMap::new();
        for tool in TOOL_COLUMNS {
            if let Ok(Some(grade)) = parse_f64_cell(cell(&row, tool)) {
                tool_grades.insert(tool.to_string(), grade);
            }
        }

        load.rows.push(PlayerSeason {
            player_id,
            report_year,
            role,
            position,
            assigned_level,
            fv,
            birth_date,
            age: parse_f64_cell(cell(&row, "age")).unwrap_or(None),
            height_in: parse_f64_cell(cell(&row, "height_in")).unwrap_or(None),
            weight_lb: parse_f64_cell(cell(&row, "weight_lb")).unwrap_or(None),
            bats: Handedness::parse(cell(&row, "bats")),
            throws: Handedness::parse(cell(&row, "throws")),
            signing_year: parse_i32_cell(cell(&row, "signing_year")).unwrap_or(None),
            signing_bonus: parse_f64_cell(cell(&row, "signing_bonus")).unwrap_or(None),
            eta_year: parse_i32_cell(cell(&row, "eta_year")).unwrap_or(None),
            tool_grades,
            report_text: cell(&row, "report_text").to_string(),
        });
        load.manifest.kept_rows += 1;
    }

    load.finish();
    Ok(load)
}

pub fn load_player_seasons_file(
    path: &Path,
    years: &ReportYearRange,
) -> Result<TableLoad<PlayerSeason>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening player_season table {}", path.display()))?;
    load_player_seasons(file, years)
}

// ============================================================================
// PLAYER SEASON STATS
// ============================================================================

pub const STATS_TABLE: &str = "player_season_stats";
const STATS_REQUIRED: [&str; 4] = ["mlbam_id", "season_year", "level_played", "org"];

pub fn load_stats<R: Read>(reader: R) -> Result<TableLoad<PlayerSeasonStats>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("reading stats header")?.clone();
    check_required_columns(STATS_TABLE, &headers, &STATS_REQUIRED)?;

    let mut load = TableLoad::new(STATS_TABLE);
    let mut seen_pk: BTreeSet<(PlayerId, i32, Level, String)> = BTreeSet::new();

    for (i, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: record {}", STATS_TABLE, i + 1))?;
        let row = record_map(&headers, &record);
        let line_ref = format!("line={}", i + 2);

        let player_id = match PlayerId::parse(cell(&row, "mlbam_id")) {
            Some(id) => id,
            None => {
                load.exclude(ValidationIssue::critical(
                    STATS_TABLE,
                    line_ref,
                    "mlbam_id",
                    ValidationReason::MissingRequired,
                    format!("unusable mlbam_id {:?}", cell(&row, "mlbam_id")),
                ));
                continue;
            }
        };
        let season_year = match parse_i32_cell(cell(&row, "season_year")) {
            Ok(Some(y)) => y,
            _ => {
                load.exclude(ValidationIssue::critical(
                    STATS_TABLE,
                    line_ref,
                    "season_year",
                    ValidationReason::BadNumeric,
                    format!("unusable season_year {:?}", cell(&row, "season_year")),
                ));
                continue;
            }
        };
        let level_played = match Level::parse(cell(&row, "level_played")) {
            Some(l) => l,
            None => {
                load.exclude(ValidationIssue::critical(
                    STATS_TABLE,
                    line_ref,
                    "level_played",
                    ValidationReason::UnknownCategorical,
                    format!("unknown level_played {:?}", cell(&row, "level_played")),
                ));
                continue;
            }
        };
        let org = cell(&row, "org").to_string();
        let row_ref = format!(
            "mlbam_id={} season_year={} level={} org={}",
            player_id,
            season_year,
            level_played.as_str(),
            org
        );

        if !seen_pk.insert((player_id, season_year, level_played, org.clone())) {
            load.exclude(ValidationIssue::critical(
                STATS_TABLE,
                row_ref,
                "mlbam_id,season_year,level_played,org",
                ValidationReason::DuplicatePrimaryKey,
                "duplicate stats primary key".to_string(),
            ));
            continue;
        }

        // Everything outside the key columns that parses as a number
        // is carried as a stat value.
        let mut stat_values = BTreeMap::new();
        for (name, value) in &row {
            if STATS_REQUIRED.contains(&name.as_str()) {
                continue;
            }
            if let Ok(Some(v)) = parse_f64_cell(value) {
                stat_values.insert(name.clone(), v);
            }
        }

        load.rows.push(PlayerSeasonStats {
            player_id,
            season_year,
            level_played,
            org,
            stat_values,
        });
        load.manifest.kept_rows += 1;
    }

    load.finish();
    Ok(load)
}

pub fn load_stats_file(path: &Path) -> Result<TableLoad<PlayerSeasonStats>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening stats table {}", path.display()))?;
    load_stats(file)
}

// ============================================================================
// CANONICAL TABLES (indexed, resolved view)
// ============================================================================

/// Indexed, immutable view over the resolved canonical tables for one
/// run. Derived entities downstream are pure functions of this plus
/// explicit parameters.
#[derive(Debug, Clone)]
pub struct CanonicalTables {
    pub seasons: BTreeMap<(PlayerId, i32), PlayerSeason>,
    pub stats_by_player: BTreeMap<PlayerId, Vec<PlayerSeasonStats>>,
    pub years: ReportYearRange,
}

impl CanonicalTables {
    pub fn new(
        seasons: Vec<PlayerSeason>,
        stats: Vec<PlayerSeasonStats>,
        years: ReportYearRange,
    ) -> CanonicalTables {
        let mut season_index = BTreeMap::new();
        for season in seasons {
            season_index.insert((season.player_id, season.report_year), season);
        }
        let mut stats_by_player: BTreeMap<PlayerId, Vec<PlayerSeasonStats>> = BTreeMap::new();
        for stat in stats {
            stats_by_player.entry(stat.player_id).or_default().push(stat);
        }
        // Stable order inside each player's history
        for history in stats_by_player.values_mut() {
            history.sort_by(|a, b| {
                (a.season_year, a.level_played, &a.org)
                    .cmp(&(b.season_year, b.level_played, &b.org))
            });
        }
        CanonicalTables {
            seasons: season_index,
            stats_by_player,
            years,
        }
    }

    pub fn season(&self, player: PlayerId, report_year: i32) -> Option<&PlayerSeason> {
        self.seasons.get(&(player, report_year))
    }

    /// All snapshot rows for one report year, ascending by player id.
    pub fn snapshot_population(&self, report_year: i32) -> Vec<&PlayerSeason> {
        self.seasons
            .values()
            .filter(|s| s.report_year == report_year)
            .collect()
    }

    pub fn stats_for(&self, player: PlayerId) -> &[PlayerSeasonStats] {
        self.stats_by_player
            .get(&player)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SPINE_CSV: &str = "\
mlbam_id,name_first,name_last,birth_date,bats,throws,height_in,weight_lb,primary_position,org_abbrevs_seen,seasons_seen
660271,Shohei,Ohtani,1994-07-05,L,R,76,210,DH,LAA|LAD,2021|2022
665742,Juan,Soto,1998-10-25,L,L,74,224,RF,WSH|SD|NYY,2021|2022
,Missing,Id,2000-01-01,R,R,,,SS,,
";

    #[test]
    fn test_load_spine_keeps_good_rows() {
        let load = load_spine(SPINE_CSV.as_bytes()).unwrap();

        assert_eq!(load.rows.len(), 2);
        assert_eq!(load.manifest.kept_rows, 2);
        assert_eq!(load.manifest.excluded_rows, 1);
        assert_eq!(load.rows[0].mlbam_id, PlayerId(660271));
        assert_eq!(load.rows[0].org_abbrevs_seen, vec!["LAA", "LAD"]);
        assert_eq!(load.rows[1].seasons_seen, vec![2021, 2022]);
    }

    #[test]
    fn test_load_spine_missing_column_is_fatal() {
        let csv = "mlbam_id,name_first\n1,Solo\n";
        let err = load_spine(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("name_last"));
    }

    const SEASON_CSV: &str = "\
mlbam_id,report_year,role,position,assigned_level,fv,birth_date,age,hit,game_power,report_text
1,2022,hitter,SS,AA,45,2001-05-01,21.3,50,45,plus glove
1,2023,hitter,SS,AAA,50,2001-05-01,22.3,55,50,improved bat
2,2022,pitcher,SP,A+,44,2002-01-01,20.1,,,off-grid fv
1,2022,hitter,SS,AA,45,2001-05-01,21.3,50,45,dup pk
3,1990,hitter,C,A,40,1971-01-01,19.0,,,out of range
4,2022,hitter,QB,AA,40,2002-06-01,20.0,,,bad position
";

    #[test]
    fn test_load_player_seasons_validation() {
        let years = ReportYearRange::new(2020, 2025).unwrap();
        let load = load_player_seasons(SEASON_CSV.as_bytes(), &years).unwrap();

        assert_eq!(load.rows.len(), 2);
        assert_eq!(load.manifest.excluded_rows, 4);

        let reasons = &load.manifest.issues_by_reason;
        assert_eq!(reasons.get("label_off_grid"), Some(&1));
        assert_eq!(reasons.get("duplicate_primary_key"), Some(&1));
        assert_eq!(reasons.get("report_year_out_of_range"), Some(&1));
        assert_eq!(reasons.get("unknown_categorical"), Some(&1));

        // First occurrence of the PK wins
        let kept = &load.rows[0];
        assert_eq!(kept.report_text, "plus glove");
        assert_eq!(kept.tool_grades.get("hit"), Some(&50.0));
    }

    #[test]
    fn test_load_player_seasons_fv_nullable() {
        let csv = "\
mlbam_id,report_year,role,position,assigned_level,fv
9,2022,hitter,CF,A,
";
        let years = ReportYearRange::new(2020, 2025).unwrap();
        let load = load_player_seasons(csv.as_bytes(), &years).unwrap();
        assert_eq!(load.rows.len(), 1);
        assert_eq!(load.rows[0].fv, None);
    }

    const STATS_CSV: &str = "\
mlbam_id,season_year,level_played,org,pa,avg,obp,slg,wrc_plus
1,2021,A+,BAL,450,0.290,0.380,0.460,131
1,2021,AA,BAL,120,0.250,0.330,0.410,105
1,2021,AA,BAL,120,0.250,0.330,0.410,105
";

    #[test]
    fn test_load_stats_split_levels_kept_dup_pk_dropped() {
        let load = load_stats(STATS_CSV.as_bytes()).unwrap();

        // Two levels for the same season stay split; exact duplicate excluded
        assert_eq!(load.rows.len(), 2);
        assert_eq!(load.manifest.excluded_rows, 1);
        assert_eq!(
            load.manifest.issues_by_reason.get("duplicate_primary_key"),
            Some(&1)
        );
        assert_eq!(load.rows[0].stat_values.get("wrc_plus"), Some(&131.0));
    }

    #[test]
    fn test_canonical_tables_indexing() {
        let years = ReportYearRange::new(2020, 2025).unwrap();
        let seasons = load_player_seasons(SEASON_CSV.as_bytes(), &years).unwrap().rows;
        let stats = load_stats(STATS_CSV.as_bytes()).unwrap().rows;
        let tables = CanonicalTables::new(seasons, stats, years);

        assert!(tables.season(PlayerId(1), 2022).is_some());
        assert!(tables.season(PlayerId(1), 2024).is_none());
        assert_eq!(tables.snapshot_population(2022).len(), 1);
        assert_eq!(tables.stats_for(PlayerId(1)).len(), 2);
        assert_eq!(tables.stats_for(PlayerId(99)).len(), 0);
    }
}
