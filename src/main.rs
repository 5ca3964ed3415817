use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use prospect_pipeline::{
    load_feature_vectors_file, load_identities_file, load_player_seasons_file, load_spine_file,
    load_stats_file, write_identity_map_file, write_manifest_file, CanonicalTables,
    EuclideanDistance, IdentityResolver, NeighborhoodConfig, ReportYearRange, RunReport,
    SimilarityNeighborhoodEngine, TemporalExampleBuilder,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "usage: {} <data_dir> <min_report_year> <max_report_year> [out_dir]",
            args[0]
        );
        std::process::exit(2);
    }

    let data_dir = PathBuf::from(&args[1]);
    let min_year: i32 = args[2].parse().context("parsing min_report_year")?;
    let max_year: i32 = args[3].parse().context("parsing max_report_year")?;
    let out_dir = args
        .get(4)
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.clone());

    run_pipeline(&data_dir, min_year, max_year, &out_dir)
}

fn run_pipeline(data_dir: &Path, min_year: i32, max_year: i32, out_dir: &Path) -> Result<()> {
    let years = ReportYearRange::new(min_year, max_year)?;
    let mut report = RunReport::new();

    // 1. Load canonical tables
    println!("Loading canonical tables from {}", data_dir.display());
    let spine = load_spine_file(&data_dir.join("mlbam_people_spine.csv"))?;
    println!("  {}", spine.manifest.summary());
    let identities = load_identities_file(&data_dir.join("player_identities.csv"))?;
    println!("  {}", identities.manifest.summary());
    let seasons = load_player_seasons_file(&data_dir.join("player_season.csv"), &years)?;
    println!("  {}", seasons.manifest.summary());
    let stats = load_stats_file(&data_dir.join("player_season_stats.csv"))?;
    println!("  {}", stats.manifest.summary());

    report.record_table(spine.manifest.clone());
    report.record_table(identities.manifest.clone());
    report.record_table(seasons.manifest.clone());
    report.record_table(stats.manifest.clone());

    // 2. Resolve identities and write the crosswalk artifact
    println!("Resolving {} source identities", identities.rows.len());
    let resolver = IdentityResolver::from_spine(&spine.rows);
    let (mappings, tally) = resolver.resolve_all(&identities.rows);
    report.record_identity_outcomes(tally);

    let map_path = out_dir.join("identity_map_fgid_to_mlbam.csv");
    write_identity_map_file(&map_path, &mappings)?;
    println!("  wrote {}", map_path.display());

    // 3. Build supervised examples per report year
    let tables = CanonicalTables::new(seasons.rows, stats.rows, years);
    let builder = TemporalExampleBuilder::new(&tables);
    for year in min_year..=max_year {
        let output = builder.build(year)?;
        println!(
            "Examples {}: {} eligible, {} excluded",
            year,
            output.eligible_count(),
            output.excluded_count()
        );
        report.record_build(year, &output);
    }

    // 4. Similarity neighborhoods, when vectors were supplied
    let vectors_path = data_dir.join("feature_vectors.csv");
    if vectors_path.exists() {
        let vector_load = load_feature_vectors_file(&vectors_path)?;
        println!("  {}", vector_load.manifest.summary());
        report.record_table(vector_load.manifest.clone());
        let engine = SimilarityNeighborhoodEngine::new(
            &tables,
            &vector_load.vectors,
            &EuclideanDistance,
            NeighborhoodConfig::default(),
        );
        for year in min_year..=max_year {
            let (_, tally) = engine.neighbors_for_year(year);
            report.record_neighborhoods(year, tally);
        }
    } else {
        println!("No feature_vectors.csv; skipping neighborhoods");
    }

    // 5. Reconciliation report: every run accounts for every row
    let manifest_path = out_dir.join("run_manifest.csv");
    write_manifest_file(&manifest_path, &report)?;
    println!("\n{}", report.summary());
    println!("\nwrote {}", manifest_path.display());

    if report.matched_identities() == 0 && !mappings.is_empty() {
        bail!("no identities resolved; spine and identities tables likely disagree");
    }
    Ok(())
}
