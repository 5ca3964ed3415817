// Prospect Pipeline - Core Library
// Leakage-safe training examples and evaluation neighborhoods from
// multi-modal player-season records.

pub mod domain;
pub mod identity;
pub mod names;
pub mod neighbors;
pub mod reconciliation;
pub mod store;
pub mod training;
pub mod validation;

// Re-export commonly used types
pub use domain::{FutureValue, Handedness, Level, Position, Role};
pub use identity::{
    write_identity_map, write_identity_map_file, IdentityMapping, IdentityResolver, MatchOutcome,
    Resolution,
};
pub use neighbors::{
    load_feature_vectors, load_feature_vectors_file, AgeBinning, DistanceMetric,
    EuclideanDistance, FallbackLevel, FeatureVectorLoad, FeatureVectors, Neighbor,
    NeighborhoodConfig,
    SimilarityNeighborhood, SimilarityNeighborhoodEngine, StratumUsed,
};
pub use reconciliation::{write_manifest, write_manifest_file, RunReport};
pub use store::{
    load_identities, load_identities_file, load_player_seasons, load_player_seasons_file,
    load_spine, load_spine_file, load_stats, load_stats_file, CanonicalTables, PlayerId,
    PlayerSeason, PlayerSeasonStats, ReportYearRange, SourceIdentity, SpineRow, TableLoad,
};
pub use training::{
    BuildOutput, ExcludedExample, ExclusionReason, FeatureSnapshot, TemporalExampleBuilder,
    TrainingExample,
};
pub use validation::{Severity, TableManifest, ValidationIssue, ValidationReason};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
