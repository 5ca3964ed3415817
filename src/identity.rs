// Identity resolution: source identities -> canonical MLBAM ids
// Ordered deterministic rules over normalized name/DOB indexes.
// A later rule runs only when the earlier one produced zero candidates;
// multiple candidates at any stage are terminal for that identity.

use crate::names::{norm_text, split_first_last};
use crate::store::{PlayerId, SourceIdentity, SpineRow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

// ============================================================================
// MATCH OUTCOME
// ============================================================================

/// Closed outcome set. Ambiguity and no-candidate are first-class
/// outcomes, never errors; the canonical id rides only on matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    MatchedExactNameDob { mlbam_id: PlayerId },
    MatchedLastnameDob { mlbam_id: PlayerId },
    MatchedNameOnlyUnique { mlbam_id: PlayerId },
    AmbiguousMultipleCandidates,
    UnmatchedNoCandidate,
}

impl MatchOutcome {
    pub fn tag(&self) -> &'static str {
        match self {
            MatchOutcome::MatchedExactNameDob { .. } => "matched_exact_name_dob",
            MatchOutcome::MatchedLastnameDob { .. } => "matched_lastname_dob",
            MatchOutcome::MatchedNameOnlyUnique { .. } => "matched_name_only_unique",
            MatchOutcome::AmbiguousMultipleCandidates => "ambiguous_multiple_candidates",
            MatchOutcome::UnmatchedNoCandidate => "unmatched_no_candidate",
        }
    }

    pub fn resolved_id(&self) -> Option<PlayerId> {
        match self {
            MatchOutcome::MatchedExactNameDob { mlbam_id }
            | MatchOutcome::MatchedLastnameDob { mlbam_id }
            | MatchOutcome::MatchedNameOnlyUnique { mlbam_id } => Some(*mlbam_id),
            _ => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.resolved_id().is_some()
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Full resolution record for one source identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: MatchOutcome,
    /// Rule that decided the outcome (1-3); 0 when no rule ever fired
    /// (unmatched with zero candidates everywhere).
    pub rule_index: u8,
    /// Distinct-candidate count observed at each rule stage.
    /// Unevaluated stages record 0.
    pub rule_candidates: [usize; 3],
    /// Distinct candidate ids at the deciding stage, ascending.
    pub candidate_ids: Vec<PlayerId>,
}

/// One row of the `identity_map_fgid_to_mlbam` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub identity_key: String,
    pub fgid: String,
    pub player_name: String,
    pub mlbam_id: Option<PlayerId>,
    pub match_outcome: String,
    pub rule_index: u8,
    pub rule1_candidates: usize,
    pub rule2_candidates: usize,
    pub rule3_candidates: usize,
    /// Pipe-joined ascending candidate ids at the deciding stage
    pub candidate_mlbam_ids: String,
}

// ============================================================================
// RESOLVER
// ============================================================================

pub struct IdentityResolver {
    idx_first_last_dob: BTreeMap<(String, String, NaiveDate), BTreeSet<PlayerId>>,
    idx_last_dob: BTreeMap<(String, NaiveDate), BTreeSet<PlayerId>>,
    idx_full_name: BTreeMap<String, BTreeSet<PlayerId>>,
}

impl IdentityResolver {
    /// Build the three match indexes over the canonical reference
    /// population. Candidate sets hold DISTINCT ids: several spine rows
    /// for the same id count as one candidate.
    pub fn from_spine(spine: &[SpineRow]) -> IdentityResolver {
        let mut idx_first_last_dob: BTreeMap<(String, String, NaiveDate), BTreeSet<PlayerId>> =
            BTreeMap::new();
        let mut idx_last_dob: BTreeMap<(String, NaiveDate), BTreeSet<PlayerId>> = BTreeMap::new();
        let mut idx_full_name: BTreeMap<String, BTreeSet<PlayerId>> = BTreeMap::new();

        for row in spine {
            let first = norm_text(&row.name_first);
            let last = norm_text(&row.name_last);
            let full = norm_text(&format!("{} {}", row.name_first, row.name_last));

            if let Some(dob) = row.birth_date {
                idx_first_last_dob
                    .entry((first.clone(), last.clone(), dob))
                    .or_default()
                    .insert(row.mlbam_id);
                idx_last_dob
                    .entry((last.clone(), dob))
                    .or_default()
                    .insert(row.mlbam_id);
            }
            if !full.is_empty() {
                idx_full_name.entry(full).or_default().insert(row.mlbam_id);
            }
        }

        IdentityResolver {
            idx_first_last_dob,
            idx_last_dob,
            idx_full_name,
        }
    }

    /// Resolve one source identity through the rule chain.
    /// Deterministic and idempotent: same inputs, same outcome.
    pub fn resolve(&self, identity: &SourceIdentity) -> Resolution {
        let (first, last) = split_first_last(&identity.player_name);
        let full = norm_text(&identity.player_name);
        let mut rule_candidates = [0usize; 3];

        // Rule 1: normalized first + last + full DOB.
        // An identity without a DOB yields zero candidates here and at
        // rule 2 by construction.
        if let Some(dob) = identity.birth_date {
            let candidates = self
                .idx_first_last_dob
                .get(&(first.clone(), last.clone(), dob));
            let ids = candidate_vec(candidates);
            rule_candidates[0] = ids.len();
            match ids.len() {
                0 => {}
                1 => {
                    return Resolution {
                        outcome: MatchOutcome::MatchedExactNameDob { mlbam_id: ids[0] },
                        rule_index: 1,
                        rule_candidates,
                        candidate_ids: ids,
                    }
                }
                _ => {
                    // Terminal: never fall through with multiple candidates
                    return Resolution {
                        outcome: MatchOutcome::AmbiguousMultipleCandidates,
                        rule_index: 1,
                        rule_candidates,
                        candidate_ids: ids,
                    };
                }
            }

            // Rule 2: normalized last name + full DOB
            let candidates = self.idx_last_dob.get(&(last.clone(), dob));
            let ids = candidate_vec(candidates);
            rule_candidates[1] = ids.len();
            match ids.len() {
                0 => {}
                1 => {
                    return Resolution {
                        outcome: MatchOutcome::MatchedLastnameDob { mlbam_id: ids[0] },
                        rule_index: 2,
                        rule_candidates,
                        candidate_ids: ids,
                    }
                }
                _ => {
                    return Resolution {
                        outcome: MatchOutcome::AmbiguousMultipleCandidates,
                        rule_index: 2,
                        rule_candidates,
                        candidate_ids: ids,
                    };
                }
            }
        }

        // Rule 3: full normalized name, no DOB constraint
        let candidates = self.idx_full_name.get(&full);
        let ids = candidate_vec(candidates);
        rule_candidates[2] = ids.len();
        match ids.len() {
            0 => Resolution {
                outcome: MatchOutcome::UnmatchedNoCandidate,
                rule_index: 0,
                rule_candidates,
                candidate_ids: ids,
            },
            1 => Resolution {
                outcome: MatchOutcome::MatchedNameOnlyUnique { mlbam_id: ids[0] },
                rule_index: 3,
                rule_candidates,
                candidate_ids: ids,
            },
            _ => Resolution {
                outcome: MatchOutcome::AmbiguousMultipleCandidates,
                rule_index: 3,
                rule_candidates,
                candidate_ids: ids,
            },
        }
    }

    /// Resolve a batch, preserving input order, and tally outcomes for
    /// the run report.
    pub fn resolve_all(
        &self,
        identities: &[SourceIdentity],
    ) -> (Vec<IdentityMapping>, BTreeMap<String, usize>) {
        let mut mappings = Vec::with_capacity(identities.len());
        let mut tally: BTreeMap<String, usize> = BTreeMap::new();

        for identity in identities {
            let resolution = self.resolve(identity);
            *tally
                .entry(resolution.outcome.tag().to_string())
                .or_insert(0) += 1;

            mappings.push(IdentityMapping {
                identity_key: identity.identity_key.clone(),
                fgid: identity.fgid.clone(),
                player_name: identity.player_name.clone(),
                mlbam_id: resolution.outcome.resolved_id(),
                match_outcome: resolution.outcome.tag().to_string(),
                rule_index: resolution.rule_index,
                rule1_candidates: resolution.rule_candidates[0],
                rule2_candidates: resolution.rule_candidates[1],
                rule3_candidates: resolution.rule_candidates[2],
                candidate_mlbam_ids: resolution
                    .candidate_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join("|"),
            });
        }

        (mappings, tally)
    }
}

fn candidate_vec(set: Option<&BTreeSet<PlayerId>>) -> Vec<PlayerId> {
    set.map(|s| s.iter().copied().collect()).unwrap_or_default()
}

// ============================================================================
// ARTIFACT WRITER
// ============================================================================

/// Write the identity-map artifact. Column order is fixed so reruns
/// over identical inputs produce byte-identical files.
pub fn write_identity_map<W: Write>(writer: W, mappings: &[IdentityMapping]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "identity_key",
        "fgid",
        "player_name",
        "mlbam_id",
        "match_outcome",
        "rule_index",
        "rule1_candidates",
        "rule2_candidates",
        "rule3_candidates",
        "candidate_mlbam_ids",
    ])?;
    for m in mappings {
        let mlbam_id = m.mlbam_id.map(|id| id.to_string()).unwrap_or_default();
        let rule_index = m.rule_index.to_string();
        let rule1 = m.rule1_candidates.to_string();
        let rule2 = m.rule2_candidates.to_string();
        let rule3 = m.rule3_candidates.to_string();
        csv_writer.write_record([
            m.identity_key.as_str(),
            m.fgid.as_str(),
            m.player_name.as_str(),
            mlbam_id.as_str(),
            m.match_outcome.as_str(),
            rule_index.as_str(),
            rule1.as_str(),
            rule2.as_str(),
            rule3.as_str(),
            m.candidate_mlbam_ids.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_identity_map_file(path: &Path, mappings: &[IdentityMapping]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating identity map {}", path.display()))?;
    write_identity_map(file, mappings)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spine_row(id: u32, first: &str, last: &str, dob: Option<&str>) -> SpineRow {
        SpineRow {
            mlbam_id: PlayerId(id),
            name_first: first.to_string(),
            name_last: last.to_string(),
            birth_date: dob.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            bats: None,
            throws: None,
            height_in: None,
            weight_lb: None,
            primary_position: None,
            org_abbrevs_seen: Vec::new(),
            seasons_seen: Vec::new(),
        }
    }

    fn identity(key: &str, name: &str, dob: Option<&str>) -> SourceIdentity {
        SourceIdentity {
            identity_key: key.to_string(),
            fgid: key.to_string(),
            player_name: name.to_string(),
            birth_date: dob.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
        }
    }

    #[test]
    fn test_rule1_exact_name_dob() {
        let spine = vec![
            spine_row(1, "Jackson", "Smith", Some("2001-05-01")),
            spine_row(2, "Jordan", "Smith", Some("1999-01-01")),
        ];
        let resolver = IdentityResolver::from_spine(&spine);

        let res = resolver.resolve(&identity("a", "Jackson Smith", Some("2001-05-01")));
        assert_eq!(
            res.outcome,
            MatchOutcome::MatchedExactNameDob { mlbam_id: PlayerId(1) }
        );
        assert_eq!(res.rule_index, 1);
        assert_eq!(res.rule_candidates, [1, 0, 0]);
    }

    #[test]
    fn test_rule2_lastname_dob_after_rule1_empty() {
        // Source has a nickname first name, so rule 1 finds nothing
        let spine = vec![spine_row(7, "Michael", "Harris", Some("2001-03-07"))];
        let resolver = IdentityResolver::from_spine(&spine);

        let res = resolver.resolve(&identity("a", "Money Mike Harris", Some("2001-03-07")));
        assert_eq!(
            res.outcome,
            MatchOutcome::MatchedLastnameDob { mlbam_id: PlayerId(7) }
        );
        assert_eq!(res.rule_index, 2);
        assert_eq!(res.rule_candidates, [0, 1, 0]);
    }

    #[test]
    fn test_rule3_name_only_without_dob() {
        let spine = vec![spine_row(3, "Paul", "Skenes", Some("2002-05-29"))];
        let resolver = IdentityResolver::from_spine(&spine);

        let res = resolver.resolve(&identity("a", "Paul Skenes", None));
        assert_eq!(
            res.outcome,
            MatchOutcome::MatchedNameOnlyUnique { mlbam_id: PlayerId(3) }
        );
        assert_eq!(res.rule_index, 3);
        assert_eq!(res.rule_candidates, [0, 0, 1]);
    }

    #[test]
    fn test_ambiguity_is_terminal_at_rule1() {
        // Two distinct ids share name and DOB. Rule 2 would also be
        // ambiguous, but the point is rule 1 must already stop the
        // chain rather than falling through.
        let spine = vec![
            spine_row(1, "Jose", "Garcia", Some("2000-02-02")),
            spine_row(2, "Jose", "Garcia", Some("2000-02-02")),
        ];
        let resolver = IdentityResolver::from_spine(&spine);

        let res = resolver.resolve(&identity("a", "Jose Garcia", Some("2000-02-02")));
        assert_eq!(res.outcome, MatchOutcome::AmbiguousMultipleCandidates);
        assert_eq!(res.rule_index, 1);
        assert_eq!(res.rule_candidates, [2, 0, 0]);
        assert_eq!(res.candidate_ids, vec![PlayerId(1), PlayerId(2)]);
    }

    #[test]
    fn test_spec_scenario_two_j_smiths() {
        let spine = vec![
            spine_row(10, "J", "Smith", Some("2001-05-01")),
            spine_row(11, "John", "Smith", None),
            spine_row(12, "John", "Smith", None),
        ];
        let resolver = IdentityResolver::from_spine(&spine);

        // First identity: unique on rule 1
        let res = resolver.resolve(&identity("a", "J. Smith", Some("2001-05-01")));
        assert_eq!(
            res.outcome,
            MatchOutcome::MatchedExactNameDob { mlbam_id: PlayerId(10) }
        );

        // Second identity: zero on rules 1-2, two candidates on rule 3
        let res = resolver.resolve(&identity("b", "John Smith", Some("1999-01-01")));
        assert_eq!(res.outcome, MatchOutcome::AmbiguousMultipleCandidates);
        assert_eq!(res.rule_index, 3);
        assert_eq!(res.rule_candidates, [0, 0, 2]);
    }

    #[test]
    fn test_duplicate_spine_rows_count_as_one_candidate() {
        // Same id observed twice in the spine (multiple seasons)
        let spine = vec![
            spine_row(5, "Luis", "Robert", Some("1997-08-03")),
            spine_row(5, "Luis", "Robert", Some("1997-08-03")),
        ];
        let resolver = IdentityResolver::from_spine(&spine);

        let res = resolver.resolve(&identity("a", "Luis Robert", Some("1997-08-03")));
        assert_eq!(
            res.outcome,
            MatchOutcome::MatchedExactNameDob { mlbam_id: PlayerId(5) }
        );
        assert_eq!(res.rule_candidates[0], 1);
    }

    #[test]
    fn test_unmatched_no_candidate() {
        let spine = vec![spine_row(1, "Some", "Player", Some("2000-01-01"))];
        let resolver = IdentityResolver::from_spine(&spine);

        let res = resolver.resolve(&identity("a", "Nobody Here", Some("1990-01-01")));
        assert_eq!(res.outcome, MatchOutcome::UnmatchedNoCandidate);
        assert_eq!(res.rule_index, 0);
        assert_eq!(res.rule_candidates, [0, 0, 0]);
    }

    #[test]
    fn test_accent_insensitive_matching() {
        let spine = vec![spine_row(9, "Jose", "Ramirez", Some("1992-09-17"))];
        let resolver = IdentityResolver::from_spine(&spine);

        let res = resolver.resolve(&identity("a", "José Ramírez", Some("1992-09-17")));
        assert_eq!(
            res.outcome,
            MatchOutcome::MatchedExactNameDob { mlbam_id: PlayerId(9) }
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let spine = vec![
            spine_row(1, "A", "One", Some("2000-01-01")),
            spine_row(2, "B", "Two", None),
            spine_row(3, "B", "Two", None),
        ];
        let resolver = IdentityResolver::from_spine(&spine);
        let identities = vec![
            identity("k1", "A One", Some("2000-01-01")),
            identity("k2", "B Two", None),
            identity("k3", "Missing Person", None),
        ];

        let (first, tally_a) = resolver.resolve_all(&identities);
        let (second, tally_b) = resolver.resolve_all(&identities);

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);
        assert_eq!(tally_a, tally_b);
        assert_eq!(tally_a.get("matched_exact_name_dob"), Some(&1));
        assert_eq!(tally_a.get("ambiguous_multiple_candidates"), Some(&1));
        assert_eq!(tally_a.get("unmatched_no_candidate"), Some(&1));
    }

    #[test]
    fn test_identity_map_artifact_is_byte_stable() {
        let spine = vec![spine_row(1, "A", "One", Some("2000-01-01"))];
        let resolver = IdentityResolver::from_spine(&spine);
        let identities = vec![identity("k1", "A One", Some("2000-01-01"))];
        let (mappings, _) = resolver.resolve_all(&identities);

        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        write_identity_map(&mut out_a, &mappings).unwrap();
        write_identity_map(&mut out_b, &mappings).unwrap();
        assert_eq!(out_a, out_b);
        let text = String::from_utf8(out_a).unwrap();
        assert!(text.starts_with("identity_key,fgid,player_name,mlbam_id,match_outcome"));
        assert!(text.contains("matched_exact_name_dob"));
    }
}
