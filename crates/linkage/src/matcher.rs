use std::cmp::Ordering;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::error::LinkageError;
use crate::model::{CandidatePair, ConflictRecord, LabTestRecord, MatchAssignment, MatchOutput};
use crate::score::{Prepared, Scorer};

#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub threshold: f64,
    pub conflict_margin: f64,
    pub conflict_candidates: usize,
    pub max_pairs: Option<u64>,
    pub time_budget: Option<Duration>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 0.35,
            conflict_margin: 0.15,
            conflict_candidates: 3,
            max_pairs: None,
            time_budget: None,
        }
    }
}

/// Highest score first; equal scores fall back to index order so the
/// result never depends on thread scheduling.
fn by_score_desc(a: &CandidatePair, b: &CandidatePair) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.right_idx.cmp(&b.right_idx))
        .then(a.left_idx.cmp(&b.left_idx))
}

/// Score every right record against every left record, commit a greedy
/// one-to-one assignment, and flag near-tie right records as conflicts.
pub fn match_catalogs(
    left: &[LabTestRecord],
    right: &[LabTestRecord],
    scorer: &Scorer,
    options: &MatchOptions,
) -> Result<MatchOutput, LinkageError> {
    let pair_count = left.len() as u64 * right.len() as u64;
    if let Some(max_pairs) = options.max_pairs {
        if pair_count > max_pairs {
            return Err(LinkageError::BudgetExceeded {
                reason: format!("{} x {} = {pair_count} pairs exceeds max_pairs={max_pairs}", left.len(), right.len()),
            });
        }
    }

    let left_prepared: Vec<Prepared<'_>> = left.par_iter().map(Prepared::new).collect();
    let right_prepared: Vec<Prepared<'_>> = right.par_iter().map(Prepared::new).collect();

    let started = Instant::now();
    let per_right: Vec<Vec<CandidatePair>> = right_prepared
        .par_iter()
        .enumerate()
        .map(|(right_idx, rp)| {
            if let Some(budget) = options.time_budget {
                if started.elapsed() >= budget {
                    return Err(LinkageError::BudgetExceeded {
                        reason: format!("pairwise scoring exceeded {:.1}s", budget.as_secs_f64()),
                    });
                }
            }
            let mut candidates: Vec<CandidatePair> = left_prepared
                .iter()
                .enumerate()
                .filter_map(|(left_idx, lp)| {
                    let s = scorer.score(lp, rp);
                    (s.score >= options.threshold).then(|| CandidatePair {
                        left_idx,
                        right_idx,
                        score: s.score,
                        reasons: s.reasons,
                    })
                })
                .collect();
            candidates.sort_by(by_score_desc);
            Ok(candidates)
        })
        .collect::<Result<_, _>>()?;

    tracing::debug!(
        pairs = pair_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pairwise scoring complete"
    );

    let conflicts = detect_conflicts(&per_right, options.conflict_margin, options.conflict_candidates);
    let flat: Vec<CandidatePair> = per_right.into_iter().flatten().collect();
    let (assignments, unmatched_left, unmatched_right) = greedy_assign(flat, left.len(), right.len());

    tracing::info!(
        assignments = assignments.len(),
        conflicts = conflicts.len(),
        unmatched_left = unmatched_left.len(),
        unmatched_right = unmatched_right.len(),
        "matching complete"
    );

    Ok(MatchOutput {
        assignments,
        conflicts,
        unmatched_left,
        unmatched_right,
        pairs_scored: pair_count as usize,
    })
}

/// Commit pairs from highest score down, skipping any whose endpoint is
/// already claimed. No backtracking, so the result approximates a
/// maximum-weight matching rather than guaranteeing one.
pub fn greedy_assign(
    mut candidates: Vec<CandidatePair>,
    left_len: usize,
    right_len: usize,
) -> (Vec<MatchAssignment>, Vec<usize>, Vec<usize>) {
    candidates.sort_by(by_score_desc);

    let mut left_claimed = vec![false; left_len];
    let mut right_claimed = vec![false; right_len];
    let mut assignments = Vec::new();

    for c in candidates {
        if left_claimed[c.left_idx] || right_claimed[c.right_idx] {
            continue;
        }
        left_claimed[c.left_idx] = true;
        right_claimed[c.right_idx] = true;
        assignments.push(MatchAssignment {
            left_idx: c.left_idx,
            right_idx: c.right_idx,
            score: c.score,
            reasons: c.reasons,
        });
    }

    let unmatched = |claimed: &[bool]| -> Vec<usize> {
        claimed
            .iter()
            .enumerate()
            .filter(|(_, c)| !**c)
            .map(|(i, _)| i)
            .collect()
    };

    (assignments, unmatched(&left_claimed), unmatched(&right_claimed))
}

/// Right records whose two best candidates lie within `margin` of each
/// other. `per_right` lists must already be sorted best-first.
pub fn detect_conflicts(per_right: &[Vec<CandidatePair>], margin: f64, keep: usize) -> Vec<ConflictRecord> {
    per_right
        .iter()
        .enumerate()
        .filter(|(_, cands)| cands.len() >= 2)
        .filter_map(|(right_idx, cands)| {
            let spread = cands[0].score - cands[1].score;
            (spread < margin).then(|| ConflictRecord {
                right_idx,
                spread,
                candidates: cands.iter().take(keep).cloned().collect(),
            })
        })
        .collect()
}
