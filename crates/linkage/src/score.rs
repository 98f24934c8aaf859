//! Composite similarity between two lab test records.
//!
//! Hard gates run first and zero the score outright. Only when no gate
//! fires are the additive signals accumulated, capped at 1.0.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::LabTestRecord;
use crate::normalize::{normalize, tokenize};
use crate::rules;
use crate::specimen::{extract_specimen, tags_compatible, SpecimenTag};

pub const CODE_MATCH_WEIGHT: f64 = 0.50;
pub const NAME_MATCH_WEIGHT: f64 = 0.45;
pub const JACCARD_WEIGHT: f64 = 0.35;
pub const JACCARD_FLOOR: f64 = 0.3;
pub const LEVENSHTEIN_WEIGHT: f64 = 0.15;
pub const LEVENSHTEIN_LENGTH_RATIO: f64 = 0.5;
pub const LEVENSHTEIN_FLOOR: f64 = 0.6;
pub const SYNONYM_BONUS: f64 = 0.3;
pub const CONTAINMENT_WEIGHT: f64 = 0.10;
pub const CONTAINMENT_FLOOR: f64 = 0.7;
pub const SAME_TYPE_BONUS: f64 = 0.02;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern compiles"));

/// A record with its derived comparison fields computed once.
#[derive(Debug, Clone)]
pub struct Prepared<'a> {
    pub record: &'a LabTestRecord,
    pub normalized: String,
    pub tokens: BTreeSet<String>,
    pub integers: Vec<String>,
    pub specimen: SpecimenTag,
}

impl<'a> Prepared<'a> {
    pub fn new(record: &'a LabTestRecord) -> Self {
        let normalized = normalize(&record.raw_name);
        let tokens = tokenize(&normalized).into_iter().map(str::to_string).collect();
        let integers = INTEGER
            .find_iter(&normalized)
            .map(|m| {
                let digits = m.as_str().trim_start_matches('0');
                if digits.is_empty() { "0".to_string() } else { digits.to_string() }
            })
            .collect();
        Self {
            record,
            normalized,
            tokens,
            integers,
            specimen: extract_specimen(&record.raw_name),
        }
    }

    fn token_refs(&self) -> Vec<&str> {
        self.tokens.iter().map(String::as_str).collect()
    }
}

/// Tunable assumptions of the scorer.
#[derive(Debug, Clone, Copy)]
pub struct ScoringPolicy {
    /// Treat a name with no specimen cue as serum.
    pub default_implies_serum: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            default_implies_serum: true,
        }
    }
}

/// Which hard gate rejected a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    Blocklist { term: &'static str, other: &'static str },
    ScreeningPanel,
    NumericSuffix { left: String, right: String },
    Specimen { left: SpecimenTag, right: SpecimenTag },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocklist { term, other } => write!(f, "blocklist={term}/{other}"),
            Self::ScreeningPanel => write!(f, "screening_panel"),
            Self::NumericSuffix { left, right } => write!(f, "numeric_suffix={left}/{right}"),
            Self::Specimen { left, right } => write!(f, "specimen={left}/{right}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    pub score: f64,
    pub reasons: Vec<String>,
    pub blocked: Option<BlockReason>,
}

impl MatchScore {
    fn blocked(reason: BlockReason) -> Self {
        Self {
            score: 0.0,
            reasons: vec![reason.to_string()],
            blocked: Some(reason),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    policy: ScoringPolicy,
}

impl Scorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// First hard gate that rejects the pair, if any.
    pub fn gate(&self, left: &Prepared<'_>, right: &Prepared<'_>) -> Option<BlockReason> {
        if let Some((term, other)) = rules::blocked_pair(&left.normalized, &right.normalized) {
            return Some(BlockReason::Blocklist { term, other });
        }
        if rules::screening_conflict(&left.token_refs(), &right.token_refs()) {
            return Some(BlockReason::ScreeningPanel);
        }

        let same_code = left.record.code == right.record.code;

        if !same_code
            && left.integers.len() == 1
            && right.integers.len() == 1
            && left.integers[0] != right.integers[0]
        {
            return Some(BlockReason::NumericSuffix {
                left: left.integers[0].clone(),
                right: right.integers[0].clone(),
            });
        }

        if !same_code
            && !tags_compatible(left.specimen, right.specimen, self.policy.default_implies_serum)
        {
            return Some(BlockReason::Specimen {
                left: left.specimen,
                right: right.specimen,
            });
        }

        None
    }

    pub fn score(&self, left: &Prepared<'_>, right: &Prepared<'_>) -> MatchScore {
        if let Some(reason) = self.gate(left, right) {
            return MatchScore::blocked(reason);
        }

        let mut score = 0.0;
        let mut reasons = Vec::new();

        if left.record.code == right.record.code {
            score += CODE_MATCH_WEIGHT;
            reasons.push("code_exact".to_string());
        }

        if left.normalized == right.normalized {
            score += NAME_MATCH_WEIGHT;
            reasons.push("name_exact".to_string());
        } else {
            let shared = left.tokens.intersection(&right.tokens).count();

            let union = left.tokens.union(&right.tokens).count();
            if union > 0 {
                let jaccard = shared as f64 / union as f64;
                if jaccard > JACCARD_FLOOR {
                    score += jaccard * JACCARD_WEIGHT;
                    reasons.push(format!("token_jaccard={jaccard:.2}"));
                }
            }

            if let Some(similarity) = edit_similarity(&left.normalized, &right.normalized) {
                score += similarity * LEVENSHTEIN_WEIGHT;
                reasons.push(format!("levenshtein={similarity:.2}"));
            }

            let hit = rules::synonym_hit(&left.normalized, &right.normalized)
                .or_else(|| rules::synonym_hit(&right.normalized, &left.normalized).map(|(a, b)| (b, a)));
            if let Some((a, b)) = hit {
                score += SYNONYM_BONUS;
                reasons.push(format!("synonym={a}~{b}"));
            }

            let smaller = left.tokens.len().min(right.tokens.len());
            if smaller > 0 {
                let containment = shared as f64 / smaller as f64;
                if containment > CONTAINMENT_FLOOR {
                    score += containment * CONTAINMENT_WEIGHT;
                    reasons.push(format!("containment={containment:.2}"));
                }
            }
        }

        if left.record.kind == right.record.kind {
            score += SAME_TYPE_BONUS;
            reasons.push("same_type".to_string());
        }

        MatchScore {
            score: score.min(1.0),
            reasons,
            blocked: None,
        }
    }

    /// Score two records without pre-computed fields.
    pub fn score_records(&self, left: &LabTestRecord, right: &LabTestRecord) -> MatchScore {
        self.score(&Prepared::new(left), &Prepared::new(right))
    }

    pub fn is_blocked(&self, left: &LabTestRecord, right: &LabTestRecord) -> bool {
        self.gate(&Prepared::new(left), &Prepared::new(right)).is_some()
    }
}

/// `1 - edits / max_len`, only when the lengths are comparable and the
/// names are close enough for the signal to mean something.
fn edit_similarity(a: &str, b: &str) -> Option<f64> {
    let (la, lb) = (a.chars().count(), b.chars().count());
    let longest = la.max(lb);
    if longest == 0 {
        return None;
    }
    let ratio = la.min(lb) as f64 / longest as f64;
    if ratio <= LEVENSHTEIN_LENGTH_RATIO {
        return None;
    }
    let similarity = 1.0 - strsim::levenshtein(a, b) as f64 / longest as f64;
    (similarity > LEVENSHTEIN_FLOOR).then_some(similarity)
}
