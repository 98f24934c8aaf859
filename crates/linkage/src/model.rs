use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::specimen::SpecimenTag;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Individual,
    Profile,
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Individual => write!(f, "individual"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// Collection metadata joined from the specimen side table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpecimenMeta {
    pub tube: Option<String>,
    pub temperature: Option<String>,
    pub turnaround_time: Option<String>,
}

/// One lab's test offering after load + dedup.
///
/// Fields are never mutated once loaded; enrichment only fills
/// `specimen_meta` when it was absent.
#[derive(Debug, Clone, PartialEq)]
pub struct LabTestRecord {
    pub code: String,
    pub raw_name: String,
    pub lab_id: String,
    pub kind: TestKind,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub components: Option<Vec<String>>,
    pub specimen_meta: Option<SpecimenMeta>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A scored (left, right) pair that cleared the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    pub left_idx: usize,
    pub right_idx: usize,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// A committed one-to-one pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchAssignment {
    pub left_idx: usize,
    pub right_idx: usize,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// A right-side record whose top two candidates are within the conflict
/// margin of each other. Advisory only.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    pub right_idx: usize,
    pub spread: f64,
    pub candidates: Vec<CandidatePair>,
}

#[derive(Debug, Default)]
pub struct MatchOutput {
    pub assignments: Vec<MatchAssignment>,
    pub conflicts: Vec<ConflictRecord>,
    pub unmatched_left: Vec<usize>,
    pub unmatched_right: Vec<usize>,
    pub pairs_scored: usize,
}

// ---------------------------------------------------------------------------
// Canonical catalog
// ---------------------------------------------------------------------------

/// Snapshot of a record's display fields, owned by the concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub code: String,
    pub name: String,
    pub price: Option<f64>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: TestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tube: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnaround_time: Option<String>,
}

impl From<&LabTestRecord> for Offering {
    fn from(record: &LabTestRecord) -> Self {
        let meta = record.specimen_meta.clone().unwrap_or_default();
        Self {
            code: record.code.clone(),
            name: record.raw_name.clone(),
            price: record.price,
            category: record.category.clone(),
            kind: record.kind,
            components: record.components.clone(),
            tube: meta.tube,
            temperature: meta.temperature,
            turnaround_time: meta.turnaround_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalConcept {
    pub id: String,
    pub canonical_name: String,
    pub medical_category: String,
    pub specimen_type: SpecimenTag,
    pub match_confidence: Option<f64>,
    pub match_reasons: Option<Vec<String>>,
    pub offerings: BTreeMap<String, Offering>,
    /// Normalized name with specimen words removed; groups specimen variants.
    #[serde(skip)]
    pub base_concept: String,
}

impl CanonicalConcept {
    pub fn is_matched(&self) -> bool {
        self.offerings.len() >= 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictCandidate {
    pub lab: String,
    pub code: String,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub lab: String,
    pub code: String,
    pub name: String,
    pub spread: f64,
    pub candidates: Vec<ConflictCandidate>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingSummary {
    pub total_canonical_concepts: usize,
    pub matched_both_labs: usize,
    /// `<lab>_only` counts, one entry per lab.
    #[serde(flatten)]
    pub single_lab: BTreeMap<String, usize>,
    pub conflicts_detected: usize,
    pub match_threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    #[serde(rename = "0.90-1.00")]
    pub excellent: usize,
    #[serde(rename = "0.70-0.89")]
    pub good: usize,
    #[serde(rename = "0.50-0.69")]
    pub fair: usize,
    #[serde(rename = "0.35-0.49")]
    pub weak: usize,
    /// Only populated when the threshold is configured below 0.35.
    #[serde(rename = "0.00-0.34", default, skip_serializing_if = "is_zero")]
    pub below: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl ConfidenceDistribution {
    pub fn record(&mut self, score: f64) {
        if score >= 0.90 {
            self.excellent += 1;
        } else if score >= 0.70 {
            self.good += 1;
        } else if score >= 0.50 {
            self.fair += 1;
        } else if score >= 0.35 {
            self.weak += 1;
        } else {
            self.below += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.fair + self.weak + self.below
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecimenVariant {
    pub id: String,
    pub canonical_name: String,
    pub specimen_type: SpecimenTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecimenVariantGroup {
    pub base_concept: String,
    pub variants: Vec<SpecimenVariant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecimenVariantReport {
    pub count: usize,
    pub examples: Vec<SpecimenVariantGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub generated_at: String,
    pub description: String,
    pub source_counts: BTreeMap<String, usize>,
    pub matching_summary: MatchingSummary,
    pub confidence_distribution: ConfidenceDistribution,
    pub specimen_variant_separation: SpecimenVariantReport,
    pub category_distribution: BTreeMap<String, usize>,
}

/// The single document a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub metadata: CatalogMetadata,
    pub canonical_catalog: Vec<CanonicalConcept>,
    pub conflicts: Vec<ConflictEntry>,
}
