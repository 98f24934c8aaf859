//! Canonical catalog assembly.
//!
//! Every record ends up in exactly one concept: assigned pairs become
//! two-offering concepts, unmatched records become singletons. IDs are
//! handed out after the final sort, so they are presentation order and
//! not a stable identity across runs with different inputs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    CanonicalConcept, ConflictCandidate, ConflictEntry, ConflictRecord, LabTestRecord, MatchAssignment, Offering,
    SpecimenVariant, SpecimenVariantGroup, SpecimenVariantReport,
};
use crate::normalize::normalize;
use crate::rules::{base_concept_key, classify_category};
use crate::specimen::{extract_specimen, SpecimenTag};

/// Audit examples kept in the output.
pub const MAX_VARIANT_EXAMPLES: usize = 10;

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn concept_id(position: usize) -> String {
    format!("CAN-{:04}", position + 1)
}

fn display_name(normalized: String, record: &LabTestRecord) -> String {
    if normalized.is_empty() {
        record.raw_name.trim().to_uppercase()
    } else {
        normalized
    }
}

fn with_label(name: &str, tag: SpecimenTag) -> String {
    match tag.label() {
        Some(label) => format!("{name} [{label}]"),
        None => name.to_string(),
    }
}

fn matched_concept(left: &LabTestRecord, right: &LabTestRecord, assignment: &MatchAssignment) -> CanonicalConcept {
    let left_name = display_name(normalize(&left.raw_name), left);
    let right_name = display_name(normalize(&right.raw_name), right);
    let base = if right_name.chars().count() < left_name.chars().count() {
        right_name
    } else {
        left_name
    };
    let tag = extract_specimen(&left.raw_name);

    let mut offerings = BTreeMap::new();
    offerings.insert(left.lab_id.clone(), Offering::from(left));
    offerings.insert(right.lab_id.clone(), Offering::from(right));

    CanonicalConcept {
        id: String::new(),
        canonical_name: with_label(&base, tag),
        medical_category: classify_category(&left.raw_name).to_string(),
        specimen_type: tag,
        match_confidence: Some(round4(assignment.score)),
        match_reasons: Some(assignment.reasons.clone()),
        offerings,
        base_concept: base_concept_key(&base),
    }
}

fn single_concept(record: &LabTestRecord) -> CanonicalConcept {
    let base = display_name(normalize(&record.raw_name), record);
    let tag = extract_specimen(&record.raw_name);

    let mut offerings = BTreeMap::new();
    offerings.insert(record.lab_id.clone(), Offering::from(record));

    CanonicalConcept {
        id: String::new(),
        canonical_name: with_label(&base, tag),
        medical_category: classify_category(&record.raw_name).to_string(),
        specimen_type: tag,
        match_confidence: None,
        match_reasons: None,
        offerings,
        base_concept: base_concept_key(&base),
    }
}

/// First offering in lab order; the tiebreak of last resort.
fn anchor(concept: &CanonicalConcept) -> Option<(&String, &String)> {
    concept.offerings.iter().next().map(|(lab, o)| (lab, &o.code))
}

/// Matched concepts first by confidence (highest first), then singletons
/// alphabetically.
fn presentation_order(a: &CanonicalConcept, b: &CanonicalConcept) -> Ordering {
    match (a.match_confidence, b.match_confidence) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.canonical_name.cmp(&b.canonical_name))
    .then_with(|| anchor(a).cmp(&anchor(b)))
}

pub fn build_catalog(
    left: &[LabTestRecord],
    right: &[LabTestRecord],
    assignments: &[MatchAssignment],
    unmatched_left: &[usize],
    unmatched_right: &[usize],
) -> Vec<CanonicalConcept> {
    let mut concepts: Vec<CanonicalConcept> = assignments
        .iter()
        .map(|a| matched_concept(&left[a.left_idx], &right[a.right_idx], a))
        .chain(unmatched_left.iter().map(|&i| single_concept(&left[i])))
        .chain(unmatched_right.iter().map(|&i| single_concept(&right[i])))
        .collect();

    concepts.sort_by(presentation_order);
    for (position, concept) in concepts.iter_mut().enumerate() {
        concept.id = concept_id(position);
    }

    tracing::debug!(
        concepts = concepts.len(),
        matched = assignments.len(),
        "canonical catalog built"
    );
    concepts
}

/// Group concepts by their specimen-stripped base name and report every
/// base that was split into two or more specimen types.
pub fn specimen_variant_audit(concepts: &[CanonicalConcept]) -> SpecimenVariantReport {
    let mut groups: BTreeMap<&str, Vec<&CanonicalConcept>> = BTreeMap::new();
    for c in concepts {
        groups.entry(c.base_concept.as_str()).or_default().push(c);
    }

    let split: Vec<SpecimenVariantGroup> = groups
        .into_iter()
        .filter(|(_, members)| {
            let tags: BTreeSet<SpecimenTag> = members.iter().map(|c| c.specimen_type).collect();
            tags.len() >= 2
        })
        .map(|(base, members)| SpecimenVariantGroup {
            base_concept: base.to_string(),
            variants: members
                .into_iter()
                .map(|c| SpecimenVariant {
                    id: c.id.clone(),
                    canonical_name: c.canonical_name.clone(),
                    specimen_type: c.specimen_type,
                })
                .collect(),
        })
        .collect();

    SpecimenVariantReport {
        count: split.len(),
        examples: split.into_iter().take(MAX_VARIANT_EXAMPLES).collect(),
    }
}

/// Resolve conflict indices into display entries.
pub fn render_conflicts(
    left: &[LabTestRecord],
    right: &[LabTestRecord],
    conflicts: &[ConflictRecord],
) -> Vec<ConflictEntry> {
    conflicts
        .iter()
        .map(|c| {
            let r = &right[c.right_idx];
            ConflictEntry {
                lab: r.lab_id.clone(),
                code: r.code.clone(),
                name: r.raw_name.clone(),
                spread: round4(c.spread),
                candidates: c
                    .candidates
                    .iter()
                    .map(|cand| {
                        let l = &left[cand.left_idx];
                        ConflictCandidate {
                            lab: l.lab_id.clone(),
                            code: l.code.clone(),
                            name: l.raw_name.clone(),
                            score: round4(cand.score),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}
