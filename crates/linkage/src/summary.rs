use std::collections::BTreeMap;

use crate::catalog::specimen_variant_audit;
use crate::model::{CanonicalConcept, CatalogMetadata, ConfidenceDistribution, MatchingSummary};

/// Per-run facts the catalog itself cannot tell us.
#[derive(Debug, Clone)]
pub struct RunFacts {
    pub generated_at: String,
    pub description: String,
    pub left_lab: String,
    pub right_lab: String,
    pub threshold: f64,
    pub conflicts: usize,
    pub source_counts: BTreeMap<String, usize>,
}

/// Compute the metadata block from the finished catalog.
pub fn build_metadata(concepts: &[CanonicalConcept], facts: RunFacts) -> CatalogMetadata {
    let mut single_lab: BTreeMap<String, usize> = BTreeMap::new();
    single_lab.insert(format!("{}_only", facts.left_lab), 0);
    single_lab.insert(format!("{}_only", facts.right_lab), 0);

    let mut matched = 0;
    let mut confidence = ConfidenceDistribution::default();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();

    for c in concepts {
        *categories.entry(c.medical_category.clone()).or_insert(0) += 1;

        if c.is_matched() {
            matched += 1;
            if let Some(score) = c.match_confidence {
                confidence.record(score);
            }
        } else if let Some(lab) = c.offerings.keys().next() {
            *single_lab.entry(format!("{lab}_only")).or_insert(0) += 1;
        }
    }

    CatalogMetadata {
        generated_at: facts.generated_at,
        description: facts.description,
        source_counts: facts.source_counts,
        matching_summary: MatchingSummary {
            total_canonical_concepts: concepts.len(),
            matched_both_labs: matched,
            single_lab,
            conflicts_detected: facts.conflicts,
            match_threshold: facts.threshold,
        },
        confidence_distribution: confidence,
        specimen_variant_separation: specimen_variant_audit(concepts),
        category_distribution: categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Offering;
    use crate::model::TestKind;
    use crate::specimen::SpecimenTag;

    fn offering(code: &str) -> Offering {
        Offering {
            code: code.into(),
            name: code.into(),
            price: None,
            category: None,
            kind: TestKind::Individual,
            components: None,
            tube: None,
            temperature: None,
            turnaround_time: None,
        }
    }

    fn concept(labs: &[&str], confidence: Option<f64>, category: &str) -> CanonicalConcept {
        CanonicalConcept {
            id: "CAN-0000".into(),
            canonical_name: "X".into(),
            medical_category: category.into(),
            specimen_type: SpecimenTag::Default,
            match_confidence: confidence,
            match_reasons: confidence.map(|_| vec![]),
            offerings: labs.iter().map(|l| (l.to_string(), offering("X"))).collect(),
            base_concept: "X".into(),
        }
    }

    fn facts() -> RunFacts {
        RunFacts {
            generated_at: "2026-01-01T00:00:00Z".into(),
            description: "test".into(),
            left_lab: "cdl".into(),
            right_lab: "dynacare".into(),
            threshold: 0.35,
            conflicts: 2,
            source_counts: BTreeMap::new(),
        }
    }

    #[test]
    fn summary_counts() {
        let concepts = vec![
            concept(&["cdl", "dynacare"], Some(0.95), "Thyroid"),
            concept(&["cdl", "dynacare"], Some(0.72), "Thyroid"),
            concept(&["cdl", "dynacare"], Some(0.40), "General"),
            concept(&["cdl"], None, "General"),
            concept(&["cdl"], None, "Vitamins"),
        ];
        let meta = build_metadata(&concepts, facts());
        let s = &meta.matching_summary;
        assert_eq!(s.total_canonical_concepts, 5);
        assert_eq!(s.matched_both_labs, 3);
        assert_eq!(s.single_lab["cdl_only"], 2);
        assert_eq!(s.single_lab["dynacare_only"], 0);
        assert_eq!(s.conflicts_detected, 2);

        let d = &meta.confidence_distribution;
        assert_eq!((d.excellent, d.good, d.fair, d.weak), (1, 1, 0, 1));
        assert_eq!(d.total(), s.matched_both_labs);

        assert_eq!(meta.category_distribution["Thyroid"], 2);
        assert_eq!(meta.category_distribution["General"], 2);
    }

    #[test]
    fn single_lab_keys_flatten_into_summary() {
        let meta = build_metadata(&[concept(&["dynacare"], None, "General")], facts());
        let json = serde_json::to_value(&meta.matching_summary).unwrap();
        assert_eq!(json["cdl_only"], 0);
        assert_eq!(json["dynacare_only"], 1);
        assert_eq!(json["match_threshold"], 0.35);
    }

    #[test]
    fn low_threshold_scores_get_their_own_band() {
        let concepts = vec![
            concept(&["cdl", "dynacare"], Some(0.40), "General"),
            concept(&["cdl", "dynacare"], Some(0.22), "General"),
        ];
        let meta = build_metadata(&concepts, RunFacts { threshold: 0.2, ..facts() });
        let d = &meta.confidence_distribution;
        assert_eq!((d.weak, d.below), (1, 1));
        assert_eq!(d.total(), 2);

        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json["0.35-0.49"], 1);
        assert_eq!(json["0.00-0.34"], 1);
    }

    #[test]
    fn low_band_is_omitted_when_empty() {
        let meta = build_metadata(&[concept(&["cdl", "dynacare"], Some(0.95), "General")], facts());
        let json = serde_json::to_value(&meta.confidence_distribution).unwrap();
        assert!(json.get("0.00-0.34").is_none());
    }
}
