use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use labcanon_linkage::load::{parse_catalog, parse_specimen_table};
use labcanon_linkage::model::CatalogDocument;
use labcanon_linkage::score::BlockReason;
use labcanon_linkage::{run_at, LabTestRecord, LinkageConfig, LinkageError, LinkageInput, Scorer, SpecimenTag, TestKind};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

fn load_input(config: &LinkageConfig) -> LinkageInput {
    LinkageInput {
        left: parse_catalog("cdl catalog", &read_fixture(&config.left.file)).unwrap(),
        right: parse_catalog("dynacare catalog", &read_fixture(&config.right.file)).unwrap(),
        specimens: match &config.left.specimens {
            Some(file) => parse_specimen_table("specimen table", &read_fixture(file)).unwrap(),
            None => vec![],
        },
    }
}

fn load_and_run() -> CatalogDocument {
    let config = LinkageConfig::from_toml(&read_fixture("linkage.toml")).unwrap();
    let input = load_input(&config);
    run_at(&config, &input, Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap()).unwrap()
}

fn record(lab: &str, code: &str, name: &str) -> LabTestRecord {
    LabTestRecord {
        code: code.into(),
        raw_name: name.into(),
        lab_id: lab.into(),
        kind: TestKind::Individual,
        category: None,
        price: None,
        components: None,
        specimen_meta: None,
    }
}

fn find<'a>(doc: &'a CatalogDocument, lab: &str, code: &str) -> &'a labcanon_linkage::model::CanonicalConcept {
    doc.canonical_catalog
        .iter()
        .find(|c| c.offerings.get(lab).is_some_and(|o| o.code == code))
        .unwrap_or_else(|| panic!("no concept holds {lab}/{code}"))
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn shared_code_matches_despite_name_noise() {
    let scorer = Scorer::default();
    let s = scorer.score_records(&record("cdl", "TSH", "TSH"), &record("dynacare", "TSH", "Dosage TSH"));
    assert!(s.score >= 0.50, "{s:?}");

    let doc = load_and_run();
    let tsh = find(&doc, "cdl", "TSH");
    assert!(tsh.is_matched());
    assert_eq!(tsh.offerings["dynacare"].code, "TSH");
    assert_eq!(tsh.canonical_name, "TSH");
}

#[test]
fn fertility_never_matches_iron() {
    let scorer = Scorer::default();
    let s = scorer.score_records(&record("cdl", "FER1", "FER #1"), &record("dynacare", "FERT1", "FERTILITÉ #1"));
    assert_eq!(s.score, 0.0);
    assert!(matches!(s.blocked, Some(BlockReason::Blocklist { term: "FER", other: "FERTILITE" })));

    let doc = load_and_run();
    assert!(!find(&doc, "cdl", "FER1").is_matched());
    assert!(!find(&doc, "dynacare", "FERT1").is_matched());
}

#[test]
fn serum_and_urine_24h_stay_apart() {
    let scorer = Scorer::default();
    let s = scorer.score_records(
        &record("cdl", "CA", "Calcium"),
        &record("dynacare", "CAU24", "CALCIUM, URINE 24 HEURES"),
    );
    assert_eq!(s.score, 0.0);
    assert!(matches!(s.blocked, Some(BlockReason::Specimen { .. })));

    let doc = load_and_run();
    let serum = find(&doc, "cdl", "CA");
    let urine = find(&doc, "dynacare", "CAU24");
    assert_ne!(serum.id, urine.id);
    assert_eq!(serum.specimen_type, SpecimenTag::Default);
    assert_eq!(urine.specimen_type, SpecimenTag::Urine24h);
    assert_eq!(urine.canonical_name, "CALCIUM URINE 24 HEURES [URINE 24H]");

    let audit = &doc.metadata.specimen_variant_separation;
    assert_eq!(audit.count, 1);
    assert_eq!(audit.examples[0].base_concept, "CALCIUM");
}

#[test]
fn synonym_carries_vitamin_b12() {
    let scorer = Scorer::default();
    let s = scorer.score_records(&record("cdl", "B12", "Vitamine B12"), &record("dynacare", "VB12", "B12"));
    assert!(s.score >= 0.30, "{s:?}");
    assert!(s.reasons.iter().any(|r| r.starts_with("synonym=")), "{:?}", s.reasons);

    let doc = load_and_run();
    let b12 = find(&doc, "cdl", "B12");
    assert_eq!(b12.offerings["dynacare"].code, "VB12");
    assert_eq!(b12.canonical_name, "B12");
}

#[test]
fn empty_right_catalog_yields_singleton() {
    let config = LinkageConfig::from_paths("a.json", "b.json", None);
    let input = LinkageInput {
        left: parse_catalog(
            "cdl catalog",
            r#"[{"code": "X1", "raw_name": "Glycémie à jeun", "type": "individual", "category": null, "price": 7.0}]"#,
        )
        .unwrap(),
        right: parse_catalog("dynacare catalog", "[]").unwrap(),
        specimens: vec![],
    };
    let doc = run_at(&config, &input, Utc::now()).unwrap();
    assert_eq!(doc.canonical_catalog.len(), 1);
    let c = &doc.canonical_catalog[0];
    assert_eq!(c.offerings.len(), 1);
    assert!(c.offerings.contains_key("cdl"));
    assert!(c.match_confidence.is_none());

    let json = serde_json::to_value(c).unwrap();
    assert!(json["match_confidence"].is_null());
    assert!(json["match_reasons"].is_null());
}

// -------------------------------------------------------------------------
// Whole-document properties
// -------------------------------------------------------------------------

#[test]
fn fixture_summary() {
    let doc = load_and_run();
    let s = &doc.metadata.matching_summary;
    assert_eq!(s.total_canonical_concepts, 10);
    assert_eq!(s.matched_both_labs, 4);
    assert_eq!(s.single_lab["cdl_only"], 4);
    assert_eq!(s.single_lab["dynacare_only"], 2);
    assert_eq!(s.conflicts_detected, 1);
    assert_eq!(s.match_threshold, 0.35);

    let d = &doc.metadata.confidence_distribution;
    assert_eq!((d.excellent, d.good, d.fair, d.weak), (0, 1, 1, 2));

    let counts = &doc.metadata.source_counts;
    assert_eq!(counts["cdl_raw"], 9);
    assert_eq!(counts["cdl_deduplicated"], 8);
    assert_eq!(counts["cdl_enriched"], 2);
    assert_eq!(counts["dynacare_raw"], 6);
    assert_eq!(counts["specimen_table_rows"], 3);

    assert_eq!(doc.metadata.generated_at, "2026-01-15T08:30:00Z");
}

#[test]
fn every_record_lands_in_exactly_one_concept() {
    let doc = load_and_run();
    let mut seen: Vec<(String, String)> = doc
        .canonical_catalog
        .iter()
        .flat_map(|c| c.offerings.iter().map(|(lab, o)| (lab.clone(), o.code.clone())))
        .collect();
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), total, "a record appears in two concepts");
    assert_eq!(total, 8 + 6);
}

#[test]
fn ids_follow_presentation_order() {
    let doc = load_and_run();
    let names: Vec<&str> = doc.canonical_catalog.iter().map(|c| c.canonical_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "TSH",
            "B12",
            "LIPIDIQUE",
            "HEPATITE A",
            "CALCIUM",
            "CALCIUM URINE 24 HEURES [URINE 24H]",
            "FER 1",
            "FERTILITE 1",
            "GLYCEMIE A JEUN",
            "HEPATITE A IGM",
        ]
    );
    for (i, c) in doc.canonical_catalog.iter().enumerate() {
        assert_eq!(c.id, format!("CAN-{:04}", i + 1));
    }
}

#[test]
fn near_tie_is_reported_and_still_assigned() {
    let doc = load_and_run();
    assert_eq!(doc.conflicts.len(), 1);
    let conflict = &doc.conflicts[0];
    assert_eq!(conflict.lab, "dynacare");
    assert_eq!(conflict.code, "HAV");
    assert_eq!(conflict.spread, 0.0);
    let codes: Vec<&str> = conflict.candidates.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["HAVG", "HAVM"]);

    let hav = find(&doc, "dynacare", "HAV");
    assert_eq!(hav.offerings["cdl"].code, "HAVG");
    assert_eq!(hav.match_confidence, Some(0.4605));
}

#[test]
fn dedup_keeps_categorized_record_and_enrichment_joins_left() {
    let doc = load_and_run();
    let calcium = find(&doc, "cdl", "CA");
    let offering = &calcium.offerings["cdl"];
    assert_eq!(offering.name, "Calcium");
    assert_eq!(offering.category.as_deref(), Some("Biochimie"));
    assert_eq!(offering.tube.as_deref(), Some("SST"));
    assert_eq!(offering.turnaround_time.as_deref(), Some("1"));

    let tsh = find(&doc, "cdl", "TSH");
    assert!(tsh.offerings["dynacare"].tube.is_none());
}

#[test]
fn profile_components_survive() {
    let doc = load_and_run();
    let lipid = find(&doc, "cdl", "LIPID");
    assert_eq!(lipid.offerings["cdl"].kind, TestKind::Profile);
    assert_eq!(lipid.offerings["cdl"].components.as_ref().map(Vec::len), Some(4));
    assert_eq!(lipid.match_confidence, Some(0.47));
}

#[test]
fn reruns_are_byte_identical() {
    let a = serde_json::to_string_pretty(&load_and_run()).unwrap();
    let b = serde_json::to_string_pretty(&load_and_run()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn malformed_input_names_its_source() {
    let err = parse_catalog("dynacare catalog", r#"[{"code": "A"}]"#).unwrap_err();
    assert!(matches!(err, LinkageError::InputParse { .. }));
    assert!(err.to_string().starts_with("cannot parse dynacare catalog"), "{err}");
}

#[test]
fn pair_budget_aborts_run() {
    let mut config = LinkageConfig::from_toml(&read_fixture("linkage.toml")).unwrap();
    config.budget.max_pairs = Some(10);
    let input = load_input(&config);
    let err = run_at(&config, &input, Utc::now()).unwrap_err();
    assert!(matches!(err, LinkageError::BudgetExceeded { .. }), "{err}");
}
