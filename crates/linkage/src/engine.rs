use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::catalog::{build_catalog, render_conflicts};
use crate::config::LinkageConfig;
use crate::error::LinkageError;
use crate::load::{dedup_by_code, enrich, to_records, RawTestEntry, SpecimenRow};
use crate::matcher::match_catalogs;
use crate::model::CatalogDocument;
use crate::score::Scorer;
use crate::summary::{build_metadata, RunFacts};

pub const DEFAULT_DESCRIPTION: &str = "Canonical lab test catalog matched across two laboratory catalogs";

/// Pre-parsed inputs. The engine never touches the filesystem.
#[derive(Debug, Clone, Default)]
pub struct LinkageInput {
    pub left: Vec<RawTestEntry>,
    pub right: Vec<RawTestEntry>,
    /// Side table joined onto the left catalog.
    pub specimens: Vec<SpecimenRow>,
}

/// Run the full pipeline, stamping the document with the current time.
pub fn run(config: &LinkageConfig, input: &LinkageInput) -> Result<CatalogDocument, LinkageError> {
    run_at(config, input, Utc::now())
}

/// Run the full pipeline with a fixed `generated_at`. Identical inputs
/// and timestamp produce an identical document.
pub fn run_at(
    config: &LinkageConfig,
    input: &LinkageInput,
    generated_at: DateTime<Utc>,
) -> Result<CatalogDocument, LinkageError> {
    config.validate()?;
    let _span = tracing::info_span!("linkage", config = %config.name).entered();

    let left_lab = config.left.lab_id.as_str();
    let right_lab = config.right.lab_id.as_str();

    let (left, left_dropped) = dedup_by_code(to_records(left_lab, &input.left));
    let (right, right_dropped) = dedup_by_code(to_records(right_lab, &input.right));
    tracing::info!(
        left = left.len(),
        left_dropped,
        right = right.len(),
        right_dropped,
        "catalogs deduplicated"
    );

    let (left, enriched) = enrich(left, &input.specimens);
    tracing::info!(enriched, table_rows = input.specimens.len(), "specimen metadata joined");

    let scorer = Scorer::new(config.scoring_policy());
    let output = match_catalogs(&left, &right, &scorer, &config.match_options())?;

    let concepts = build_catalog(
        &left,
        &right,
        &output.assignments,
        &output.unmatched_left,
        &output.unmatched_right,
    );
    let conflicts = render_conflicts(&left, &right, &output.conflicts);

    let mut source_counts = BTreeMap::new();
    source_counts.insert(format!("{left_lab}_raw"), input.left.len());
    source_counts.insert(format!("{left_lab}_deduplicated"), left.len());
    source_counts.insert(format!("{left_lab}_enriched"), enriched);
    source_counts.insert(format!("{right_lab}_raw"), input.right.len());
    source_counts.insert(format!("{right_lab}_deduplicated"), right.len());
    source_counts.insert("specimen_table_rows".to_string(), input.specimens.len());

    let metadata = build_metadata(
        &concepts,
        RunFacts {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            description: config
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            left_lab: left_lab.to_string(),
            right_lab: right_lab.to_string(),
            threshold: config.matching.threshold,
            conflicts: conflicts.len(),
            source_counts,
        },
    );

    tracing::info!(
        concepts = concepts.len(),
        matched = metadata.matching_summary.matched_both_labs,
        conflicts = conflicts.len(),
        "catalog ready"
    );

    Ok(CatalogDocument {
        metadata,
        canonical_catalog: concepts,
        conflicts,
    })
}
