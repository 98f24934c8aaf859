//! Catalog loading: JSON parse, same-lab dedup, specimen side-table join.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::error::LinkageError;
use crate::model::{LabTestRecord, SpecimenMeta, TestKind};

/// One entry of a lab catalog as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTestEntry {
    pub code: String,
    pub raw_name: String,
    #[serde(rename = "type")]
    pub kind: TestKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub components: Option<Vec<String>>,
}

/// One row of the specimen side table. Scalars may be strings or numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecimenRow {
    #[serde(deserialize_with = "scalar_code")]
    pub code: String,
    #[serde(default, deserialize_with = "scalar_text")]
    pub tube: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub temperature: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub turnaround_time: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(t) => t,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

fn scalar_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

/// Parse a catalog JSON array. `input` names the source in errors.
pub fn parse_catalog(input: &str, json: &str) -> Result<Vec<RawTestEntry>, LinkageError> {
    let entries: Vec<RawTestEntry> = serde_json::from_str(json).map_err(|e| LinkageError::InputParse {
        input: input.into(),
        message: e.to_string(),
    })?;

    for (index, entry) in entries.iter().enumerate() {
        if entry.code.trim().is_empty() {
            return Err(LinkageError::InvalidRecord {
                input: input.into(),
                index,
                message: "empty code".into(),
            });
        }
        if entry.raw_name.trim().is_empty() {
            return Err(LinkageError::InvalidRecord {
                input: input.into(),
                index,
                message: format!("code '{}' has an empty raw_name", entry.code),
            });
        }
        if let Some(price) = entry.price {
            if !price.is_finite() || price < 0.0 {
                return Err(LinkageError::InvalidRecord {
                    input: input.into(),
                    index,
                    message: format!("code '{}' has invalid price {price}", entry.code),
                });
            }
        }
    }

    Ok(entries)
}

pub fn parse_specimen_table(input: &str, json: &str) -> Result<Vec<SpecimenRow>, LinkageError> {
    serde_json::from_str(json).map_err(|e| LinkageError::InputParse {
        input: input.into(),
        message: e.to_string(),
    })
}

pub fn to_records(lab_id: &str, entries: &[RawTestEntry]) -> Vec<LabTestRecord> {
    entries
        .iter()
        .map(|e| LabTestRecord {
            code: e.code.trim().to_string(),
            raw_name: e.raw_name.clone(),
            lab_id: lab_id.to_string(),
            kind: e.kind,
            category: e.category.clone().filter(|c| !c.trim().is_empty()),
            price: e.price,
            components: e.components.clone(),
            specimen_meta: None,
        })
        .collect()
}

/// Collapse same-lab duplicate codes. The survivor keeps the position of
/// the first occurrence; a later duplicate replaces it only when the
/// first has no category and the later one does. Returns the number of
/// records dropped.
pub fn dedup_by_code(records: Vec<LabTestRecord>) -> (Vec<LabTestRecord>, usize) {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<LabTestRecord> = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        match position.get(&record.code) {
            Some(&at) => {
                dropped += 1;
                if kept[at].category.is_none() && record.category.is_some() {
                    kept[at] = record;
                }
            }
            None => {
                position.insert(record.code.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    (kept, dropped)
}

/// Join specimen metadata by exact code. Records that already carry
/// metadata are left as they are; the first side-table row per code wins.
/// Returns the number of records enriched.
pub fn enrich(records: Vec<LabTestRecord>, table: &[SpecimenRow]) -> (Vec<LabTestRecord>, usize) {
    let mut by_code: HashMap<&str, &SpecimenRow> = HashMap::new();
    for row in table {
        by_code.entry(row.code.trim()).or_insert(row);
    }

    let mut enriched = 0;
    let records = records
        .into_iter()
        .map(|mut record| {
            if record.specimen_meta.is_none() {
                if let Some(row) = by_code.get(record.code.as_str()) {
                    record.specimen_meta = Some(SpecimenMeta {
                        tube: row.tube.clone(),
                        temperature: row.temperature.clone(),
                        turnaround_time: row.turnaround_time.clone(),
                    });
                    enriched += 1;
                }
            }
            record
        })
        .collect();

    (records, enriched)
}
