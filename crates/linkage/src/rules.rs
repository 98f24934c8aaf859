//! Static rule tables: blocklist, synonym groups, medical category keywords,
//! specimen noise words. Pure data plus the lookups over it.
//!
//! Terms are written in normalized form (see [`crate::normalize`]).

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::{fold, normalize};

// ---------------------------------------------------------------------------
// Blocklist
// ---------------------------------------------------------------------------

/// Term pairs that must never cross-match. A side "carries" a pair when its
/// normalized name contains both terms as substrings; the pair blocks when
/// exactly one side carries it.
pub const BLOCKED_PAIRS: &[(&str, &str)] = &[
    ("FER", "FERTILITE"),
    ("FER", "FERRITINE"),
    ("CALCIUM", "CALCIUM IONISE"),
    ("INSULINE", "ANTI INSULINE"),
    ("GLUCOSE", "GLUCOSE 6 PHOSPHATE"),
    ("TESTOSTERONE", "TESTOSTERONE LIBRE"),
    ("T4", "T4 LIBRE"),
    ("T3", "T3 LIBRE"),
    ("PSA", "PSA LIBRE"),
    ("BILIRUBINE", "BILIRUBINE DIRECTE"),
    ("CORTISOL", "CORTISOL SALIVAIRE"),
];

/// Tokens that mark a multi-analyte screening panel.
pub const SCREENING_TERMS: &[&str] = &["DEPISTAGE", "SCREENING"];

/// Tokens that mark one specific assay; never matched against a panel.
pub const SPECIFIC_ASSAY_TERMS: &[&str] = &["TOTAL", "IGG", "IGM", "AIGU"];

/// Returns the offending pair when exactly one side carries it.
pub fn blocked_pair(left: &str, right: &str) -> Option<(&'static str, &'static str)> {
    BLOCKED_PAIRS.iter().copied().find(|(a, b)| {
        let carries = |name: &str| name.contains(a) && name.contains(b);
        carries(left) != carries(right)
    })
}

/// True when exactly one side is a screening panel and the other names a
/// specific single assay.
pub fn screening_conflict(left_tokens: &[&str], right_tokens: &[&str]) -> bool {
    let is_screen = |t: &[&str]| t.iter().any(|w| SCREENING_TERMS.contains(w));
    let is_specific = |t: &[&str]| t.iter().any(|w| SPECIFIC_ASSAY_TERMS.contains(w));

    match (is_screen(left_tokens), is_screen(right_tokens)) {
        (true, false) => is_specific(right_tokens),
        (false, true) => is_specific(left_tokens),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Synonyms
// ---------------------------------------------------------------------------

/// Each group lists interchangeable spellings of one analyte. Forms are
/// normalized at first use, so they may be written naturally.
const SYNONYM_SOURCE: &[&[&str]] = &[
    &["VITAMINE B12", "B12", "COBALAMINE", "CYANOCOBALAMINE"],
    &["VITAMINE D", "25 OH VITAMINE D", "25 HYDROXY VITAMINE D", "CALCIFEROL"],
    &["TSH", "THYREOSTIMULINE", "THYROTROPINE"],
    &["HBA1C", "HEMOGLOBINE GLYQUEE", "HEMOGLOBINE A1C", "A1C"],
    &["FSC", "FORMULE SANGUINE COMPLETE", "HEMOGRAMME", "CBC"],
    &["PSA", "ANTIGENE PROSTATIQUE SPECIFIQUE"],
    &["CRP", "PROTEINE C REACTIVE"],
    &["ALT", "ALAT", "SGPT", "ALANINE AMINOTRANSFERASE"],
    &["AST", "ASAT", "SGOT", "ASPARTATE AMINOTRANSFERASE"],
    &["GGT", "GAMMA GT", "GAMMA GLUTAMYL TRANSFERASE"],
    &["BHCG", "BETA HCG", "HCG", "GONADOTROPHINE CHORIONIQUE"],
    &["INR", "RNI", "TEMPS DE PROTHROMBINE"],
    &["TCA", "PTT", "TEMPS DE CEPHALINE ACTIVEE"],
    &["ACIDE FOLIQUE", "FOLATE", "FOLATES"],
    &["VS", "VITESSE DE SEDIMENTATION", "ESR"],
    &["LDH", "LACTATE DESHYDROGENASE"],
    &["CK", "CPK", "CREATINE KINASE"],
];

pub static SYNONYM_GROUPS: LazyLock<Vec<Vec<String>>> = LazyLock::new(|| {
    SYNONYM_SOURCE
        .iter()
        .map(|group| group.iter().map(|form| normalize(form)).collect())
        .collect()
});

fn contains_phrase(name: &str, phrase: &str) -> bool {
    format!(" {name} ").contains(&format!(" {phrase} "))
}

/// Finds a group where one name uses form A and the other a different
/// form B that it does not share. Returns `(A, B)` as found on
/// (left, right).
pub fn synonym_hit(left: &str, right: &str) -> Option<(String, String)> {
    for group in SYNONYM_GROUPS.iter() {
        for a in group {
            if !contains_phrase(left, a) || contains_phrase(right, a) {
                continue;
            }
            for b in group {
                if b != a && contains_phrase(right, b) {
                    return Some((a.clone(), b.clone()));
                }
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Medical categories
// ---------------------------------------------------------------------------

pub const DEFAULT_CATEGORY: &str = "General";

/// Ordered category classifier, first matching row wins. Keywords match
/// whole words of the folded raw name; a trailing `*` makes a keyword a
/// stem that matches any word it begins.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("Thyroid", &["TSH", "T3", "T4", "THYRO*", "THYREO*", "TPO", "CALCITONINE"]),
    ("Hepatic/Liver", &["ALT", "AST", "ALAT", "ASAT", "GGT", "GAMMA GT", "BILIRUBINE", "PHOSPHATASE ALCALINE", "HEPATIQUE", "ALBUMINE"]),
    ("Renal/Kidney", &["CREATININE", "UREE", "DFG", "CYSTATINE", "MICROALBUMINE", "RENAL", "RENALE"]),
    ("Iron/Anemia", &["FER", "FERRITINE", "TRANSFERRINE", "TIBC", "B12", "FOLATE*", "ACIDE FOLIQUE", "RETICULOCYTE*"]),
    ("Coagulation", &["INR", "RNI", "PROTHROMBINE", "TCA", "PTT", "FIBRINOGENE", "D-DIMERE*", "D DIMERE*", "COAGULATION", "FACTEUR"]),
    ("Diabetes/Glucose", &["GLUCOSE", "GLYCEMIE", "HBA1C", "HEMOGLOBINE GLYQUEE", "INSULINE", "PEPTIDE C", "FRUCTOSAMINE"]),
    ("Lipids/Cardiovascular", &["CHOLESTEROL", "TRIGLYCERIDE*", "HDL", "LDL", "LIPID*", "APOLIPOPROTEINE*", "TROPONINE", "BNP", "HOMOCYSTEINE", "CK"]),
    ("Prenatal", &["PRENATAL*", "GROSSESSE", "HARMONY", "PANORAMA", "TRISOMIE*", "NIPT", "BHCG", "BETA HCG"]),
    ("Vitamins", &["VITAMINE*", "25 OH", "ZINC", "MAGNESIUM", "SELENIUM"]),
    ("Immunology/Antibodies", &["ANTICORPS", "ANTI", "ANA", "FACTEUR RHUMATOIDE", "IMMUNOGLOBULINE*", "IGE", "COMPLEMENT", "ALLERG*"]),
    ("Microbiology", &["CULTURE*", "ANTIBIOGRAMME", "GRAM", "PARASITE*", "CHLAMYDIA", "GONORRHEE", "STREPTOCOQUE*"]),
    ("Hormones/Endocrine", &["CORTISOL", "TESTOSTERONE", "ESTRADIOL", "PROGESTERONE", "PROLACTINE", "FSH", "LH", "DHEA*", "ACTH", "PTH", "PARATHORMONE", "HORMONE*"]),
    ("Tumor Markers", &["PSA", "CEA", "ACE", "CA 125", "CA-125", "CA 15-3", "CA 19-9", "ALPHA-FOETOPROTEINE", "AFP", "MARQUEUR*"]),
    ("Electrolytes/Minerals", &["SODIUM", "POTASSIUM", "CHLORURE*", "ELECTROLYTE*", "CALCIUM", "PHOSPHORE", "BICARBONATE*"]),
    ("Biochemistry Panels", &["BILAN", "PANEL", "PROFIL", "BIOCHIMIE", "FSC", "FORMULE SANGUINE", "HEMOGRAMME"]),
    ("Urinalysis", &["URINE*", "URINAIRE*", "SEDIMENT*"]),
    ("Toxicology", &["DROGUE*", "TOXICO*", "ALCOOL", "ETHANOL", "PLOMB", "MERCURE", "LITHIUM", "DIGOXINE", "METAUX"]),
    ("Infectious Disease", &["VIH", "HIV", "HEPATITE*", "SYPHILIS", "COVID*", "SARS*", "HERPES", "RUBEOLE", "VARICELLE", "MONONUCLEOSE", "LYME", "TUBERCULOSE"]),
    ("Cytology/Pathology", &["CYTOLOGIE", "PAP", "BIOPSIE", "PATHOLOGIE", "HISTOLOGIE"]),
    ("Imaging/Diagnostics", &["ECG", "ELECTROCARDIOGRAMME", "ECHOGRAPHIE", "RADIOGRAPHIE", "HOLTER", "SPIROMETRIE"]),
];

fn keyword_pattern(keyword: &str) -> String {
    match keyword.strip_suffix('*') {
        Some(stem) => format!(r"{}\w*", regex::escape(stem)),
        None => format!(r"{}\b", regex::escape(keyword)),
    }
}

static CATEGORIES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    CATEGORY_RULES
        .iter()
        .map(|(category, keywords)| {
            let alternation = keywords
                .iter()
                .map(|k| keyword_pattern(k))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"\b(?:{alternation})")).expect("category pattern compiles");
            (*category, re)
        })
        .collect()
});

pub fn classify_category(raw_name: &str) -> &'static str {
    let folded = fold(raw_name);
    CATEGORIES
        .iter()
        .find(|(_, re)| re.is_match(&folded))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

// ---------------------------------------------------------------------------
// Specimen noise
// ---------------------------------------------------------------------------

/// Normalized tokens that describe the sample rather than the analyte.
/// Removing them yields the base concept used by the specimen variant audit.
pub const SPECIMEN_NOISE_TOKENS: &[&str] = &[
    "SERUM", "SERIQUE", "URINE", "URINES", "URINAIRE", "URINAIRES", "24", "H", "24H", "HEURES",
    "ALEATOIRE", "RANDOM", "MICTION", "SANG", "ENTIER", "PLASMA", "PLASMATIQUE", "SELLES",
    "GORGE", "VAGINAL", "VAGINALE", "CERVICAL", "RECTAL", "RECTALE", "NASAL", "NASOPHARYNGE",
    "PLAIE", "EXPECTORATION", "GLOBULES", "ROUGES", "ERYTHROCYTAIRE", "CHEVEUX", "COLLECTE",
];

pub fn base_concept_key(normalized: &str) -> String {
    let kept: Vec<&str> = normalized
        .split_whitespace()
        .filter(|t| !SPECIMEN_NOISE_TOKENS.contains(t))
        .collect();
    if kept.is_empty() {
        normalized.to_string()
    } else {
        kept.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_fires_when_one_side_carries_pair() {
        assert_eq!(blocked_pair("FER 1", "FERTILITE 1"), Some(("FER", "FERTILITE")));
        assert_eq!(blocked_pair("FERRITINE", "FER"), Some(("FER", "FERRITINE")));
        assert_eq!(blocked_pair("FERTILITE", "FERTILITE BILAN"), None);
        assert_eq!(blocked_pair("GLUCOSE", "CHOLESTEROL"), None);
        assert_eq!(blocked_pair("T4 LIBRE", "T4"), Some(("T4", "T4 LIBRE")));
    }

    #[test]
    fn screening_panel_versus_specific_assay() {
        assert!(screening_conflict(&["DEPISTAGE", "HEPATITE"], &["HEPATITE", "B", "IGM"]));
        assert!(screening_conflict(&["HEPATITE", "A", "TOTAL"], &["HEPATITE", "SCREENING"]));
        assert!(!screening_conflict(&["DEPISTAGE", "HEPATITE"], &["DEPISTAGE", "IGG"]));
        assert!(!screening_conflict(&["DEPISTAGE", "MTS"], &["CHLAMYDIA"]));
    }

    #[test]
    fn synonyms_are_directional_and_distinct() {
        assert_eq!(
            synonym_hit("VITAMINE B12", "B12"),
            Some(("VITAMINE B12".to_string(), "B12".to_string()))
        );
        assert!(synonym_hit("B12", "VITAMINE B12").is_none());
        assert!(synonym_hit("TEMPS PROTHROMBINE", "INR").is_some());
        assert!(synonym_hit("GLUCOSE", "INSULINE").is_none());
    }

    #[test]
    fn synonym_forms_are_normalized() {
        let inr = SYNONYM_GROUPS
            .iter()
            .find(|g| g.contains(&"INR".to_string()))
            .unwrap();
        assert!(inr.contains(&"TEMPS PROTHROMBINE".to_string()));
    }

    #[test]
    fn category_first_match_wins() {
        assert_eq!(classify_category("TSH"), "Thyroid");
        assert_eq!(classify_category("Glycémie à jeun"), "Diabetes/Glucose");
        assert_eq!(classify_category("Ferritine"), "Iron/Anemia");
        assert_eq!(classify_category("Culture de gorge"), "Microbiology");
        assert_eq!(classify_category("Calcium, urine 24 heures"), "Electrolytes/Minerals");
        assert_eq!(classify_category("Osmolalité"), DEFAULT_CATEGORY);
    }

    #[test]
    fn base_key_strips_specimen_words() {
        assert_eq!(base_concept_key("CALCIUM URINE 24 HEURES"), "CALCIUM");
        assert_eq!(base_concept_key("CALCIUM"), "CALCIUM");
        assert_eq!(base_concept_key("URINE"), "URINE");
    }
}
