//! Specimen classification from raw test names.
//!
//! Rules are an ordered `(tag, pattern)` table evaluated first-match-wins
//! against the accent-folded raw name. Order is load-bearing: the 24-hour
//! and random urine rules must run before the generic urine rule, and
//! nasopharyngeal swabs before throat swabs.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::fold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecimenTag {
    Serum,
    Urine,
    #[serde(rename = "URINE_24H")]
    Urine24h,
    UrineRandom,
    WholeBlood,
    Plasma,
    Stool,
    Throat,
    Vaginal,
    Cervical,
    Rectal,
    Nasal,
    Wound,
    Sputum,
    Rbc,
    Hair,
    Default,
}

impl SpecimenTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serum => "SERUM",
            Self::Urine => "URINE",
            Self::Urine24h => "URINE_24H",
            Self::UrineRandom => "URINE_RANDOM",
            Self::WholeBlood => "WHOLE_BLOOD",
            Self::Plasma => "PLASMA",
            Self::Stool => "STOOL",
            Self::Throat => "THROAT",
            Self::Vaginal => "VAGINAL",
            Self::Cervical => "CERVICAL",
            Self::Rectal => "RECTAL",
            Self::Nasal => "NASAL",
            Self::Wound => "WOUND",
            Self::Sputum => "SPUTUM",
            Self::Rbc => "RBC",
            Self::Hair => "HAIR",
            Self::Default => "DEFAULT",
        }
    }

    /// Bracketed suffix for canonical names. `None` for `Default`.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Urine24h => Some("URINE 24H"),
            Self::UrineRandom => Some("URINE RANDOM"),
            Self::WholeBlood => Some("WHOLE BLOOD"),
            other => Some(other.as_str()),
        }
    }
}

impl std::fmt::Display for SpecimenTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered classifier table. Patterns run against [`fold`]ed names
/// (uppercase, no diacritics, punctuation intact).
const SPECIMEN_RULES: &[(SpecimenTag, &str)] = &[
    (SpecimenTag::Urine24h, r"\b(URINES?|URINAIRES?)\b.*\b24\s*H|\b24\s*H.*\b(URINES?|URINAIRES?)\b|\bCOLLECTE\b.*\b24\s*H"),
    (SpecimenTag::UrineRandom, r"\b(URINES?|URINAIRES?)\b.*\b(ALEATOIRES?|RANDOM|MICTION|SPOT)\b|\b(ALEATOIRES?|RANDOM)\b.*\b(URINES?|URINAIRES?)\b"),
    (SpecimenTag::Urine, r"\bURINES?\b|\bURINAIRES?\b"),
    (SpecimenTag::WholeBlood, r"\bSANG\s+ENTIER\b|\bWHOLE\s+BLOOD\b"),
    (SpecimenTag::Plasma, r"\bPLASMA(TIQUE)?\b"),
    (SpecimenTag::Rbc, r"\bGLOBULES?\s+ROUGES?\b|\bERYTHROCYTAIRES?\b|\bRBC\b"),
    (SpecimenTag::Stool, r"\bSELLES?\b|\bSTOOL\b|\bFECAL(ES)?\b|\bFECES\b"),
    (SpecimenTag::Nasal, r"\bNASAL(E)?\b|\bNASOPHARYN\w*|\bNEZ\b"),
    (SpecimenTag::Throat, r"\bGORGE\b|\bTHROAT\b|\bPHARYN\w*"),
    (SpecimenTag::Vaginal, r"\bVAGIN\w*"),
    (SpecimenTag::Cervical, r"\bCERVI\w*|\bCOL\s+UTERIN\b|\bENDOCOL\b|\bEXOCOL\b"),
    (SpecimenTag::Rectal, r"\bRECT(AL|ALE|UM)\b|\bANORECTAL\b"),
    (SpecimenTag::Wound, r"\bPLAIES?\b|\bWOUND\b"),
    (SpecimenTag::Sputum, r"\bEXPECTORATIONS?\b|\bCRACHATS?\b|\bSPUTUM\b"),
    (SpecimenTag::Hair, r"\bCHEVEUX\b|\bHAIR\b"),
    (SpecimenTag::Serum, r"\bSERUM\b|\bSERIQUE\b"),
];

static RULES: LazyLock<Vec<(SpecimenTag, Regex)>> = LazyLock::new(|| {
    SPECIMEN_RULES
        .iter()
        .map(|(tag, p)| (*tag, Regex::new(p).expect("specimen pattern compiles")))
        .collect()
});

pub fn extract_specimen(raw_name: &str) -> SpecimenTag {
    let folded = fold(raw_name);
    RULES
        .iter()
        .find(|(_, re)| re.is_match(&folded))
        .map(|(tag, _)| *tag)
        .unwrap_or(SpecimenTag::Default)
}

/// Whether two differing tags are still comparable when codes differ.
/// A name with no specimen cue is assumed to be serum when
/// `default_implies_serum` is set.
pub fn tags_compatible(a: SpecimenTag, b: SpecimenTag, default_implies_serum: bool) -> bool {
    if a == b {
        return true;
    }
    default_implies_serum
        && matches!(
            (a, b),
            (SpecimenTag::Default, SpecimenTag::Serum) | (SpecimenTag::Serum, SpecimenTag::Default)
        )
}
