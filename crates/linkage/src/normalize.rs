//! Name canonicalization: accent folding, connector-word removal,
//! punctuation folding. Every comparison in the engine runs on the output
//! of [`normalize`].

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Connector words stripped from names, evaluated top to bottom.
/// Multi-word forms precede their single-word parts. Every pattern is
/// anchored on a word boundary so "LESION" keeps its "LES".
const STOPWORD_PATTERNS: &[&str] = &[
    r"\bPROFIL\b",
    r"^\s*NO\b",
    r"\bDIRIGE(?:S|\(S\))?\s+CONTRE\b",
    r"\bDE\s+LA\b",
    r"\bDE\s+L'",
    r"\bDU\b",
    r"\bDES\b",
    r"\bDE\b",
    r"\bD'",
    r"\bET\b",
    r"\bLE\b",
    r"\bLA\b",
    r"\bLES\b",
    r"\bAVEC\b",
    r"\bPAR\b",
    r"\bAU\b",
    r"\bEN\b",
];

static STOPWORDS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    STOPWORD_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("stopword pattern compiles"))
        .collect()
});

const APOSTROPHES: &[char] = &['\u{2019}', '\u{2018}', '\u{02BC}', '`', '\u{00B4}'];

const PUNCTUATION: &[char] = &['(', ')', '[', ']', ',', '.', ':', ';', '/', '-', '+', '&'];

/// Strip diacritics and uppercase. Keeps punctuation and stopwords intact,
/// so rule tables that match on the raw name can use plain ASCII patterns.
pub fn fold(raw: &str) -> String {
    raw.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// Canonical comparison form of a test name.
pub fn normalize(raw: &str) -> String {
    let mut s: String = fold(raw)
        .chars()
        .map(|c| match c {
            c if APOSTROPHES.contains(&c) => '\'',
            '#' => ' ',
            c => c,
        })
        .collect();

    for re in STOPWORDS.iter() {
        if re.is_match(&s) {
            s = re.replace_all(&s, " ").into_owned();
        }
    }

    let folded: String = s
        .chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokenize(name: &str) -> Vec<&str> {
    name.split_whitespace().filter(|t| !t.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_uppercases() {
        assert_eq!(normalize("Glycémie à jeun"), "GLYCEMIE A JEUN");
        assert_eq!(normalize("Fertilité"), "FERTILITE");
    }

    #[test]
    fn stopwords_are_whole_words_only() {
        assert_eq!(normalize("Biopsie de lésion"), "BIOPSIE LESION");
        assert_eq!(normalize("Dosage des lipides"), "DOSAGE LIPIDES");
        assert_eq!(normalize("Enzymes"), "ENZYMES");
        assert_eq!(normalize("Auto-anticorps"), "AUTO ANTICORPS");
    }

    #[test]
    fn elided_articles_removed() {
        assert_eq!(normalize("Dosage de l'acide urique"), "DOSAGE ACIDE URIQUE");
        assert_eq!(normalize("Recherche d’hémoglobine"), "RECHERCHE HEMOGLOBINE");
    }

    #[test]
    fn multi_word_connectors() {
        assert_eq!(
            normalize("Anticorps dirigés contre la thyroperoxydase"),
            "ANTICORPS THYROPEROXYDASE"
        );
        assert_eq!(normalize("Temps de la prothrombine"), "TEMPS PROTHROMBINE");
        assert_eq!(normalize("Anticorps dirigé(s) contre ADN"), "ANTICORPS ADN");
    }

    #[test]
    fn profile_and_leading_ordinal() {
        assert_eq!(normalize("Profil No 5 - Lipidique"), "5 LIPIDIQUE");
        assert_eq!(normalize("NO2 urinaire"), "NO2 URINAIRE");
    }

    #[test]
    fn hash_and_punctuation_fold_to_spaces() {
        assert_eq!(normalize("FER #1"), "FER 1");
        assert_eq!(normalize("CALCIUM, URINE 24 HEURES"), "CALCIUM URINE 24 HEURES");
        assert_eq!(normalize("Na+/K+ (sérum)"), "NA K SERUM");
        assert_eq!(normalize("  T4   libre  "), "T4 LIBRE");
    }

    #[test]
    fn tokenize_drops_empties() {
        assert_eq!(tokenize("A  B C"), vec!["A", "B", "C"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn fold_keeps_punctuation() {
        assert_eq!(fold("Urine, 24 h (sérum)"), "URINE, 24 H (SERUM)");
    }
}
