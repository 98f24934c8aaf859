//! `labcanon score`: explain how two test names score against each other.

use clap::{Args, ValueEnum};
use labcanon_linkage::score::Prepared;
use labcanon_linkage::{LabTestRecord, Scorer, ScoringPolicy, TestKind};
use serde::Serialize;

use crate::exit_codes::EXIT_ERROR;
use crate::CliError;

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Individual,
    Profile,
}

impl From<KindArg> for TestKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Individual => TestKind::Individual,
            KindArg::Profile => TestKind::Profile,
        }
    }
}

#[derive(Args)]
pub struct ScoreArgs {
    /// Left test name, as it appears in the catalog
    pub left_name: String,

    /// Right test name, as it appears in the catalog
    pub right_name: String,

    /// Left test code (default: distinct from the right code)
    #[arg(long, default_value = "LEFT")]
    pub left_code: String,

    /// Right test code
    #[arg(long, default_value = "RIGHT")]
    pub right_code: String,

    #[arg(long, value_enum, default_value = "individual")]
    pub left_type: KindArg,

    #[arg(long, value_enum, default_value = "individual")]
    pub right_type: KindArg,

    /// Candidate threshold to report against
    #[arg(long, default_value_t = 0.35)]
    pub threshold: f64,

    /// Do not treat a name with no specimen cue as serum
    #[arg(long)]
    pub no_serum_default: bool,

    /// Output JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SideReport {
    code: String,
    name: String,
    normalized: String,
    specimen: String,
    integers: Vec<String>,
}

#[derive(Serialize)]
struct ScoreReport {
    left: SideReport,
    right: SideReport,
    score: f64,
    blocked: Option<String>,
    candidate: bool,
    reasons: Vec<String>,
}

fn record(code: &str, name: &str, kind: KindArg) -> LabTestRecord {
    LabTestRecord {
        code: code.to_string(),
        raw_name: name.to_string(),
        lab_id: String::new(),
        kind: kind.into(),
        category: None,
        price: None,
        components: None,
        specimen_meta: None,
    }
}

fn side(p: &Prepared<'_>) -> SideReport {
    SideReport {
        code: p.record.code.clone(),
        name: p.record.raw_name.clone(),
        normalized: p.normalized.clone(),
        specimen: p.specimen.to_string(),
        integers: p.integers.clone(),
    }
}

pub fn cmd_score(args: ScoreArgs) -> Result<(), CliError> {
    let left = record(&args.left_code, &args.left_name, args.left_type);
    let right = record(&args.right_code, &args.right_name, args.right_type);
    let (lp, rp) = (Prepared::new(&left), Prepared::new(&right));

    let scorer = Scorer::new(ScoringPolicy {
        default_implies_serum: !args.no_serum_default,
    });
    let result = scorer.score(&lp, &rp);

    let report = ScoreReport {
        left: side(&lp),
        right: side(&rp),
        score: result.score,
        blocked: result.blocked.as_ref().map(ToString::to_string),
        candidate: result.score >= args.threshold,
        reasons: result.reasons,
    };

    if args.json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    for (label, s) in [("left", &report.left), ("right", &report.right)] {
        println!("{label:<6} {} -> {} [{}]", s.name, s.normalized, s.specimen);
    }
    match &report.blocked {
        Some(reason) => println!("blocked {reason}"),
        None => println!(
            "score  {:.4} ({})",
            report.score,
            if report.candidate { "candidate" } else { "below threshold" }
        ),
    }
    if report.blocked.is_none() && !report.reasons.is_empty() {
        println!("why    {}", report.reasons.join(", "));
    }
    Ok(())
}
