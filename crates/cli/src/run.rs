//! `labcanon run` / `labcanon validate`: config-driven catalog build.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Args;
use labcanon_linkage::load::{parse_catalog, parse_specimen_table};
use labcanon_linkage::{CatalogDocument, LinkageConfig, LinkageInput};

use crate::exit_codes::{EXIT_CONFLICTS, EXIT_ERROR, EXIT_INPUT, EXIT_INVALID_CONFIG};
use crate::output::write_atomic;
use crate::CliError;

/// Output path used when neither the config nor `--output` names one.
pub const DEFAULT_OUTPUT: &str = "canonical_catalog.json";

#[derive(Args)]
pub struct RunArgs {
    /// Path to the linkage TOML config (omit to use --left/--right)
    pub config: Option<PathBuf>,

    /// Left catalog JSON (overrides [left].file)
    #[arg(long)]
    pub left: Option<PathBuf>,

    /// Right catalog JSON (overrides [right].file)
    #[arg(long)]
    pub right: Option<PathBuf>,

    /// Specimen side table joined onto the left catalog
    #[arg(long)]
    pub specimens: Option<PathBuf>,

    /// Minimum score for a candidate pair (overrides [matching].threshold)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Write the catalog here (overrides [output].json)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the catalog JSON to stdout instead of a human summary
    #[arg(long)]
    pub json: bool,

    /// Pin metadata.generated_at (RFC 3339) for reproducible output
    #[arg(long, value_name = "TIMESTAMP", env = "LABCANON_GENERATED_AT")]
    pub generated_at: Option<DateTime<Utc>>,

    /// Exit 7 when near-tie conflicts are detected (output is still written)
    #[arg(long)]
    pub fail_on_conflicts: bool,

    /// Refuse runs whose left x right pair count exceeds this
    #[arg(long)]
    pub max_pairs: Option<u64>,

    /// Wall-clock budget for pairwise scoring, in seconds
    #[arg(long)]
    pub max_seconds: Option<u64>,
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn read_config(path: &Path) -> Result<LinkageConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    let mut config = LinkageConfig::from_toml(&text)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base_dir);
    Ok(config)
}

/// Config file (if any) with command-line overrides applied.
fn effective_config(args: &RunArgs) -> Result<LinkageConfig, CliError> {
    let mut config = match (&args.config, &args.left, &args.right) {
        (Some(path), _, _) => read_config(path)?,
        (None, Some(left), Some(right)) => LinkageConfig::from_paths(&path_string(left), &path_string(right), None),
        (None, _, _) => {
            return Err(CliError::usage("no config given and --left/--right not both set")
                .with_hint("labcanon run linkage.toml, or labcanon run --left A.json --right B.json"));
        }
    };

    if let Some(left) = &args.left {
        config.left.file = path_string(left);
    }
    if let Some(right) = &args.right {
        config.right.file = path_string(right);
    }
    if let Some(specimens) = &args.specimens {
        config.left.specimens = Some(path_string(specimens));
    }
    if let Some(threshold) = args.threshold {
        config.matching.threshold = threshold;
    }
    if let Some(output) = &args.output {
        config.output.json = Some(path_string(output));
    }
    if args.fail_on_conflicts {
        config.output.fail_on_conflicts = true;
    }
    if args.max_pairs.is_some() {
        config.budget.max_pairs = args.max_pairs;
    }
    if args.max_seconds.is_some() {
        config.budget.max_seconds = args.max_seconds;
    }

    config.validate()?;
    Ok(config)
}

fn read_input(label: &str, path: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot read {label} ({path}): {e}")))
}

fn load_input(config: &LinkageConfig) -> Result<LinkageInput, CliError> {
    let left_label = format!("{} catalog", config.left.lab_id);
    let right_label = format!("{} catalog", config.right.lab_id);

    let left = parse_catalog(&left_label, &read_input(&left_label, &config.left.file)?)?;
    let right = parse_catalog(&right_label, &read_input(&right_label, &config.right.file)?)?;
    let specimens = match &config.left.specimens {
        Some(path) => parse_specimen_table("specimen table", &read_input("specimen table", path)?)?,
        None => Vec::new(),
    };

    tracing::info!(
        left = left.len(),
        right = right.len(),
        specimen_rows = specimens.len(),
        "inputs loaded"
    );
    Ok(LinkageInput { left, right, specimens })
}

fn print_summary(doc: &CatalogDocument, config: &LinkageConfig, written: Option<&str>) {
    let s = &doc.metadata.matching_summary;
    let only = |lab: &str| s.single_lab.get(&format!("{lab}_only")).copied().unwrap_or(0);
    eprintln!(
        "{} concepts: {} matched, {} {}-only, {} {}-only, {} conflicts (threshold {})",
        s.total_canonical_concepts,
        s.matched_both_labs,
        only(&config.left.lab_id),
        config.left.lab_id,
        only(&config.right.lab_id),
        config.right.lab_id,
        s.conflicts_detected,
        s.match_threshold,
    );
    if let Some(path) = written {
        eprintln!("wrote {path}");
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = effective_config(&args)?;
    let input = load_input(&config)?;

    let doc = match args.generated_at {
        Some(at) => labcanon_linkage::run_at(&config, &input, at)?,
        None => labcanon_linkage::run(&config, &input)?,
    };

    let json_str = serde_json::to_string_pretty(&doc)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    // With --json and no explicit destination, stdout is the only output.
    let destination = match (&config.output.json, args.json) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => None,
        (None, false) => Some(DEFAULT_OUTPUT.to_string()),
    };
    if let Some(path) = &destination {
        write_atomic(Path::new(path), &json_str)?;
    }

    if args.json {
        println!("{json_str}");
    }
    print_summary(&doc, &config, destination.as_deref());

    let conflicts = doc.metadata.matching_summary.conflicts_detected;
    if conflicts > 0 && config.output.fail_on_conflicts {
        return Err(CliError::new(EXIT_CONFLICTS, format!("{conflicts} conflict(s) detected (fail_on_conflicts)"))
            .with_hint("review the conflicts array; the catalog was still written"));
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: '{}' matching {} ({}) against {} ({}), threshold {}",
        config.name,
        config.left.lab_id,
        config.left.file,
        config.right.lab_id,
        config.right.file,
        config.matching.threshold,
    );
    Ok(())
}
