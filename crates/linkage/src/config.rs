use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::LinkageError;
use crate::matcher::MatchOptions;
use crate::score::ScoringPolicy;

pub const DEFAULT_LEFT_LAB: &str = "cdl";
pub const DEFAULT_RIGHT_LAB: &str = "dynacare";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkageConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub left: SourceConfig,
    pub right: SourceConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_name() -> String {
    "labcanon".into()
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One lab catalog. `specimens` is only honored on the left source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub lab_id: String,
    pub file: String,
    #[serde(default)]
    pub specimens: Option<String>,
}

// ---------------------------------------------------------------------------
// Matching, Budget, Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_conflict_margin")]
    pub conflict_margin: f64,
    #[serde(default = "default_conflict_candidates")]
    pub conflict_candidates: usize,
    #[serde(default = "default_true")]
    pub default_implies_serum: bool,
}

fn default_threshold() -> f64 {
    0.35
}

fn default_conflict_margin() -> f64 {
    0.15
}

fn default_conflict_candidates() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            conflict_margin: default_conflict_margin(),
            conflict_candidates: default_conflict_candidates(),
            default_implies_serum: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    #[serde(default)]
    pub max_pairs: Option<u64>,
    #[serde(default)]
    pub max_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub fail_on_conflicts: bool,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkageConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkageError> {
        let config: LinkageConfig =
            toml::from_str(input).map_err(|e| LinkageError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config for a flag-only invocation: default lab ids and settings.
    pub fn from_paths(left: &str, right: &str, specimens: Option<&str>) -> Self {
        Self {
            name: default_name(),
            description: None,
            left: SourceConfig {
                lab_id: DEFAULT_LEFT_LAB.into(),
                file: left.into(),
                specimens: specimens.map(String::from),
            },
            right: SourceConfig {
                lab_id: DEFAULT_RIGHT_LAB.into(),
                file: right.into(),
                specimens: None,
            },
            matching: MatchingConfig::default(),
            budget: BudgetConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), LinkageError> {
        let m = &self.matching;
        if !(m.threshold > 0.0 && m.threshold <= 1.0) {
            return Err(LinkageError::ConfigValidation(format!(
                "matching.threshold must be in (0, 1], got {}",
                m.threshold
            )));
        }
        if !(0.0..=1.0).contains(&m.conflict_margin) {
            return Err(LinkageError::ConfigValidation(format!(
                "matching.conflict_margin must be in [0, 1], got {}",
                m.conflict_margin
            )));
        }
        if m.conflict_candidates < 2 {
            return Err(LinkageError::ConfigValidation(format!(
                "matching.conflict_candidates must be at least 2, got {}",
                m.conflict_candidates
            )));
        }

        for (side, source) in [("left", &self.left), ("right", &self.right)] {
            if source.lab_id.trim().is_empty() {
                return Err(LinkageError::ConfigValidation(format!("{side}.lab_id must not be empty")));
            }
            if source.file.trim().is_empty() {
                return Err(LinkageError::ConfigValidation(format!("{side}.file must not be empty")));
            }
        }
        if self.left.lab_id == self.right.lab_id {
            return Err(LinkageError::ConfigValidation(format!(
                "left and right lab_id must differ, both are '{}'",
                self.left.lab_id
            )));
        }
        if self.right.specimens.is_some() {
            return Err(LinkageError::ConfigValidation(
                "right.specimens is not supported; the specimen table joins onto the left catalog".into(),
            ));
        }

        if self.budget.max_pairs == Some(0) {
            return Err(LinkageError::ConfigValidation("budget.max_pairs must be > 0".into()));
        }
        if self.budget.max_seconds == Some(0) {
            return Err(LinkageError::ConfigValidation("budget.max_seconds must be > 0".into()));
        }

        Ok(())
    }

    /// Rewrite relative file paths so they resolve against `base`
    /// (normally the config file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut String| {
            if Path::new(p.as_str()).is_relative() {
                *p = base.join(p.as_str()).to_string_lossy().into_owned();
            }
        };
        resolve(&mut self.left.file);
        resolve(&mut self.right.file);
        if let Some(s) = self.left.specimens.as_mut() {
            resolve(s);
        }
        if let Some(j) = self.output.json.as_mut() {
            resolve(j);
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.matching.threshold,
            conflict_margin: self.matching.conflict_margin,
            conflict_candidates: self.matching.conflict_candidates,
            max_pairs: self.budget.max_pairs,
            time_budget: self.budget.max_seconds.map(Duration::from_secs),
        }
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            default_implies_serum: self.matching.default_implies_serum,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
